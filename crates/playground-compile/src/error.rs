//! Errors reported by the external transform, format and evaluate services.
//!
//! None of these cross the engine boundary as `Err`; the engine records them
//! on the [`CompileResult`](crate::engine::CompileResult).

use serde::Serialize;
use thiserror::Error;

/// The transform service rejected the source.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct TransformError {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("format error: {message}")]
pub struct FormatError {
    pub message: String,
}

impl FormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Evaluating the transformed code failed or threw.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
