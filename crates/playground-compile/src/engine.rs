//! Runs one compile: transform, then optionally format and evaluate.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::error::{EvalError, FormatError, TransformError};
use crate::pipeline::PipelineSpec;
use crate::services::{Evaluator, FormatConfig, Formatter, TransformService};

/// Outcome of a compile. Every failure path lands in a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileResult {
    pub transformed_text: Option<String>,
    pub compile_error: Option<TransformError>,
    pub execution_error: Option<EvalError>,
    /// The formatter failed and `transformed_text` is unformatted.
    pub format_error: Option<FormatError>,
    pub env_debug_info: Option<String>,
}

impl CompileResult {
    pub fn is_ok(&self) -> bool {
        self.compile_error.is_none() && self.execution_error.is_none()
    }
}

pub struct CompileEngine {
    transform: Arc<dyn TransformService>,
    formatter: Option<Arc<dyn Formatter>>,
    evaluator: Arc<dyn Evaluator>,
    format_config: FormatConfig,
}

impl std::fmt::Debug for CompileEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileEngine")
            .field("has_formatter", &self.formatter.is_some())
            .field("format_config", &self.format_config)
            .finish_non_exhaustive()
    }
}

impl CompileEngine {
    pub fn new(transform: Arc<dyn TransformService>, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            transform,
            formatter: None,
            evaluator,
            format_config: FormatConfig::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_format_config(mut self, config: FormatConfig) -> Self {
        self.format_config = config;
        self
    }

    pub fn compile(&self, source: &str, spec: &PipelineSpec) -> CompileResult {
        let started = Instant::now();
        let mut result = CompileResult::default();

        let output = match self.transform.transform(source, &spec.transform_request()) {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(error = %e, line = ?e.line, column = ?e.column, "transform failed");
                result.compile_error = Some(e);
                return result;
            }
        };

        let mut code = output.code;

        if spec.pretty_print {
            match &self.formatter {
                Some(formatter) => match formatter.format(
                    &code,
                    &self.format_config,
                    spec.formatter.as_ref(),
                ) {
                    Ok(formatted) => code = formatted,
                    Err(e) => {
                        tracing::warn!(error = %e, "formatter failed, keeping unformatted output");
                        result.format_error = Some(e);
                    }
                },
                None => tracing::debug!("pretty print requested but no formatter configured"),
            }
        }

        if spec.env_options().is_some_and(|o| o.debug) {
            result.env_debug_info = output.env_report.map(|report| report.render());
        }

        if spec.execute {
            if let Err(e) = self.evaluator.evaluate(&code, spec.runtime.as_ref()) {
                tracing::debug!(error = %e, "evaluation failed");
                result.execution_error = Some(e);
            }
        }

        tracing::debug!(
            presets = spec.presets.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "compile finished"
        );
        result.transformed_text = Some(code);
        result
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
