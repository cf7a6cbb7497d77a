//! Ports to the external services the engine drives.
//!
//! The transformation engine, the pretty-printer and the evaluator all live
//! outside this workspace. Each is reached through a narrow trait so hosts
//! can plug in real implementations and tests can plug in fakes.

use std::collections::BTreeMap;

use playground_plugin::PluginHandle;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, FormatError, TransformError};
use crate::pipeline::PresetEntry;
use crate::report::EnvReport;

// ─── Transform ──────────────────────────────────────────────────────────

/// Everything the transform service needs besides the source.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    /// Ordered preset list; order is significant.
    pub presets: Vec<PresetEntry>,
    /// Fetched plugins the service must register before transforming.
    pub plugins: BTreeMap<String, PluginHandle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    /// Present when the env preset ran.
    pub env_report: Option<EnvReport>,
}

pub trait TransformService: Send + Sync {
    fn transform(
        &self,
        source: &str,
        request: &TransformRequest,
    ) -> Result<TransformOutput, TransformError>;
}

// ─── Format ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingComma {
    None,
    Es5,
    All,
}

/// Pretty-printer options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatConfig {
    pub print_width: u32,
    pub tab_width: u32,
    pub use_tabs: bool,
    pub semi: bool,
    pub single_quote: bool,
    pub trailing_comma: TrailingComma,
    pub bracket_spacing: bool,
    pub jsx_bracket_same_line: bool,
    pub parser: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            print_width: 80,
            tab_width: 2,
            use_tabs: false,
            semi: true,
            single_quote: false,
            trailing_comma: TrailingComma::None,
            bracket_spacing: true,
            jsx_bracket_same_line: false,
            parser: "babylon".to_string(),
        }
    }
}

pub trait Formatter: Send + Sync {
    /// Pretty-print `code`, with the loaded formatter module when one is
    /// active.
    fn format(
        &self,
        code: &str,
        config: &FormatConfig,
        module: Option<&PluginHandle>,
    ) -> Result<String, FormatError>;
}

// ─── Evaluate ───────────────────────────────────────────────────────────

/// Untrusted code execution.
pub trait Evaluator: Send + Sync {
    /// Run `code`, with the runtime support module when one is loaded.
    fn evaluate(&self, code: &str, runtime: Option<&PluginHandle>) -> Result<(), EvalError>;
}
