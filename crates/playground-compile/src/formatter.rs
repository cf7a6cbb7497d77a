//! Formatter backed by the pretty-printer module's WASM sandbox.
//!
//! The module's entry point receives `{"source": ..., "options": ...}` as
//! JSON and answers with the formatted text as UTF-8.

use playground_plugin::{PluginHandle, PluginSandbox, SandboxConfig};
use serde::Serialize;

use crate::error::FormatError;
use crate::services::{FormatConfig, Formatter};

#[derive(Serialize)]
struct FormatInput<'a> {
    source: &'a str,
    options: &'a FormatConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SandboxFormatter {
    config: SandboxConfig,
}

impl SandboxFormatter {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(SandboxConfig::from_env())
    }
}

impl Formatter for SandboxFormatter {
    fn format(
        &self,
        code: &str,
        config: &FormatConfig,
        module: Option<&PluginHandle>,
    ) -> Result<String, FormatError> {
        let handle = module.ok_or_else(|| FormatError::new("formatter module is not loaded"))?;

        let input = serde_json::to_vec(&FormatInput {
            source: code,
            options: config,
        })
        .map_err(|e| FormatError::new(e.to_string()))?;

        let mut sandbox = PluginSandbox::from_handle(handle, self.config.clone())
            .map_err(|e| FormatError::new(e.to_string()))?;
        let output = sandbox
            .call_entry(&input)
            .map_err(|e| FormatError::new(e.to_string()))?;

        String::from_utf8(output)
            .map_err(|_| FormatError::new("formatter returned invalid UTF-8"))
    }
}
