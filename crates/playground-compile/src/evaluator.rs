//! Evaluator backed by the runtime support module's WASM sandbox.
//!
//! The runtime module's entry point receives the code as UTF-8 bytes. An
//! empty output means the code ran to completion; anything else is the
//! message of the error it threw.

use playground_plugin::{PluginHandle, PluginSandbox, SandboxConfig};

use crate::error::EvalError;
use crate::services::Evaluator;

#[derive(Debug, Clone, Default)]
pub struct SandboxEvaluator {
    config: SandboxConfig,
}

impl SandboxEvaluator {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(SandboxConfig::from_env())
    }
}

impl Evaluator for SandboxEvaluator {
    fn evaluate(&self, code: &str, runtime: Option<&PluginHandle>) -> Result<(), EvalError> {
        let handle =
            runtime.ok_or_else(|| EvalError::new("runtime support is not loaded"))?;

        let mut sandbox = PluginSandbox::from_handle(handle, self.config.clone())
            .map_err(|e| EvalError::new(e.to_string()))?;
        let output = sandbox
            .call_entry(code.as_bytes())
            .map_err(|e| EvalError::new(e.to_string()))?;

        if output.is_empty() {
            Ok(())
        } else {
            Err(EvalError::new(String::from_utf8_lossy(&output).into_owned()))
        }
    }
}
