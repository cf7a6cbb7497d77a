//! Plugin system error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin not found: {0}")]
    NotFound(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid plugin state: {0}")]
    InvalidState(String),

    /// Transport failure: connection refused, reset, body read error.
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("fetch error: {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("WASM validation error: {0}")]
    WasmValidation(String),

    #[error("missing export: plugin {plugin} does not export '{export}'")]
    MissingExport { plugin: String, export: String },

    #[error("load timeout: plugin {0} did not finish loading in time")]
    Timeout(String),

    #[error("load aborted: plugin {plugin}: {reason}")]
    LoadAborted { plugin: String, reason: String },

    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("execution timeout: plugin {0} exceeded fuel limit")]
    FuelExhausted(String),

    #[error("memory limit exceeded: plugin {0}")]
    MemoryExceeded(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl PluginError {
    /// Whether the failure happened on the wire and a fresh attempt may succeed.
    ///
    /// Malformed payloads and missing exports are deterministic; fetching the
    /// same locator again yields the same bytes.
    /// Only 5xx statuses count; a 4xx answer will not change on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            PluginError::Fetch(_) | PluginError::Http(_) | PluginError::Timeout(_) => true,
            PluginError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
