//! Sandboxed execution of fetched plugin modules using Extism (wasmtime).
//!
//! A sandbox is built from a [`PluginHandle`] with bounded memory and a fuel
//! budget per call.

use crate::error::PluginError;
use crate::handle::PluginHandle;

// ─── Configuration ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Maximum memory in bytes (default: 32 MB).
    pub memory_limit: usize,
    /// Maximum fuel per call (default: 1_000_000).
    pub fuel_limit: u64,
    /// Off by default; a module with WASI can read the host environment.
    pub wasi_enabled: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_limit: 32 * 1024 * 1024,
            fuel_limit: 1_000_000,
            wasi_enabled: false,
        }
    }
}

impl SandboxConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Self {
        Self {
            memory_limit: std::env::var("PLAYGROUND_SANDBOX_MEMORY_LIMIT_MB")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(32)
                * 1024
                * 1024,
            fuel_limit: std::env::var("PLAYGROUND_SANDBOX_FUEL_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1_000_000),
            wasi_enabled: std::env::var("PLAYGROUND_SANDBOX_WASI_ENABLED")
                .unwrap_or_default()
                .eq_ignore_ascii_case("true"),
        }
    }
}

// ─── Sandbox ────────────────────────────────────────────────────────────

pub struct PluginSandbox {
    plugin: extism::Plugin,
    config: SandboxConfig,
    key: String,
    export: String,
}

impl std::fmt::Debug for PluginSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSandbox")
            .field("key", &self.key)
            .field("export", &self.export)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PluginSandbox {
    /// Instantiate the module behind `handle`.
    ///
    /// Memory is capped in 64 KB pages and every call runs under the
    /// configured fuel limit.
    pub fn from_handle(handle: &PluginHandle, config: SandboxConfig) -> Result<Self, PluginError> {
        let manifest = extism::Manifest::new([extism::Wasm::data(handle.module().to_vec())])
            .with_memory_max((config.memory_limit / 65536) as u32);

        if config.wasi_enabled {
            tracing::warn!(
                plugin = %handle.key(),
                "WASI enabled for plugin sandbox; the module can read environment variables"
            );
        }

        let plugin = extism::PluginBuilder::new(manifest)
            .with_wasi(config.wasi_enabled)
            .with_fuel_limit(config.fuel_limit)
            .build()
            .map_err(|e| PluginError::Sandbox(e.to_string()))?;

        Ok(Self {
            plugin,
            config,
            key: handle.key().to_string(),
            export: handle.export().to_string(),
        })
    }

    /// Call a function by name with raw bytes in and out.
    pub fn call(&mut self, function_name: &str, input: &[u8]) -> Result<Vec<u8>, PluginError> {
        self.plugin
            .call::<&[u8], Vec<u8>>(function_name, input)
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("fuel") {
                    PluginError::FuelExhausted(self.key.clone())
                } else if msg.contains("memory") {
                    PluginError::MemoryExceeded(self.key.clone())
                } else {
                    PluginError::Sandbox(msg)
                }
            })
    }

    /// Call the handle's export, the module's entry point.
    pub fn call_entry(&mut self, input: &[u8]) -> Result<Vec<u8>, PluginError> {
        let export = self.export.clone();
        self.call(&export, input)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
