//! Remote plugin loading: fetch, validate, hand back a [`PluginHandle`].
//!
//! The loader never touches plugin state. It resolves one descriptor to an
//! executable handle or an error; applying that outcome is the coordinator's
//! job.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::PluginError;
use crate::handle::PluginHandle;
use crate::registry::{PluginDescriptor, DEFAULT_BASE_URL};

// ─── Constants ──────────────────────────────────────────────────────────

/// WASM magic bytes: `\0asm`
const WASM_MAGIC: &[u8; 4] = b"\0asm";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_MAX_SIZE_MB: u64 = 50;

const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Import namespaces a fetched module may reference.
const ALLOWED_IMPORT_NAMESPACES: &[&str] = &[
    "env",
    "extism:host/env",
    "wasi_snapshot_preview1",
    "wasi_unstable",
];

// ─── Configuration ──────────────────────────────────────────────────────

/// Settings shared by every load attempt.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Base URL used when a locator does not carry its own.
    pub default_base_url: String,
    /// Upper bound on one load attempt, retries included.
    pub load_timeout: Duration,
    /// Maximum module size in bytes.
    pub max_size: u64,
    /// Extra attempts after a transient transport failure.
    pub max_retries: u32,
    /// Delay before retry `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            default_base_url: DEFAULT_BASE_URL.to_string(),
            load_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_size: DEFAULT_MAX_SIZE_MB * 1024 * 1024,
            max_retries: 0,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl LoaderConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_base_url: std::env::var("PLAYGROUND_PLUGIN_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.default_base_url),
            load_timeout: std::env::var("PLAYGROUND_PLUGIN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.load_timeout),
            max_size: std::env::var("PLAYGROUND_PLUGIN_MAX_SIZE_MB")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_MAX_SIZE_MB)
                * 1024
                * 1024,
            max_retries: std::env::var("PLAYGROUND_PLUGIN_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_backoff: defaults.retry_backoff,
        }
    }
}

// ─── Loader port ────────────────────────────────────────────────────────

/// Resolves a descriptor to a loaded executable.
#[async_trait]
pub trait RemoteLoader: Send + Sync {
    async fn load(&self, descriptor: &PluginDescriptor) -> Result<PluginHandle, PluginError>;
}

// ─── HTTP loader ────────────────────────────────────────────────────────

/// Fetches plugin modules over HTTP and validates them before use.
#[derive(Debug, Clone)]
pub struct HttpPluginLoader {
    http: reqwest::Client,
    config: LoaderConfig,
}

impl HttpPluginLoader {
    pub fn new(config: LoaderConfig) -> Result<Self, PluginError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("playground-plugin/", env!("CARGO_PKG_VERSION")))
            .timeout(config.load_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PluginError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PluginError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PluginError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > self.config.max_size {
                return Err(PluginError::WasmValidation(format!(
                    "module too large: {} bytes (max: {} bytes)",
                    len, self.config.max_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PluginError::Fetch(format!("{url}: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn fetch_with_retry(&self, key: &str, url: &str) -> Result<Vec<u8>, PluginError> {
        let mut attempt = 0u32;
        loop {
            match self.fetch(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::debug!(plugin = %key, attempt, error = %e, "retrying plugin fetch");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl RemoteLoader for HttpPluginLoader {
    async fn load(&self, descriptor: &PluginDescriptor) -> Result<PluginHandle, PluginError> {
        let locator = descriptor.locator.as_ref().ok_or_else(|| {
            PluginError::InvalidState(format!("{} has no locator to fetch from", descriptor.key))
        })?;
        let url = locator.url(&self.config.default_base_url);
        let export = descriptor.export_name();
        let started = Instant::now();

        tracing::debug!(plugin = %descriptor.key, url = %url, "fetching plugin module");
        let bytes = self.fetch_with_retry(&descriptor.key, &url).await?;
        validate_module(&bytes, self.config.max_size)?;
        if !exports_function(&bytes, &export)? {
            return Err(PluginError::MissingExport {
                plugin: descriptor.key.clone(),
                export,
            });
        }

        tracing::debug!(
            plugin = %descriptor.key,
            size = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "plugin module fetched"
        );
        Ok(PluginHandle::new(descriptor.key.clone(), export, bytes))
    }
}

// ─── Validation ─────────────────────────────────────────────────────────

/// Check size, magic bytes and import namespaces of a module.
pub fn validate_module(bytes: &[u8], max_size: u64) -> Result<(), PluginError> {
    if bytes.len() as u64 > max_size {
        return Err(PluginError::WasmValidation(format!(
            "module too large: {} bytes (max: {} bytes)",
            bytes.len(),
            max_size
        )));
    }

    if bytes.len() < 4 || &bytes[..4] != WASM_MAGIC {
        return Err(PluginError::WasmValidation(
            "invalid WASM binary: magic bytes mismatch".into(),
        ));
    }

    validate_imports(bytes)
}

fn validate_imports(bytes: &[u8]) -> Result<(), PluginError> {
    use wasmparser::{Parser, Payload};

    for payload in Parser::new(0).parse_all(bytes) {
        let payload =
            payload.map_err(|e| PluginError::WasmValidation(format!("failed to parse WASM: {e}")))?;

        if let Payload::ImportSection(reader) = payload {
            for import in reader {
                let import = import.map_err(|e| {
                    PluginError::WasmValidation(format!("failed to read import: {e}"))
                })?;
                if !ALLOWED_IMPORT_NAMESPACES.contains(&import.module) {
                    return Err(PluginError::WasmValidation(format!(
                        "unauthorized import namespace: '{}' (function: '{}')",
                        import.module, import.name
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Whether the module exports a function called `name`.
pub fn exports_function(bytes: &[u8], name: &str) -> Result<bool, PluginError> {
    use wasmparser::{ExternalKind, Parser, Payload};

    for payload in Parser::new(0).parse_all(bytes) {
        let payload =
            payload.map_err(|e| PluginError::WasmValidation(format!("failed to parse WASM: {e}")))?;

        if let Payload::ExportSection(reader) = payload {
            for export in reader {
                let export = export.map_err(|e| {
                    PluginError::WasmValidation(format!("failed to read export: {e}"))
                })?;
                if export.name == name && export.kind == ExternalKind::Func {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}

// ─── Tests ──────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PluginRegistry;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn loader_for(server: &MockServer) -> HttpPluginLoader {
        HttpPluginLoader::new(LoaderConfig {
            default_base_url: server.uri(),
            load_timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(10),
            ..LoaderConfig::default()
        })
        .unwrap()
    }

    fn descriptor(key: &str) -> PluginDescriptor {
        PluginRegistry::builtin()
            .unwrap()
            .get(key)
            .map(|d| (**d).clone())
            .unwrap()
    }

    // ── Config ──────────────────────────────────────────────────────

    #[test]
    fn test_loader_config_default() {
        let config = LoaderConfig::default();
        assert_eq!(config.default_base_url, "https://bundle.run");
        assert_eq!(config.load_timeout, Duration::from_secs(30));
        assert_eq!(config.max_size, 50 * 1024 * 1024);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_loader_config_from_env() {
        std::env::set_var("PLAYGROUND_PLUGIN_BASE_URL", "https://cdn.example.com");
        std::env::set_var("PLAYGROUND_PLUGIN_TIMEOUT_SECS", "7");
        std::env::set_var("PLAYGROUND_PLUGIN_MAX_SIZE_MB", "2");
        std::env::set_var("PLAYGROUND_PLUGIN_MAX_RETRIES", "3");

        let config = LoaderConfig::from_env();
        assert_eq!(config.default_base_url, "https://cdn.example.com");
        assert_eq!(config.load_timeout, Duration::from_secs(7));
        assert_eq!(config.max_size, 2 * 1024 * 1024);
        assert_eq!(config.max_retries, 3);

        std::env::remove_var("PLAYGROUND_PLUGIN_BASE_URL");
        std::env::remove_var("PLAYGROUND_PLUGIN_TIMEOUT_SECS");
        std::env::remove_var("PLAYGROUND_PLUGIN_MAX_SIZE_MB");
        std::env::remove_var("PLAYGROUND_PLUGIN_MAX_RETRIES");
    }

    // ── Validation ──────────────────────────────────────────────────

    #[test]
    fn test_wasm_magic_bytes() {
        assert_eq!(WASM_MAGIC, b"\0asm");
    }

    #[test]
    fn test_validate_module_accepts_minimal() {
        let bytes = test_modules::exporting("prettierStandalone");
        validate_module(&bytes, 1024).unwrap();
        assert!(exports_function(&bytes, "prettierStandalone").unwrap());
        assert!(!exports_function(&bytes, "prettier").unwrap());
    }

    #[test]
    fn test_validate_module_rejects_bad_magic() {
        let err = validate_module(b"<html>not found</html>", 1024).unwrap_err();
        assert!(matches!(err, PluginError::WasmValidation(_)));
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_validate_module_rejects_truncated() {
        let err = validate_module(b"\0as", 1024).unwrap_err();
        assert!(matches!(err, PluginError::WasmValidation(_)));
    }

    #[test]
    fn test_validate_module_rejects_oversized() {
        let bytes = test_modules::exporting("x");
        let err = validate_module(&bytes, 8).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_validate_imports_allowed_namespace() {
        let bytes = test_modules::importing("extism:host/env", "var_get");
        validate_module(&bytes, 1024).unwrap();
    }

    #[test]
    fn test_validate_imports_rejects_unknown_namespace() {
        let bytes = test_modules::importing("host_fs", "open");
        let err = validate_module(&bytes, 1024).unwrap_err();
        assert!(err.to_string().contains("unauthorized import namespace"));
        assert!(err.to_string().contains("host_fs"));
    }

    // ── HTTP loading ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_load_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prettier-standalone@1.3.1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(test_modules::exporting("prettierStandalone")),
            )
            .mount(&server)
            .await;

        let handle = loader_for(&server)
            .load(&descriptor("prettier"))
            .await
            .unwrap();
        assert_eq!(handle.key(), "prettier");
        assert_eq!(handle.export(), "prettierStandalone");
        assert!(handle.size() > 8);
    }

    #[tokio::test]
    async fn test_load_missing_export() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/babili-standalone@0.1.4"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(test_modules::exporting("babili")),
            )
            .mount(&server)
            .await;

        let err = loader_for(&server)
            .load(&descriptor("babili-standalone"))
            .await
            .unwrap_err();
        match err {
            PluginError::MissingExport { plugin, export } => {
                assert_eq!(plugin, "babili-standalone");
                assert_eq!(export, "babiliStandalone");
            }
            other => panic!("expected MissingExport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = loader_for(&server)
            .load(&descriptor("prettier"))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::HttpStatus { status: 404, .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_load_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let loader = HttpPluginLoader::new(LoaderConfig {
            default_base_url: server.uri(),
            max_retries: 3,
            retry_backoff: Duration::from_millis(5),
            ..LoaderConfig::default()
        })
        .unwrap();

        let err = loader.load(&descriptor("prettier")).await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_load_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("module.exports = {}"))
            .mount(&server)
            .await;

        let err = loader_for(&server)
            .load(&descriptor("prettier"))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::WasmValidation(_)));
    }

    #[tokio::test]
    async fn test_load_retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(test_modules::exporting("prettierStandalone")),
            )
            .mount(&server)
            .await;

        let loader = HttpPluginLoader::new(LoaderConfig {
            default_base_url: server.uri(),
            max_retries: 2,
            retry_backoff: Duration::from_millis(5),
            ..LoaderConfig::default()
        })
        .unwrap();

        let handle = loader.load(&descriptor("prettier")).await.unwrap();
        assert_eq!(handle.export(), "prettierStandalone");
    }

    #[tokio::test]
    async fn test_load_without_retries_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = loader_for(&server)
            .load(&descriptor("prettier"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_load_preloaded_has_no_locator() {
        let server = MockServer::start().await;
        let err = loader_for(&server)
            .load(&descriptor("babel-preset-es2015"))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidState(_)));
    }
}
