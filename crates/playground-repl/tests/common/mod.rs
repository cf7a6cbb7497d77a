// Shared fakes for orchestration integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use playground_compile::{
    CompileEngine, EnvReport, EvalError, Evaluator, FormatConfig, FormatError, Formatter,
    TransformError, TransformOutput, TransformRequest, TransformService,
};
use playground_config::MemoryStore;
use playground_plugin::{PluginDescriptor, PluginError, PluginHandle, PluginRegistry, RemoteLoader};
use playground_repl::{ControllerConfig, OrchestrationController, Services};

pub const STORAGE_KEY: &str = "replState";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ─── Loader ─────────────────────────────────────────────────────────────

/// Loader with per-plugin delays and a number of failures before success.
#[derive(Default)]
pub struct ScriptedLoader {
    delays: HashMap<String, Duration>,
    failures: Mutex<HashMap<String, usize>>,
    panics: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, key: &str, ms: u64) -> Self {
        self.delays.insert(key.to_string(), Duration::from_millis(ms));
        self
    }

    /// Fail the first `times` loads of `key`.
    pub fn fail(self, key: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), times);
        self
    }

    /// Panic inside every load of `key`.
    pub fn panic_on(mut self, key: &str) -> Self {
        self.panics.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls().iter().filter(|k| *k == key).count()
    }
}

#[async_trait]
impl RemoteLoader for ScriptedLoader {
    async fn load(&self, descriptor: &PluginDescriptor) -> Result<PluginHandle, PluginError> {
        self.calls.lock().unwrap().push(descriptor.key.clone());
        if let Some(delay) = self.delays.get(&descriptor.key) {
            tokio::time::sleep(*delay).await;
        }
        if self.panics.contains(&descriptor.key) {
            panic!("loader for {} crashed", descriptor.key);
        }

        let should_fail = {
            let mut failures = self.failures.lock().unwrap();
            match failures.get_mut(&descriptor.key) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if should_fail {
            return Err(PluginError::Fetch(format!("{} returned status 503", descriptor.key)));
        }

        Ok(PluginHandle::new(
            descriptor.key.clone(),
            descriptor.export_name(),
            vec![0u8, 97, 115, 109, 1, 0, 0, 0],
        ))
    }
}

// ─── Services ───────────────────────────────────────────────────────────

/// Returns the source unchanged; `@@` is a syntax error.
pub struct IdentityTransform {
    pub requests: Mutex<Vec<TransformRequest>>,
}

impl IdentityTransform {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_presets(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.presets.iter().map(|p| p.id().to_string()).collect())
            .unwrap_or_default()
    }
}

impl TransformService for IdentityTransform {
    fn transform(
        &self,
        source: &str,
        request: &TransformRequest,
    ) -> Result<TransformOutput, TransformError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(offset) = source.find("@@") {
            return Err(TransformError::new(format!("Unexpected token (1:{offset})"))
                .at(1, offset as u32));
        }
        let env_report = request.presets.iter().any(|p| p.id() == "env").then(|| EnvReport {
            targets: vec![("electron".into(), "1.8".into())],
            plugins: vec!["transform-es2015-classes".into()],
            polyfills: Vec::new(),
        });
        Ok(TransformOutput {
            code: source.to_string(),
            env_report,
        })
    }
}

/// Throws whenever the code contains `throw`.
pub struct ThrowingEvaluator;

impl Evaluator for ThrowingEvaluator {
    fn evaluate(&self, code: &str, _runtime: Option<&PluginHandle>) -> Result<(), EvalError> {
        if code.contains("throw") {
            Err(EvalError::new("Error: x"))
        } else {
            Ok(())
        }
    }
}

/// Uppercases its input.
pub struct ShoutingFormatter;

impl Formatter for ShoutingFormatter {
    fn format(
        &self,
        code: &str,
        _config: &FormatConfig,
        _module: Option<&PluginHandle>,
    ) -> Result<String, FormatError> {
        Ok(code.to_uppercase())
    }
}

// ─── Harness ────────────────────────────────────────────────────────────

pub struct Harness {
    pub loader: Arc<ScriptedLoader>,
    pub transform: Arc<IdentityTransform>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(loader: ScriptedLoader) -> Self {
        Self::with_store(loader, MemoryStore::new())
    }

    pub fn with_store(loader: ScriptedLoader, store: MemoryStore) -> Self {
        init_tracing();
        Self {
            loader: Arc::new(loader),
            transform: Arc::new(IdentityTransform::new()),
            store: Arc::new(store),
        }
    }

    pub fn services(&self) -> Services {
        self.services_with_timeout(Duration::from_secs(5))
    }

    pub fn services_with_timeout(&self, load_timeout: Duration) -> Services {
        let engine = CompileEngine::new(self.transform.clone(), Arc::new(ThrowingEvaluator))
            .with_formatter(Arc::new(ShoutingFormatter));
        Services::new(self.loader.clone(), engine, self.store.clone()).with_config(
            ControllerConfig {
                storage_key: STORAGE_KEY.to_string(),
                load_timeout,
                ..ControllerConfig::default()
            },
        )
    }

    pub async fn hydrate(&self, locator: Option<&str>) -> OrchestrationController {
        let registry = PluginRegistry::builtin().unwrap();
        OrchestrationController::hydrate(&registry, self.services(), locator).await
    }
}
