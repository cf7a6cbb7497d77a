//! The orchestration controller.
//!
//! Every user event follows the same path: mutate state, reconcile plugin
//! loads, then either compile right away or wait for the batch to settle.
//! Each compile is followed by persisting the config.

use std::sync::Arc;

use playground_compile::{CompileEngine, CompileResult};
use playground_config::{decode, encode, FileStore, KeyValueStore};
use playground_plugin::{
    HttpPluginLoader, LoadCoordinator, LoaderConfig, PluginRegistry, RemoteLoader, Settle,
};

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::state::{EnvTarget, OrchestrationState, Setting};

/// Collaborators wired into a controller.
pub struct Services {
    pub loader: Arc<dyn RemoteLoader>,
    pub engine: CompileEngine,
    pub store: Arc<dyn KeyValueStore>,
    pub config: ControllerConfig,
}

impl Services {
    pub fn new(
        loader: Arc<dyn RemoteLoader>,
        engine: CompileEngine,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            loader,
            engine,
            store,
            config: ControllerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }
}

pub struct OrchestrationController {
    state: OrchestrationState,
    coordinator: LoadCoordinator,
    engine: CompileEngine,
    store: Arc<dyn KeyValueStore>,
    storage_key: String,
    locator: Option<String>,
    compiles: usize,
    settles: usize,
}

impl std::fmt::Debug for OrchestrationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationController")
            .field("storage_key", &self.storage_key)
            .field("in_flight", &self.coordinator.in_flight())
            .field("compiles", &self.compiles)
            .field("settles", &self.settles)
            .finish_non_exhaustive()
    }
}

impl OrchestrationController {
    /// Restore state from storage and an optional shareable locator, then
    /// start loading whatever it enables.
    pub async fn hydrate(
        registry: &PluginRegistry,
        services: Services,
        locator: Option<&str>,
    ) -> Self {
        let Services {
            loader,
            engine,
            store,
            config,
        } = services;

        let blob = match store.get(&config.storage_key).await {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(key = %config.storage_key, error = %e, "could not read stored config");
                None
            }
        };
        let decoded = decode(blob.as_deref(), locator);
        let state = OrchestrationState::from_persisted(registry, &decoded.config);

        tracing::info!(
            presets = decoded.config.presets.len(),
            warnings = decoded.warnings.len(),
            from_locator = locator.is_some(),
            "playground hydrated"
        );

        let mut controller = Self {
            state,
            coordinator: LoadCoordinator::new(loader, config.load_timeout),
            engine,
            store,
            storage_key: config.storage_key,
            locator: None,
            compiles: 0,
            settles: 0,
        };
        controller.after_change().await;
        controller
    }

    /// Hydrate with the HTTP loader and a file store, configured from the
    /// environment.
    pub async fn from_env(
        registry: &PluginRegistry,
        engine: CompileEngine,
        locator: Option<&str>,
    ) -> Result<Self, ControllerError> {
        let config = ControllerConfig::from_env();
        let loader = HttpPluginLoader::new(LoaderConfig::from_env())?;
        let store = FileStore::new(config.storage_dir.clone());
        let services =
            Services::new(Arc::new(loader), engine, Arc::new(store)).with_config(config);
        Ok(Self::hydrate(registry, services, locator).await)
    }

    // ─── User events ────────────────────────────────────────────────────

    pub async fn set_code(&mut self, code: impl Into<String>) {
        self.state.code = code.into();
        self.after_change().await;
    }

    pub async fn toggle_plugin(&mut self, key: &str, enabled: bool) -> Result<(), ControllerError> {
        if !self.state.toggle_plugin(key, enabled) {
            return Err(ControllerError::UnknownPlugin(key.to_string()));
        }
        tracing::debug!(plugin = %key, enabled, "plugin toggled");
        self.after_change().await;
        Ok(())
    }

    pub async fn set_setting(&mut self, setting: Setting, value: bool) {
        self.state.set_setting(setting, value);
        self.after_change().await;
    }

    pub async fn set_target(&mut self, target: EnvTarget, enabled: bool, version: Option<f64>) {
        self.state.set_target(target, enabled, version);
        self.after_change().await;
    }

    pub async fn set_browsers(&mut self, browsers: impl Into<String>) {
        self.state.browsers = browsers.into();
        self.after_change().await;
    }

    // ─── Load completions ───────────────────────────────────────────────

    /// Apply the next load completion, compiling if it settled the batch.
    ///
    /// Returns `None` without waiting when nothing is in flight.
    pub async fn pump(&mut self) -> Option<Settle> {
        let completion = self.coordinator.next_completion().await?;
        let settle = self.coordinator.apply(&mut self.state.plugins, completion);

        if settle == Settle::Settled {
            self.settles += 1;
            self.state.loading_plugins = false;
            self.compile_and_persist().await;
        }
        Some(settle)
    }

    pub async fn run_until_settled(&mut self) {
        while self.pump().await.is_some() {}
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn state(&self) -> &OrchestrationState {
        &self.state
    }

    pub fn last_result(&self) -> Option<&CompileResult> {
        self.state.last_result.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading_plugins
    }

    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight()
    }

    /// Locator for the configuration as of the last compile.
    pub fn shareable_locator(&self) -> Option<&str> {
        self.locator.as_deref()
    }

    pub fn compiles(&self) -> usize {
        self.compiles
    }

    pub fn settles(&self) -> usize {
        self.settles
    }

    // ─── Internals ──────────────────────────────────────────────────────

    async fn after_change(&mut self) {
        let report = self.coordinator.reconcile(&mut self.state.plugins);
        if report.is_idle() {
            self.state.loading_plugins = false;
            self.compile_and_persist().await;
        } else {
            self.state.loading_plugins = true;
            tracing::debug!(
                launched = report.launched.len(),
                in_flight = report.in_flight,
                "compile deferred until plugins settle"
            );
        }
    }

    async fn compile_and_persist(&mut self) {
        let spec = self.state.pipeline();
        let result = self.engine.compile(&self.state.code, &spec);
        self.compiles += 1;

        if let Some(e) = &result.compile_error {
            tracing::debug!(error = %e, "compile error");
        }
        self.state.last_result = Some(result);
        self.persist().await;
    }

    async fn persist(&mut self) {
        if let Err(e) = self.save().await {
            tracing::warn!(key = %self.storage_key, error = %e, "could not persist config");
        }
    }

    /// Write the current config to the store and refresh the locator.
    pub async fn save(&mut self) -> Result<(), ControllerError> {
        let encoded = encode(&self.state.to_persisted())?;
        self.locator = Some(encoded.locator);
        self.store
            .set(&self.storage_key, &encoded.storage_blob)
            .await?;
        Ok(())
    }
}
