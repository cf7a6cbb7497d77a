//! The controller's single source of truth.

use playground_compile::{assemble, CompileResult, PipelineInputs, PipelineSpec, TargetSelection};
use playground_config::{PersistedConfig, TargetParams, TargetVersion};
use playground_plugin::{Capability, PluginRegistry, PluginRole, PluginStateStore};

/// User-facing switches. Pretty-print, minify and evaluate are backed by
/// plugin enablement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    LineWrap,
    Evaluate,
    BuiltIns,
    Debug,
    ShowSidebar,
    PrettyPrint,
    Minify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvTarget {
    Electron,
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flags {
    pub line_wrap: bool,
    /// Execute after compile. Mirrors the runtime support plugin when the
    /// catalog has one.
    pub evaluate: bool,
    pub built_ins: bool,
    pub debug: bool,
    pub show_sidebar: bool,
}

#[derive(Debug, Clone)]
pub struct OrchestrationState {
    pub code: String,
    pub plugins: PluginStateStore,
    pub flags: Flags,
    pub browsers: String,
    pub targets: TargetParams,
    pub last_result: Option<CompileResult>,
    /// Loads are in flight and compilation waits for them to settle.
    pub loading_plugins: bool,
}

impl OrchestrationState {
    pub fn from_persisted(registry: &PluginRegistry, config: &PersistedConfig) -> Self {
        let mut state = Self {
            code: config.code.clone(),
            plugins: PluginStateStore::from_registry(registry),
            flags: Flags {
                line_wrap: config.line_wrap,
                evaluate: config.evaluate,
                built_ins: config.built_ins,
                debug: config.debug,
                show_sidebar: config.show_sidebar,
            },
            browsers: config.browsers.clone(),
            targets: config.targets.clone(),
            last_result: None,
            loading_plugins: false,
        };

        for label in &config.presets {
            match registry.preset_by_label(label) {
                Some(descriptor) => state.enable(&descriptor.key, true),
                None => tracing::warn!(preset = %label, "unknown preset in persisted config"),
            }
        }
        state.enable_capability(Capability::Minify, config.babili);
        state.enable_capability(Capability::Format, config.prettier);
        state.enable_capability(Capability::Evaluate, config.evaluate);
        state
    }

    /// Project back to the persisted form. Only user intent is kept.
    pub fn to_persisted(&self) -> PersistedConfig {
        PersistedConfig {
            code: self.code.clone(),
            presets: self
                .plugins
                .with_role(PluginRole::Preset)
                .filter(|s| s.enabled())
                .map(|s| s.descriptor().label.clone())
                .collect(),
            babili: self.capability_enabled(Capability::Minify),
            prettier: self.capability_enabled(Capability::Format),
            evaluate: self.setting(Setting::Evaluate),
            line_wrap: self.flags.line_wrap,
            built_ins: self.flags.built_ins,
            debug: self.flags.debug,
            show_sidebar: self.flags.show_sidebar,
            browsers: self.browsers.clone(),
            targets: self.targets.clone(),
        }
    }

    pub fn setting(&self, setting: Setting) -> bool {
        match setting {
            Setting::LineWrap => self.flags.line_wrap,
            Setting::BuiltIns => self.flags.built_ins,
            Setting::Debug => self.flags.debug,
            Setting::ShowSidebar => self.flags.show_sidebar,
            Setting::PrettyPrint => self.capability_enabled(Capability::Format),
            Setting::Minify => self.capability_enabled(Capability::Minify),
            Setting::Evaluate => match self.plugins.with_capability(Capability::Evaluate) {
                Some(runtime) => runtime.enabled(),
                None => self.flags.evaluate,
            },
        }
    }

    pub fn set_setting(&mut self, setting: Setting, value: bool) {
        match setting {
            Setting::LineWrap => self.flags.line_wrap = value,
            Setting::BuiltIns => self.flags.built_ins = value,
            Setting::Debug => self.flags.debug = value,
            Setting::ShowSidebar => self.flags.show_sidebar = value,
            Setting::PrettyPrint => self.enable_capability(Capability::Format, value),
            Setting::Minify => self.enable_capability(Capability::Minify, value),
            Setting::Evaluate => {
                self.flags.evaluate = value;
                self.enable_capability(Capability::Evaluate, value);
            }
        }
    }

    /// A target without a known version cannot be enabled.
    pub fn set_target(&mut self, target: EnvTarget, enabled: bool, version: Option<f64>) {
        let slot = match target {
            EnvTarget::Electron => &mut self.targets.electron,
            EnvTarget::Node => &mut self.targets.node,
        };
        TargetVersion::update(slot, enabled, version);
    }

    /// Record a user toggle. Keeps the evaluate flag in step with the
    /// runtime support plugin.
    pub fn toggle_plugin(&mut self, key: &str, enabled: bool) -> bool {
        let Some(state) = self.plugins.get(key) else {
            return false;
        };
        if state.descriptor().capability == Some(Capability::Evaluate) {
            self.flags.evaluate = enabled;
        }
        self.enable(key, enabled);
        true
    }

    /// Assemble the pipeline for the current state.
    pub fn pipeline(&self) -> PipelineSpec {
        let targets = TargetSelection {
            browsers: self.browsers.clone(),
            electron: self.targets.active_electron(),
            node: self.targets.active_node(),
        };
        assemble(&PipelineInputs {
            plugins: &self.plugins,
            evaluate: self.flags.evaluate,
            built_ins: self.flags.built_ins,
            debug: self.flags.debug,
            targets: &targets,
        })
    }

    fn capability_enabled(&self, capability: Capability) -> bool {
        self.plugins
            .with_capability(capability)
            .is_some_and(|s| s.enabled())
    }

    fn enable_capability(&mut self, capability: Capability, enabled: bool) {
        if let Some(key) = self
            .plugins
            .with_capability(capability)
            .map(|s| s.key().to_string())
        {
            self.enable(&key, enabled);
        }
    }

    fn enable(&mut self, key: &str, enabled: bool) {
        if let Err(e) = self.plugins.set_enabled(key, enabled) {
            tracing::warn!(plugin = %key, error = %e, "could not change plugin enablement");
        }
    }
}
