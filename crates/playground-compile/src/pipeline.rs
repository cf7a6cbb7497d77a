//! Pipeline assembly: plugin state in, ordered transform description out.
//!
//! Assembly is pure. The same set of active plugins always yields the same
//! pipeline, because ordering comes from the catalog and never from the
//! order in which the user enabled things.

use std::collections::BTreeMap;

use playground_plugin::{Capability, PluginHandle, PluginRole, PluginStateStore};
use serde::Serialize;

use crate::services::TransformRequest;

/// Target parameters selected by the user. Only enabled targets with a
/// value are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetSelection {
    /// Browser query, comma separated.
    pub browsers: String,
    pub electron: Option<f64>,
    pub node: Option<f64>,
}

/// Everything assembly reads.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub plugins: &'a PluginStateStore,
    /// Execute flag used when the catalog has no runtime support entry.
    pub evaluate: bool,
    pub built_ins: bool,
    pub debug: bool,
    pub targets: &'a TargetSelection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvTargets {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub browsers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electron: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<f64>,
}

/// Options passed to the env preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvOptions {
    pub targets: EnvTargets,
    pub use_built_ins: bool,
    pub debug: bool,
}

/// One preset list entry. Serializes as `"id"` or `["id", {options}]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PresetEntry {
    Named(String),
    Configured(String, EnvOptions),
}

impl PresetEntry {
    pub fn id(&self) -> &str {
        match self {
            PresetEntry::Named(id) | PresetEntry::Configured(id, _) => id,
        }
    }

    pub fn options(&self) -> Option<&EnvOptions> {
        match self {
            PresetEntry::Named(_) => None,
            PresetEntry::Configured(_, options) => Some(options),
        }
    }
}

/// Fully resolved description of one compile call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSpec {
    pub presets: Vec<PresetEntry>,
    pub pretty_print: bool,
    pub execute: bool,
    pub runtime: Option<PluginHandle>,
    /// Handle of the active formatter plugin.
    pub formatter: Option<PluginHandle>,
    /// Every active fetched plugin, keyed by identity.
    pub plugins: BTreeMap<String, PluginHandle>,
}

impl PipelineSpec {
    pub fn preset_ids(&self) -> Vec<&str> {
        self.presets.iter().map(PresetEntry::id).collect()
    }

    pub fn env_options(&self) -> Option<&EnvOptions> {
        self.presets.iter().find_map(PresetEntry::options)
    }

    pub fn transform_request(&self) -> TransformRequest {
        TransformRequest {
            presets: self.presets.clone(),
            plugins: self.plugins.clone(),
        }
    }
}

/// Build the pipeline for the current state.
///
/// Output order: plain presets in catalog order, then the minifier, then the
/// env preset with its options. Plugins that are loading, failed or merely
/// enabled are left out.
pub fn assemble(inputs: &PipelineInputs<'_>) -> PipelineSpec {
    let store = inputs.plugins;

    let mut presets: Vec<PresetEntry> = store
        .with_role(PluginRole::Preset)
        .filter(|s| s.descriptor().capability.is_none() && s.is_active())
        .map(|s| PresetEntry::Named(s.descriptor().pipeline_id().to_string()))
        .collect();

    if let Some(minifier) = store
        .with_capability(Capability::Minify)
        .filter(|s| s.is_active())
    {
        presets.push(PresetEntry::Named(
            minifier.descriptor().pipeline_id().to_string(),
        ));
    }

    let runtime = store.with_capability(Capability::Evaluate);
    let execute = match runtime {
        Some(state) => state.is_active(),
        None => inputs.evaluate,
    };

    if let Some(env) = store
        .with_capability(Capability::EnvTargets)
        .filter(|s| s.is_active())
    {
        presets.push(PresetEntry::Configured(
            env.descriptor().pipeline_id().to_string(),
            env_options(inputs, execute),
        ));
    }

    let formatter = store
        .with_capability(Capability::Format)
        .filter(|s| s.is_active());

    PipelineSpec {
        presets,
        pretty_print: formatter.is_some(),
        formatter: formatter.and_then(|s| s.handle().cloned()),
        execute,
        runtime: runtime
            .filter(|s| s.is_active())
            .and_then(|s| s.handle().cloned()),
        plugins: store.active_handles(),
    }
}

fn env_options(inputs: &PipelineInputs<'_>, execute: bool) -> EnvOptions {
    let browsers = inputs
        .targets
        .browsers
        .split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect();

    EnvOptions {
        targets: EnvTargets {
            browsers,
            electron: inputs.targets.electron,
            node: inputs.targets.node,
        },
        // Built-ins would inject polyfill imports that the evaluator cannot
        // resolve, so they are only requested when not executing.
        use_built_ins: inputs.built_ins && !execute,
        debug: inputs.debug,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
