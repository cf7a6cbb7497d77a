//! Per-plugin runtime state and the store that owns it.
//!
//! Every descriptor in the registry gets exactly one [`PluginRuntimeState`]
//! for the lifetime of a session. Only its flags and handle change, and only
//! through the store's transition methods so the invariants below hold:
//!
//! - `loading` and `loaded` are never both set
//! - `errored` implies not `loading`
//! - preloaded entries are `loaded` from the start and never `loading`

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::PluginError;
use crate::handle::PluginHandle;
use crate::registry::{Capability, PluginDescriptor, PluginRegistry, PluginRole};

/// Outcome of one load attempt, applied to the store as a single update.
#[derive(Debug, Clone)]
pub enum LoadDelta {
    Loaded(PluginHandle),
    Failed(String),
}

/// Coarse status used by views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    Disabled,
    Loading,
    Active,
    Errored,
}

/// Mutable state of one catalog entry.
#[derive(Debug, Clone)]
pub struct PluginRuntimeState {
    descriptor: Arc<PluginDescriptor>,
    enabled: bool,
    loading: bool,
    loaded: bool,
    errored: bool,
    handle: Option<PluginHandle>,
    last_error: Option<String>,
}

impl PluginRuntimeState {
    fn new(descriptor: Arc<PluginDescriptor>) -> Self {
        let loaded = descriptor.preloaded;
        Self {
            descriptor,
            enabled: false,
            loading: false,
            loaded,
            errored: false,
            handle: None,
            last_error: None,
        }
    }

    pub fn descriptor(&self) -> &Arc<PluginDescriptor> {
        &self.descriptor
    }

    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn errored(&self) -> bool {
        self.errored
    }

    pub fn handle(&self) -> Option<&PluginHandle> {
        self.handle.as_ref()
    }

    /// Reason for the most recent failed load, cleared on re-enable.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Enabled, loaded and usable in a pipeline.
    pub fn is_active(&self) -> bool {
        self.enabled && self.loaded && !self.errored
    }

    /// Enabled but neither loaded nor already loading.
    pub fn needs_load(&self) -> bool {
        self.enabled && !self.loaded && !self.loading
    }

    pub fn status(&self) -> PluginStatus {
        if self.errored {
            PluginStatus::Errored
        } else if self.loading {
            PluginStatus::Loading
        } else if self.is_active() {
            PluginStatus::Active
        } else {
            PluginStatus::Disabled
        }
    }
}

/// All runtime states, keyed by plugin identity, in catalog order.
#[derive(Debug, Clone)]
pub struct PluginStateStore {
    entries: Vec<PluginRuntimeState>,
    index: HashMap<String, usize>,
}

impl PluginStateStore {
    /// Create one disabled state per descriptor.
    pub fn from_registry(registry: &PluginRegistry) -> Self {
        let entries: Vec<PluginRuntimeState> = registry
            .iter()
            .map(|d| PluginRuntimeState::new(Arc::clone(d)))
            .collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, s)| (s.key().to_string(), i))
            .collect();
        Self { entries, index }
    }

    pub fn get(&self, key: &str) -> Option<&PluginRuntimeState> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, key: &str) -> Result<&mut PluginRuntimeState, PluginError> {
        match self.index.get(key) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(PluginError::NotFound(key.to_string())),
        }
    }

    /// Record user intent. Returns whether anything changed.
    ///
    /// Re-enabling a plugin whose last load failed clears the error so the
    /// next reconcile retries it from scratch.
    pub fn set_enabled(&mut self, key: &str, enabled: bool) -> Result<bool, PluginError> {
        let state = self.get_mut(key)?;
        let was_errored = state.errored;
        if state.enabled == enabled && !(enabled && was_errored) {
            return Ok(false);
        }
        state.enabled = enabled;
        if enabled {
            state.errored = false;
            state.last_error = None;
        }
        Ok(true)
    }

    /// Check-and-set before issuing a fetch.
    pub fn begin_load(&mut self, key: &str) -> Result<Arc<PluginDescriptor>, PluginError> {
        let state = self.get_mut(key)?;
        if !state.needs_load() {
            return Err(PluginError::InvalidState(format!(
                "{key} cannot start loading (enabled={}, loading={}, loaded={})",
                state.enabled, state.loading, state.loaded
            )));
        }
        state.loading = true;
        state.errored = false;
        Ok(Arc::clone(&state.descriptor))
    }

    /// Apply the result of a load attempt started with [`begin_load`](Self::begin_load).
    ///
    /// A late success attaches the handle but never re-enables a plugin the
    /// user disabled while it was loading. A failure forces `enabled` off.
    pub fn apply(&mut self, key: &str, delta: LoadDelta) -> Result<(), PluginError> {
        let state = self.get_mut(key)?;
        if !state.loading {
            return Err(PluginError::InvalidState(format!(
                "{key} received a load result without a load in flight"
            )));
        }
        state.loading = false;
        match delta {
            LoadDelta::Loaded(handle) => {
                state.handle = Some(handle);
                state.loaded = true;
                state.errored = false;
                state.last_error = None;
            }
            LoadDelta::Failed(reason) => {
                state.handle = None;
                state.loaded = false;
                state.errored = true;
                state.enabled = false;
                state.last_error = Some(reason);
            }
        }
        Ok(())
    }

    /// Keys of entries that are enabled but not loaded or loading.
    pub fn needs_load(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|s| s.needs_load())
            .map(|s| s.key().to_string())
            .collect()
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.get(key).is_some_and(PluginRuntimeState::is_active)
    }

    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key).is_some_and(PluginRuntimeState::enabled)
    }

    /// The entry providing a capability, if the catalog has one.
    pub fn with_capability(&self, capability: Capability) -> Option<&PluginRuntimeState> {
        self.entries
            .iter()
            .find(|s| s.descriptor.capability == Some(capability))
    }

    /// States in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginRuntimeState> {
        self.entries.iter()
    }

    pub fn with_role(&self, role: PluginRole) -> impl Iterator<Item = &PluginRuntimeState> {
        self.entries.iter().filter(move |s| s.descriptor.role == role)
    }

    /// Handles of every active fetched plugin, keyed by identity.
    pub fn active_handles(&self) -> BTreeMap<String, PluginHandle> {
        self.entries
            .iter()
            .filter(|s| s.is_active())
            .filter_map(|s| s.handle.clone().map(|h| (s.key().to_string(), h)))
            .collect()
    }

    pub fn loading_count(&self) -> usize {
        self.entries.iter().filter(|s| s.loading).count()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
