//! Handles to loaded plugin executables.

use std::fmt;
use std::sync::Arc;

/// Opaque reference to a fetched and validated plugin module.
///
/// Returned by a [`RemoteLoader`](crate::loader::RemoteLoader) and stored on
/// the plugin's runtime state. Cloning is cheap; the module bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct PluginHandle {
    key: String,
    export: String,
    module: Arc<[u8]>,
}

impl PluginHandle {
    pub fn new(key: impl Into<String>, export: impl Into<String>, module: impl Into<Arc<[u8]>>) -> Self {
        Self {
            key: key.into(),
            export: export.into(),
            module: module.into(),
        }
    }

    /// Catalog key of the plugin this handle belongs to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the entry point exported by the module.
    pub fn export(&self) -> &str {
        &self.export
    }

    pub fn module(&self) -> &[u8] {
        &self.module
    }

    pub fn size(&self) -> usize {
        self.module.len()
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("key", &self.key)
            .field("export", &self.export)
            .field("size", &self.module.len())
            .finish()
    }
}
