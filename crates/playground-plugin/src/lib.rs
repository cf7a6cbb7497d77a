//! Plugin catalog, lifecycle state and remote loading for the playground.
//!
//! - [`registry`]: the immutable catalog of presets, plugins and runtime support
//! - [`state`]: per-plugin runtime flags and the reducer that updates them
//! - [`loader`]: fetching and validating remote modules
//! - [`coordinator`]: concurrent loads and batch settling
//! - [`sandbox`]: executing loaded modules under resource limits

pub mod coordinator;
pub mod error;
pub mod handle;
pub mod loader;
pub mod registry;
pub mod sandbox;
pub mod state;

pub use coordinator::{LoadCompletion, LoadCoordinator, Reconciliation, Settle};
pub use error::PluginError;
pub use handle::PluginHandle;
pub use loader::{HttpPluginLoader, LoaderConfig, RemoteLoader};
pub use registry::{Capability, PluginDescriptor, PluginLocator, PluginRegistry, PluginRole};
pub use sandbox::{PluginSandbox, SandboxConfig};
pub use state::{LoadDelta, PluginRuntimeState, PluginStateStore, PluginStatus};
