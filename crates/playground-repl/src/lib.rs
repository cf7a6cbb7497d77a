//! Playground orchestration.
//!
//! Wires user events to plugin loading, compilation and persistence.
//! Loads run concurrently; compilation happens once per settled batch.

pub mod config;
pub mod controller;
pub mod error;
pub mod state;

pub use config::ControllerConfig;
pub use controller::{OrchestrationController, Services};
pub use error::ControllerError;
pub use state::{EnvTarget, Flags, OrchestrationState, Setting};
