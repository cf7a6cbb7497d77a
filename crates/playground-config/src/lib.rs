//! Persisted playground configuration.
//!
//! Decodes and encodes the user's settings from two sources, a durable
//! key-value store and a shareable locator string, with locator fields
//! taking precedence field by field.

pub mod codec;
pub mod compress;
pub mod error;
pub mod locator;
pub mod persisted;
pub mod storage;
pub mod targets;

pub use codec::{decode, encode, Decoded, Encoded};
pub use error::ConfigError;
pub use persisted::PersistedConfig;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use targets::{parse_targets, ParsedTargets, TargetParams, TargetVersion};
