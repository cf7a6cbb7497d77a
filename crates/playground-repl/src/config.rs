use std::path::PathBuf;
use std::time::Duration;

use playground_plugin::LoaderConfig;

const DEFAULT_STORAGE_KEY: &str = "replState";
const DEFAULT_STORAGE_DIR: &str = "./data/playground";

/// Controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Key under which the config blob is stored.
    pub storage_key: String,
    /// Directory for a [`FileStore`](playground_config::FileStore).
    pub storage_dir: PathBuf,
    /// Bound on each plugin load attempt.
    pub load_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            load_timeout: LoaderConfig::default().load_timeout,
        }
    }
}

impl ControllerConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Self {
        Self {
            storage_key: std::env::var("PLAYGROUND_STORAGE_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            storage_dir: PathBuf::from(
                std::env::var("PLAYGROUND_STORAGE_DIR")
                    .unwrap_or_else(|_| DEFAULT_STORAGE_DIR.to_string()),
            ),
            load_timeout: LoaderConfig::from_env().load_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_config_default() {
        let config = ControllerConfig::default();
        assert_eq!(config.storage_key, "replState");
        assert_eq!(config.storage_dir, PathBuf::from("./data/playground"));
        assert_eq!(config.load_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_controller_config_from_env() {
        std::env::set_var("PLAYGROUND_STORAGE_KEY", "sharedState");
        std::env::set_var("PLAYGROUND_STORAGE_DIR", "/tmp/playground");

        let config = ControllerConfig::from_env();
        assert_eq!(config.storage_key, "sharedState");
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/playground"));

        std::env::remove_var("PLAYGROUND_STORAGE_KEY");
        std::env::remove_var("PLAYGROUND_STORAGE_DIR");

        assert_eq!(ControllerConfig::from_env().storage_key, "replState");
    }
}
