use playground_config::ConfigError;
use playground_plugin::PluginError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
