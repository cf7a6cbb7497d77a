use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
