use thiserror::Error;

/// Error type shared by the persistence layers (records, configuration, rate cache).
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
