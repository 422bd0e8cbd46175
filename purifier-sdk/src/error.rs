use purifier_api::ConfigError;
use purifier_state::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Synchronization error: {0}")]
    Sync(#[from] SyncError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Purifier not found: {0}")]
    DeviceNotFound(String),

    #[error("Duplicate purifier name: {0}")]
    DuplicateName(String),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bridge configuration: {0}")]
    Json(#[from] serde_json::Error),
}
