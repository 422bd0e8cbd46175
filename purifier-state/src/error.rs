//! Error types for purifier-state

use std::fmt;

use purifier_api::{ApiError, ConfigError, PropertyName, RemoteError, RemoteErrorKind, ValidationError};

/// Result type for purifier-state operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by the synchronization facade
#[derive(Debug, Clone)]
pub enum SyncError {
    /// No session to the device has ever been established
    NotConnected,

    /// The device was connected before but currently has no live session
    Unavailable,

    /// Connected, but the cache holds no value for this property yet
    NoData(PropertyName),

    /// Network or protocol failure; a reconnect has been scheduled
    Transport(String),

    /// The device refused the command
    Remote(RemoteError),

    /// The device replied with something we could not interpret
    Parse(String),

    /// The request was rejected before reaching the network
    Validation(ValidationError),

    /// The device configuration cannot produce a session
    Config(ConfigError),
}

impl SyncError {
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::Remote(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            SyncError::Remote(RemoteError {
                kind: RemoteErrorKind::Unsupported,
                ..
            })
        )
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::NotConnected => write!(f, "Device has never been connected"),
            SyncError::Unavailable => write!(f, "Device is currently unavailable"),
            SyncError::NoData(name) => write!(f, "No value cached for '{}'", name),
            SyncError::Transport(msg) => write!(f, "Transport error: {}", msg),
            SyncError::Remote(err) => write!(f, "Device rejected command: {}", err),
            SyncError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SyncError::Validation(err) => write!(f, "Validation error: {}", err),
            SyncError::Config(err) => write!(f, "Configuration error: {}", err),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Remote(err) => Some(err),
            SyncError::Validation(err) => Some(err),
            SyncError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(msg) => SyncError::Transport(msg),
            ApiError::Remote(remote) => SyncError::Remote(remote),
            ApiError::Parse(msg) => SyncError::Parse(msg),
        }
    }
}

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::Validation(err)
    }
}

impl From<ConfigError> for SyncError {
    fn from(err: ConfigError) -> Self {
        SyncError::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_conversion_keeps_class() {
        let err: SyncError = ApiError::Transport("timed out".to_string()).into();
        assert!(err.is_transport());

        let err: SyncError = ApiError::Remote(RemoteError::from_code(-32601, "nope")).into();
        assert!(err.is_remote());
        assert!(err.is_unsupported());

        let err: SyncError = ApiError::Remote(RemoteError::from_code(-1, "busy")).into();
        assert!(err.is_remote());
        assert!(!err.is_unsupported());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SyncError::NoData(PropertyName::Humidity).to_string(),
            "No value cached for 'humidity'"
        );
        assert_eq!(SyncError::NotConnected.to_string(), "Device has never been connected");
    }
}
