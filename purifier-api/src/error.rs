use miio_client::MiioError;
use thiserror::Error;

/// JSON-RPC "method not found", used by firmwares that lack a command
pub const METHOD_NOT_FOUND: i64 = -32601;

/// High-level API errors for purifier operations
///
/// Every failure coming back from the transport is classified here, once,
/// so that retry and fallback decisions are driven by the variant rather
/// than by error text.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network or protocol level failure
    ///
    /// The session that produced it should be considered dead and replaced.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The device answered, but refused the command
    #[error("Remote error: {0}")]
    Remote(RemoteError),

    /// The device answered with a shape we did not expect
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            ApiError::Remote(RemoteError {
                kind: RemoteErrorKind::Unsupported,
                ..
            })
        )
    }
}

/// How a device rejected a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The firmware does not know this command; try the next candidate
    Unsupported,
    /// The command is known but was refused, or the acknowledgement was not a success marker
    Rejected,
}

/// A command rejection reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} (code {code}): {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub code: i64,
    pub message: String,
}

impl RemoteError {
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        let kind = if code == METHOD_NOT_FOUND {
            RemoteErrorKind::Unsupported
        } else {
            RemoteErrorKind::Rejected
        };
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    /// A reply that arrived but did not carry a success marker
    pub fn unacknowledged(reply: &serde_json::Value) -> Self {
        Self {
            kind: RemoteErrorKind::Rejected,
            code: 0,
            message: format!("unacknowledged reply: {}", reply),
        }
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// Convert from MiioError to ApiError
impl From<MiioError> for ApiError {
    fn from(error: MiioError) -> Self {
        match error {
            MiioError::Remote { code, message } => {
                ApiError::Remote(RemoteError::from_code(code, message))
            }
            MiioError::Network(msg) | MiioError::Protocol(msg) | MiioError::InvalidToken(msg) => {
                ApiError::Transport(msg)
            }
            MiioError::Timeout(after) => ApiError::Transport(format!("timed out after {:?}", after)),
        }
    }
}

/// Errors in a device configuration record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Invalid token for device '{device}': {reason}")]
    InvalidToken { device: String, reason: String },

    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    #[error("Device name must not be empty")]
    EmptyName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_miio_error_classification() {
        let api: ApiError = MiioError::Network("unreachable".to_string()).into();
        assert!(api.is_transport());

        let api: ApiError = MiioError::Timeout(Duration::from_secs(5)).into();
        assert!(api.is_transport());

        let api: ApiError = MiioError::Protocol("checksum mismatch".to_string()).into();
        assert!(api.is_transport());

        let api: ApiError = MiioError::Remote {
            code: METHOD_NOT_FOUND,
            message: "Method not found.".to_string(),
        }
        .into();
        assert!(api.is_unsupported());

        let api: ApiError = MiioError::Remote {
            code: -5001,
            message: "invalid_arg".to_string(),
        }
        .into();
        match api {
            ApiError::Remote(remote) => assert_eq!(remote.kind, RemoteErrorKind::Rejected),
            other => panic!("Expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_unacknowledged_is_rejected() {
        let remote = RemoteError::unacknowledged(&serde_json::json!(["error"]));
        assert_eq!(remote.kind, RemoteErrorKind::Rejected);
        assert!(remote.message.contains("error"));
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(format!("{}", err), "Transport error: connection refused");

        let err = ConfigError::InvalidAddress("nope".to_string());
        assert_eq!(format!("{}", err), "Invalid address 'nope'");
    }
}
