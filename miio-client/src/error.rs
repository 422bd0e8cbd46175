//! Error types for the miio client

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during miio communication
#[derive(Debug, Error)]
pub enum MiioError {
    /// Socket-level failure (bind, send, receive)
    #[error("Network error: {0}")]
    Network(String),

    /// No matching reply arrived in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Malformed packet, bad checksum, bad padding or undecodable JSON
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The device answered with an `error` object
    #[error("Device error {code}: {message}")]
    Remote { code: i64, message: String },

    /// The configured token is not 16 hex-encoded bytes
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl From<std::io::Error> for MiioError {
    fn from(error: std::io::Error) -> Self {
        MiioError::Network(error.to_string())
    }
}
