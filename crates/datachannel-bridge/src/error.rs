//! Error types for the bridge layer
//!
//! Provides a unified error type that maps onto the exception classes a
//! consumer-side host environment reports (`InvalidStateError`, `TypeError`,
//! and so on).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bridge error type
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Operation attempted while the handle is gone or the channel is not open
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Malformed argument from the consumer (bad payload type, unknown
    /// `binaryType` value)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The provider rejected a second observer registration on a handle
    #[error("an observer is already registered on data channel {0}")]
    AlreadyRegistered(u16),

    /// Error reported by the channel provider
    #[error("provider error: {0}")]
    Provider(String),
}

impl BridgeError {
    /// Get the host-visible error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::InvalidState(_) => ErrorCode::InvalidStateError,
            BridgeError::InvalidArgument(_) => ErrorCode::TypeError,
            BridgeError::AlreadyRegistered(_) => ErrorCode::InvalidAccessError,
            BridgeError::Provider(_) => ErrorCode::OperationError,
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        BridgeError::InvalidState(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        BridgeError::InvalidArgument(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        BridgeError::Provider(msg.into())
    }
}

/// Host-visible error codes, named after the exception classes a consumer
/// environment raises for them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Operation not allowed in the current channel state
    InvalidStateError,
    /// Argument of the wrong type or outside its closed enumeration
    TypeError,
    /// Exclusive resource (the observer slot) already in use
    InvalidAccessError,
    /// Failure reported by an external collaborator
    OperationError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::InvalidStateError => write!(f, "InvalidStateError"),
            ErrorCode::TypeError => write!(f, "TypeError"),
            ErrorCode::InvalidAccessError => write!(f, "InvalidAccessError"),
            ErrorCode::OperationError => write!(f, "OperationError"),
        }
    }
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BridgeError::invalid_state("test").code(),
            ErrorCode::InvalidStateError
        );
        assert_eq!(
            BridgeError::invalid_argument("test").code(),
            ErrorCode::TypeError
        );
        assert_eq!(
            BridgeError::AlreadyRegistered(7).code(),
            ErrorCode::InvalidAccessError
        );
        assert_eq!(
            BridgeError::provider("test").code(),
            ErrorCode::OperationError
        );
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::invalid_state("readyState is not 'open'");
        assert_eq!(err.to_string(), "invalid state: readyState is not 'open'");
        assert_eq!(
            BridgeError::AlreadyRegistered(3).to_string(),
            "an observer is already registered on data channel 3"
        );
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::TypeError.to_string(), "TypeError");
        assert_eq!(
            ErrorCode::InvalidStateError.to_string(),
            "InvalidStateError"
        );
    }
}
