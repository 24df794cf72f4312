//! Error types shared across the UAV beam tracking system.
//!
//! Each processing crate defines its own error enum (`DoaError`,
//! `TrackError`); this module holds the errors belonging to the shared
//! data model and to the collaborator seams (transport, state store).

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the shared data model and collaborator traits.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Validation error for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what validation failed
        message: String,
    },

    /// Outbound transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// State store error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CoreError {
    /// Creates a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Errors from the outbound message transport.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// The transport failed to deliver a message
    #[error("send failed: {message}")]
    SendFailed {
        /// Description of the delivery failure
        message: String,
    },

    /// The transport has been shut down
    #[error("transport closed")]
    Closed,
}

/// Errors from the best-effort state store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StorageError {
    /// A write to the store failed
    #[error("write failed for key '{key}': {message}")]
    WriteFailed {
        /// Store key being written
        key: String,
        /// Description of the failure
        message: String,
    },

    /// A read from the store failed
    #[error("read failed for key '{key}': {message}")]
    ReadFailed {
        /// Store key being read
        key: String,
        /// Description of the failure
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = CoreError::validation("bad field");
        assert_eq!(err.to_string(), "Validation error: bad field");
    }

    #[test]
    fn test_transport_error_converts() {
        let err: CoreError = TransportError::Closed.into();
        assert!(matches!(err, CoreError::Transport(_)));
    }
}
