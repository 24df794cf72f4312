//! Collaborator seams for the UAV beam tracking core.
//!
//! The decision engine itself never blocks on external I/O; these traits
//! mark the two boundaries where its output leaves the process. Both are
//! invoked after a decision is produced, outside the per-receiver critical
//! section.
//!
//! - [`MessageTransport`]: carries control directives to the radio node
//! - [`StateStore`]: best-effort durability for per-receiver state

use crate::error::{StorageError, TransportError};

/// Outbound message transport toward the radio node.
///
/// In production this is backed by the RIC message router; tests and local
/// runs use an in-process channel implementation. Delivery failures are
/// reported to the caller and logged — they never influence the decision
/// already made.
pub trait MessageTransport: Send + Sync {
    /// Sends one framed message of the given type.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed to the
    /// underlying transport.
    fn send(&self, msg_type: u32, payload: &[u8]) -> Result<(), TransportError>;
}

/// Best-effort key-value persistence for per-receiver state.
///
/// Availability is not required for the decision loop to function: a store
/// failure is logged and the loop continues.
pub trait StateStore: Send + Sync {
    /// Stores a value under the given key, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write failed.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Retrieves the value stored under the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the read failed. A missing key is `Ok(None)`,
    /// not an error.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
}
