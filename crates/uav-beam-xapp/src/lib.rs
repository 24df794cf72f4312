//! # UAV Beam xApp
//!
//! Service shell for the UAV beam tracking engine: E2 indication/control
//! codec, best-effort state persistence, the HTTP surface, and process
//! bootstrap. The decision logic itself lives in [`uav_beam_tracker`]; this
//! crate only moves bytes to and from it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod e2;
pub mod server;
pub mod store;
pub mod transport;

pub use config::XappConfig;
pub use e2::{E2Indication, RicControlRequest};
pub use server::{create_router, AppState};
pub use store::MemoryStore;
pub use transport::{ChannelTransport, OutboundMessage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Unified error type for the service shell.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum XappError {
    /// Beam tracker error
    #[error("tracking error: {0}")]
    Track(#[from] uav_beam_tracker::TrackError),

    /// Angle estimator error
    #[error("estimator error: {0}")]
    Doa(#[from] uav_beam_doa::DoaError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
