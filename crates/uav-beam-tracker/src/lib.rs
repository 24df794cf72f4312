//! # UAV Beam Tracker
//!
//! The stateful decision engine of the UAV beam tracking xApp: trajectory
//! prediction, beam grid geometry, and the per-receiver beam-selection
//! state machine.
//!
//! ## Architecture
//!
//! - [`kinematics`]: constant-acceleration Kalman filter with physical
//!   bounds, one instance per receiver.
//! - [`grid`]: mapping between beam indices and pointing directions over
//!   the array's field of view.
//! - [`policy`]: the pure transition function
//!   `(state, measurement, context) -> (state', decision)` implementing
//!   degradation detection, staged P1/P2/P3 failure recovery, and
//!   proactive hysteresis switching.
//! - [`tracker`]: the concurrent per-receiver table orchestrating the
//!   three, with idle eviction and statistics.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use uav_beam_core::{BeamGridConfig, BeamId, BeamMeasurement, ReceiverId};
//! use uav_beam_tracker::{BeamTracker, PolicyConfig, PredictorConfig};
//!
//! let tracker = BeamTracker::new(
//!     BeamGridConfig::default(),
//!     PolicyConfig::default(),
//!     PredictorConfig::default(),
//! );
//!
//! let measurement = BeamMeasurement {
//!     timestamp_ms: 0,
//!     receiver_id: ReceiverId::new("UAV-001"),
//!     serving_beam_id: BeamId::new(1),
//!     serving_rsrp_dbm: -72.0,
//!     neighbor_beams: BTreeMap::new(),
//!     position: None,
//!     velocity: None,
//!     snapshot: None,
//! };
//! let decision = tracker.process_measurement(&measurement).unwrap();
//! assert_eq!(decision.current_beam_id, BeamId::new(1));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod grid;
pub mod kinematics;
pub mod policy;
pub mod tracker;

use uav_beam_core::ReceiverId;

pub use grid::BeamGrid;
pub use kinematics::{KinematicFilter, PredictorConfig};
pub use policy::{PolicyConfig, RecoveryPhase, ReceiverTrackState, TransitionContext};
pub use tracker::{BeamTracker, StatsSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackError>;

/// Unified error type for the beam tracker.
///
/// None of these are fatal to the process: a malformed or degenerate
/// report never disturbs the decision loop of other receivers.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TrackError {
    /// A report is missing mandatory fields or carries non-finite values.
    /// The report is rejected; no state is mutated.
    #[error("malformed measurement: {message}")]
    MalformedMeasurement {
        /// What was wrong with the report
        message: String,
    },

    /// A query named a receiver that was evicted or never seen.
    #[error("unknown receiver '{id}'")]
    UnknownReceiver {
        /// The queried receiver
        id: ReceiverId,
    },

    /// The receiver is tracked but has not reported a position yet, so no
    /// kinematic state exists to extrapolate.
    #[error("receiver '{id}' has no kinematic state yet")]
    NoKinematicState {
        /// The queried receiver
        id: ReceiverId,
    },
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::grid::BeamGrid;
    pub use crate::kinematics::{KinematicFilter, PredictorConfig};
    pub use crate::policy::{PolicyConfig, RecoveryPhase, ReceiverTrackState};
    pub use crate::tracker::{BeamTracker, StatsSnapshot};
    pub use crate::{Result, TrackError};
}
