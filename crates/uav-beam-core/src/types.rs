//! Core data types for the UAV beam tracking system.
//!
//! This module defines the data structures exchanged between the angle
//! estimator, the trajectory predictor, and the beam tracker, plus the
//! configuration of the beam grid itself.
//!
//! # Type Categories
//!
//! - **Identity**: [`ReceiverId`], [`BeamId`]
//! - **Measurements**: [`ArraySnapshot`], [`BeamMeasurement`],
//!   [`KinematicObservation`]
//! - **Results**: [`AngleEstimate`], [`BeamDecision`], [`BeamAction`]
//! - **Configuration**: [`BeamGridConfig`]

use std::collections::BTreeMap;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Identity
// =============================================================================

/// Identifier of a tracked receiver (UE), e.g. `"UAV-001"`.
///
/// Assigned by the radio node; the tracker never invents these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiverId(String);

impl ReceiverId {
    /// Creates a receiver ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the receiver ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReceiverId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a beam in the transmit grid.
///
/// Beams are numbered row-major over the grid:
/// `id = row * num_beams_h + col` (see `BeamGrid` in the tracker crate).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BeamId(u32);

impl BeamId {
    /// Creates a beam ID from its raw index.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw beam index.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BeamId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// =============================================================================
// Confidence
// =============================================================================

/// Confidence score in the range [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Maximum confidence (1.0).
    pub const MAX: Self = Self(1.0);

    /// Minimum confidence (0.0).
    pub const MIN: Self = Self(0.0);

    /// Creates a new confidence value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range [0.0, 1.0].
    pub fn new(value: f64) -> CoreResult<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(CoreError::validation(format!(
                "Confidence must be in [0.0, 1.0], got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Creates a confidence value, clamping out-of-range inputs.
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Returns the raw confidence value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Combines two confidence values multiplicatively.
    #[must_use]
    pub fn product(&self, other: Self) -> Self {
        Self(self.0 * other.0)
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self(0.0)
    }
}

// =============================================================================
// Measurements
// =============================================================================

/// Complex baseband samples captured across a planar antenna array.
///
/// Rows are time snapshots, columns are array elements in row-major
/// `(v * elements_h + h)` order. Transient input to the angle estimator;
/// never persisted.
#[derive(Debug, Clone)]
pub struct ArraySnapshot {
    samples: Array2<Complex64>,
    elements_h: usize,
    elements_v: usize,
}

impl ArraySnapshot {
    /// Creates a snapshot, validating the sample matrix shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix has no rows or its column count does
    /// not equal `elements_h * elements_v`.
    pub fn new(
        samples: Array2<Complex64>,
        elements_h: usize,
        elements_v: usize,
    ) -> CoreResult<Self> {
        let expected = elements_h * elements_v;
        if expected == 0 {
            return Err(CoreError::validation(
                "array must have at least one element",
            ));
        }
        if samples.ncols() != expected {
            return Err(CoreError::validation(format!(
                "snapshot has {} columns, expected {} ({}x{} array)",
                samples.ncols(),
                expected,
                elements_h,
                elements_v
            )));
        }
        if samples.nrows() == 0 {
            return Err(CoreError::validation("snapshot contains no samples"));
        }
        Ok(Self {
            samples,
            elements_h,
            elements_v,
        })
    }

    /// The raw sample matrix (snapshots x elements).
    #[must_use]
    pub fn samples(&self) -> &Array2<Complex64> {
        &self.samples
    }

    /// Number of time snapshots.
    #[must_use]
    pub fn num_snapshots(&self) -> usize {
        self.samples.nrows()
    }

    /// Total number of array elements.
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.elements_h * self.elements_v
    }

    /// Horizontal element count.
    #[must_use]
    pub fn elements_h(&self) -> usize {
        self.elements_h
    }

    /// Vertical element count.
    #[must_use]
    pub fn elements_v(&self) -> usize {
        self.elements_v
    }
}

/// A time-stamped position (and optional velocity) observation for one
/// receiver, fed to the trajectory predictor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicObservation {
    /// Observation timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Observed position [x, y, z] in metres.
    pub position: [f64; 3],
    /// Observed velocity [vx, vy, vz] in m/s, when the report carries one.
    pub velocity: Option<[f64; 3]>,
}

/// One beam measurement report — the unit of work for the beam tracker.
///
/// Position, velocity and array snapshot are optional: a report without
/// them still drives the RSRP-trend policy (graceful degradation).
#[derive(Debug, Clone)]
pub struct BeamMeasurement {
    /// Report timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// The reporting receiver.
    pub receiver_id: ReceiverId,
    /// Beam currently serving the receiver.
    pub serving_beam_id: BeamId,
    /// RSRP on the serving beam, in dBm.
    pub serving_rsrp_dbm: f64,
    /// RSRP per measured neighbor beam, in dBm.
    pub neighbor_beams: BTreeMap<BeamId, f64>,
    /// Reported position, if the node included one.
    pub position: Option<[f64; 3]>,
    /// Reported velocity, if the node included one.
    pub velocity: Option<[f64; 3]>,
    /// Array snapshot for angular refinement, if the node included one.
    pub snapshot: Option<ArraySnapshot>,
}

impl BeamMeasurement {
    /// The kinematic observation carried by this report, if any.
    #[must_use]
    pub fn kinematic_observation(&self) -> Option<KinematicObservation> {
        self.position.map(|position| KinematicObservation {
            timestamp_ms: self.timestamp_ms,
            position,
            velocity: self.velocity,
        })
    }

    /// The neighbor beam with the highest RSRP, if any were reported.
    #[must_use]
    pub fn best_neighbor(&self) -> Option<(BeamId, f64)> {
        self.neighbor_beams
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(id, rsrp)| (*id, *rsrp))
    }
}

// =============================================================================
// Results
// =============================================================================

/// An angle-of-arrival estimate produced by the angle estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleEstimate {
    /// Azimuth from array boresight, degrees.
    pub azimuth_deg: f64,
    /// Elevation from the horizontal plane, degrees.
    pub elevation_deg: f64,
    /// Estimate confidence derived from spectrum peak sharpness.
    pub confidence: Confidence,
}

/// Action the tracker directs the radio node to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeamAction {
    /// Keep the current serving beam.
    Maintain,
    /// Switch to `target_beam_id` (proactive or post-refinement).
    Switch,
    /// Run beam-failure recovery toward `target_beam_id`.
    Recover,
}

impl std::fmt::Display for BeamAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Maintain => "maintain",
            Self::Switch => "switch",
            Self::Recover => "recover",
        };
        write!(f, "{s}")
    }
}

/// Output of one `process_measurement` call. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct BeamDecision {
    /// Receiver the decision applies to.
    pub receiver_id: ReceiverId,
    /// Directed action.
    pub action: BeamAction,
    /// Serving beam at decision time.
    pub current_beam_id: BeamId,
    /// Beam the action targets (equals `current_beam_id` for maintain).
    pub target_beam_id: BeamId,
    /// Decision confidence.
    pub confidence: Confidence,
    /// Expected RSRP gain of the target over the serving beam, dB.
    /// Never negative for a switch action.
    pub expected_gain_db: f64,
    /// Short machine-readable reason tag.
    pub reason: &'static str,
    /// Decision timestamp in milliseconds (copied from the report).
    pub timestamp_ms: u64,
}

// =============================================================================
// Configuration
// =============================================================================

/// Geometry and thresholds of the transmit beam grid.
///
/// Immutable after construction. Beam `(col, row)` points at the centre of
/// its cell in a uniform angular partition of the field of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamGridConfig {
    /// Number of beams along the azimuth axis.
    pub num_beams_h: usize,
    /// Number of beams along the elevation axis.
    pub num_beams_v: usize,
    /// RSRP trend below this value (dBm) counts toward beam failure.
    pub beam_failure_threshold_db: f64,
    /// Horizon used when pre-evaluating candidate beams, milliseconds.
    pub prediction_horizon_ms: f64,
    /// Lower azimuth edge of the field of view, degrees.
    pub azimuth_min_deg: f64,
    /// Upper azimuth edge of the field of view, degrees.
    pub azimuth_max_deg: f64,
    /// Lower elevation edge of the field of view, degrees.
    pub elevation_min_deg: f64,
    /// Upper elevation edge of the field of view, degrees.
    pub elevation_max_deg: f64,
}

impl Default for BeamGridConfig {
    fn default() -> Self {
        Self {
            num_beams_h: 16,
            num_beams_v: 8,
            beam_failure_threshold_db: -10.0,
            prediction_horizon_ms: 20.0,
            azimuth_min_deg: -60.0,
            azimuth_max_deg: 60.0,
            elevation_min_deg: -30.0,
            elevation_max_deg: 30.0,
        }
    }
}

impl BeamGridConfig {
    /// Total number of beams in the grid.
    #[must_use]
    pub fn num_beams(&self) -> usize {
        self.num_beams_h * self.num_beams_v
    }
}
