//! # UAV Beam DOA
//!
//! Subspace direction-of-arrival estimation for the UAV beam tracking xApp.
//!
//! Given a planar-array snapshot (or a precomputed sample covariance), this
//! crate estimates the angular position of the dominant signal source using
//! one of two closed, configuration-selected methods:
//!
//! - **MUSIC**: eigendecomposition, noise-subspace projection, and a
//!   discretized azimuth/elevation grid scan. Higher resolution, higher
//!   latency.
//! - **ESPRIT**: shift-invariance between overlapping sub-arrays, solved in
//!   closed form without a grid scan. Lower latency, degrades on small
//!   arrays.
//!
//! Both paths share the same public contract ([`AngleEstimator::estimate`])
//! and are purely functional: no internal state is mutated by estimation.
//!
//! # Example
//!
//! ```rust
//! use uav_beam_doa::{AngleEstimator, EstimatorConfig, SampleCovariance};
//! use uav_beam_doa::synthetic::synthetic_snapshot;
//!
//! let estimator = AngleEstimator::new(EstimatorConfig::default()).unwrap();
//! let snapshot = synthetic_snapshot(8, 8, 0.5, &[(20.0, 5.0)], 20.0, 200, 1);
//! let estimate = estimator.estimate_snapshot(&snapshot, 1).unwrap();
//! assert!((estimate.azimuth_deg - 20.0).abs() < 3.0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod covariance;
pub mod eigen;
pub mod esprit;
pub mod music;
pub mod steering;
pub mod synthetic;

use serde::{Deserialize, Serialize};
use uav_beam_core::{AngleEstimate, ArraySnapshot};

pub use covariance::SampleCovariance;
pub use esprit::EspritEstimator;
pub use music::MusicEstimator;
pub use steering::steering_vector;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for DOA operations
pub type Result<T> = std::result::Result<T, DoaError>;

/// Unified error type for DOA estimation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DoaError {
    /// The covariance cannot support a stable subspace estimate. Callers
    /// recover locally by falling back to coarser information.
    #[error("insufficient data for a stable subspace estimate: {message}")]
    InsufficientData {
        /// Why the subspace split is infeasible
        message: String,
    },

    /// Input dimensions do not match the configured array geometry.
    #[error("dimension mismatch: expected {expected} elements, got {actual}")]
    DimensionMismatch {
        /// Element count the estimator was configured for
        expected: usize,
        /// Element count the input carried
        actual: usize,
    },

    /// The estimator configuration is unusable.
    #[error("invalid estimator configuration: {0}")]
    InvalidConfig(String),
}

/// Estimation method. A closed set, selected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoaMethod {
    /// Grid-scanned noise-subspace projection.
    Music,
    /// Closed-form shift-invariance solve.
    Esprit,
}

/// The azimuth/elevation grid scanned by the MUSIC path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanGrid {
    /// Lower azimuth bound, degrees.
    pub azimuth_min_deg: f64,
    /// Upper azimuth bound, degrees.
    pub azimuth_max_deg: f64,
    /// Lower elevation bound, degrees.
    pub elevation_min_deg: f64,
    /// Upper elevation bound, degrees.
    pub elevation_max_deg: f64,
    /// Grid resolution, degrees.
    pub step_deg: f64,
}

impl ScanGrid {
    /// Azimuth grid points, inclusive of both bounds.
    #[must_use]
    pub fn azimuth_points(&self) -> Vec<f64> {
        points(self.azimuth_min_deg, self.azimuth_max_deg, self.step_deg)
    }

    /// Elevation grid points, inclusive of both bounds.
    #[must_use]
    pub fn elevation_points(&self) -> Vec<f64> {
        points(self.elevation_min_deg, self.elevation_max_deg, self.step_deg)
    }
}

fn points(min: f64, max: f64, step: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut x = min;
    while x <= max + 1e-9 {
        out.push(x);
        x += step;
    }
    out
}

/// Angle estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Horizontal element count of the antenna array.
    pub num_elements_h: usize,
    /// Vertical element count of the antenna array.
    pub num_elements_v: usize,
    /// Element spacing in wavelengths (0.5 = half-wavelength).
    #[serde(alias = "spacing")]
    pub element_spacing_wavelengths: f64,
    /// Estimation method.
    pub method: DoaMethod,
    /// MUSIC scan resolution, degrees.
    pub scan_step_deg: f64,
    /// Lower azimuth scan bound, degrees.
    pub azimuth_min_deg: f64,
    /// Upper azimuth scan bound, degrees.
    pub azimuth_max_deg: f64,
    /// Lower elevation scan bound, degrees.
    pub elevation_min_deg: f64,
    /// Upper elevation scan bound, degrees.
    pub elevation_max_deg: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            num_elements_h: 8,
            num_elements_v: 8,
            element_spacing_wavelengths: 0.5,
            method: DoaMethod::Music,
            scan_step_deg: 1.0,
            azimuth_min_deg: -60.0,
            azimuth_max_deg: 60.0,
            elevation_min_deg: -30.0,
            elevation_max_deg: 30.0,
        }
    }
}

impl EstimatorConfig {
    /// Total number of array elements.
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.num_elements_h * self.num_elements_v
    }

    fn scan_grid(&self) -> ScanGrid {
        ScanGrid {
            azimuth_min_deg: self.azimuth_min_deg,
            azimuth_max_deg: self.azimuth_max_deg,
            elevation_min_deg: self.elevation_min_deg,
            elevation_max_deg: self.elevation_max_deg,
            step_deg: self.scan_step_deg,
        }
    }
}

/// Direction-of-arrival estimator with a configuration-selected backend.
///
/// Purely functional: estimation has no side effects, and repeated calls
/// with the same input return the same result.
#[derive(Debug, Clone)]
pub struct AngleEstimator {
    config: EstimatorConfig,
    backend: Backend,
}

#[derive(Debug, Clone)]
enum Backend {
    Music(MusicEstimator),
    Esprit(EspritEstimator),
}

impl AngleEstimator {
    /// Builds an estimator from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DoaError::InvalidConfig`] on unusable geometry.
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        if config.num_elements_h < 2 {
            return Err(DoaError::InvalidConfig(
                "array needs at least 2 horizontal elements".into(),
            ));
        }
        if config.num_elements_v < 1 {
            return Err(DoaError::InvalidConfig(
                "array needs at least 1 vertical element".into(),
            ));
        }
        if config.element_spacing_wavelengths <= 0.0 {
            return Err(DoaError::InvalidConfig(
                "element spacing must be positive".into(),
            ));
        }
        if config.scan_step_deg <= 0.0 {
            return Err(DoaError::InvalidConfig(
                "scan step must be positive".into(),
            ));
        }
        if config.azimuth_min_deg >= config.azimuth_max_deg {
            return Err(DoaError::InvalidConfig(
                "azimuth scan bounds are inverted".into(),
            ));
        }

        let backend = match config.method {
            DoaMethod::Music => Backend::Music(MusicEstimator::new(
                config.num_elements_h,
                config.num_elements_v,
                config.element_spacing_wavelengths,
                config.scan_grid(),
            )),
            DoaMethod::Esprit => Backend::Esprit(EspritEstimator::new(
                config.num_elements_h,
                config.num_elements_v,
                config.element_spacing_wavelengths,
            )),
        };

        Ok(Self { config, backend })
    }

    /// The estimator configuration.
    #[must_use]
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimates the dominant source direction from a sample covariance.
    ///
    /// # Errors
    ///
    /// Returns [`DoaError::InsufficientData`] when the covariance cannot
    /// support a stable subspace split, or [`DoaError::DimensionMismatch`]
    /// when its dimension does not match the configured array.
    pub fn estimate(&self, cov: &SampleCovariance, num_sources: usize) -> Result<AngleEstimate> {
        if cov.dim() != self.config.num_elements() {
            return Err(DoaError::DimensionMismatch {
                expected: self.config.num_elements(),
                actual: cov.dim(),
            });
        }
        let estimate = match &self.backend {
            Backend::Music(m) => m.estimate(cov, num_sources),
            Backend::Esprit(e) => e.estimate(cov, num_sources),
        }?;
        tracing::debug!(
            azimuth_deg = estimate.azimuth_deg,
            elevation_deg = estimate.elevation_deg,
            confidence = estimate.confidence.value(),
            method = ?self.config.method,
            "angle estimate"
        );
        Ok(estimate)
    }

    /// Convenience wrapper: builds the sample covariance from a snapshot
    /// and estimates from it.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::estimate`].
    pub fn estimate_snapshot(
        &self,
        snapshot: &ArraySnapshot,
        num_sources: usize,
    ) -> Result<AngleEstimate> {
        if snapshot.num_elements() != self.config.num_elements() {
            return Err(DoaError::DimensionMismatch {
                expected: self.config.num_elements(),
                actual: snapshot.num_elements(),
            });
        }
        let cov = SampleCovariance::from_snapshot(snapshot);
        self.estimate(&cov, num_sources)
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AngleEstimator, DoaError, DoaMethod, EstimatorConfig, Result, SampleCovariance, ScanGrid,
    };
}
