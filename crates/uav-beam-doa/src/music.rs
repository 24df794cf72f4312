//! MUSIC (MUltiple SIgnal Classification) angle estimation.
//!
//! Eigendecomposes the spatial covariance, partitions eigenvectors into
//! signal and noise subspaces, and scans a discretized azimuth/elevation
//! grid for the peak of the pseudo-spectrum
//!
//! ```text
//! P(theta, phi) = 1 / || En^H a(theta, phi) ||^2
//! ```
//!
//! where `En` is the noise-subspace basis. Confidence is derived from the
//! ratio of the main peak to the strongest secondary peak.

use ndarray::Array2;
use num_complex::Complex64;
use uav_beam_core::{AngleEstimate, Confidence};

use crate::covariance::SampleCovariance;
use crate::eigen::eigen_hermitian;
use crate::steering::steering_vector;
use crate::{DoaError, Result, ScanGrid};

/// MUSIC estimator over a uniform planar array.
#[derive(Debug, Clone)]
pub struct MusicEstimator {
    elements_h: usize,
    elements_v: usize,
    spacing: f64,
    scan: ScanGrid,
}

impl MusicEstimator {
    /// Creates a MUSIC estimator for the given array geometry and scan grid.
    #[must_use]
    pub fn new(elements_h: usize, elements_v: usize, spacing: f64, scan: ScanGrid) -> Self {
        Self {
            elements_h,
            elements_v,
            spacing,
            scan,
        }
    }

    /// Estimates the dominant source direction from a sample covariance.
    ///
    /// `num_sources` sets the signal-subspace dimension; the returned
    /// estimate is the global pseudo-spectrum peak.
    ///
    /// # Errors
    ///
    /// Returns [`DoaError::InsufficientData`] if the covariance cannot
    /// support a stable subspace split.
    pub fn estimate(&self, cov: &SampleCovariance, num_sources: usize) -> Result<AngleEstimate> {
        let n = cov.dim();
        check_subspace(n, cov.num_snapshots(), num_sources)?;

        let (eigenvalues, eigenvectors) = eigen_hermitian(cov.matrix());
        let noise_dim = n - num_sources;

        // Noise subspace: eigenvectors of the smallest n - d eigenvalues
        // (eigen_hermitian returns them ascending).
        let noise = eigenvectors.slice(ndarray::s![.., 0..noise_dim]).to_owned();
        debug_assert!(eigenvalues.len() == n);

        let azimuths = self.scan.azimuth_points();
        let elevations = if self.elements_v > 1 {
            self.scan.elevation_points()
        } else {
            // A single-row array carries no vertical aperture.
            vec![0.0]
        };

        let mut spectrum = Vec::with_capacity(azimuths.len() * elevations.len());
        let mut best = (f64::MIN, 0.0, 0.0);
        for &el in &elevations {
            for &az in &azimuths {
                let p = self.pseudo_spectrum_at(&noise, az, el);
                if p > best.0 {
                    best = (p, az, el);
                }
                spectrum.push((az, el, p));
            }
        }

        let (p1, az1, el1) = best;
        if !p1.is_finite() || p1 <= 0.0 {
            return Err(DoaError::InsufficientData {
                message: "pseudo-spectrum is degenerate over the scan grid".into(),
            });
        }

        let confidence = self.peak_confidence(&spectrum, p1, az1, el1);

        Ok(AngleEstimate {
            azimuth_deg: az1,
            elevation_deg: el1,
            confidence,
        })
    }

    /// Pseudo-spectrum value at one grid point.
    fn pseudo_spectrum_at(&self, noise: &Array2<Complex64>, az: f64, el: f64) -> f64 {
        let a = steering_vector(self.elements_h, self.elements_v, self.spacing, az, el);
        let n = a.len();

        let mut denom = 0.0;
        for col in 0..noise.ncols() {
            let mut dot = Complex64::new(0.0, 0.0);
            for k in 0..n {
                // a^H * e_col
                dot += a[k].conj() * noise[[k, col]];
            }
            denom += dot.norm_sqr();
        }
        if denom > 1e-20 {
            1.0 / denom
        } else {
            1e10
        }
    }

    /// Confidence from peak sharpness: 1 - P2/P1, where P2 is the strongest
    /// peak outside the main lobe's neighbourhood.
    fn peak_confidence(
        &self,
        spectrum: &[(f64, f64, f64)],
        p1: f64,
        az1: f64,
        el1: f64,
    ) -> Confidence {
        let exclusion = 2.0 * self.scan.step_deg;
        let p2 = spectrum
            .iter()
            .filter(|&&(az, el, _)| (az - az1).abs() > exclusion || (el - el1).abs() > exclusion)
            .map(|&(_, _, p)| p)
            .fold(f64::MIN, f64::max);

        if p2 <= 0.0 || !p2.is_finite() {
            return Confidence::MAX;
        }
        Confidence::clamped(1.0 - p2 / p1)
    }
}

/// Shared subspace feasibility check for MUSIC and ESPRIT.
pub(crate) fn check_subspace(n: usize, snapshots: usize, num_sources: usize) -> Result<()> {
    if num_sources == 0 {
        return Err(DoaError::InvalidConfig(
            "num_sources must be at least 1".into(),
        ));
    }
    if n < num_sources + 1 {
        return Err(DoaError::InsufficientData {
            message: format!(
                "{n} array elements cannot separate {num_sources} source(s) from noise"
            ),
        });
    }
    if snapshots < num_sources + 1 {
        return Err(DoaError::InsufficientData {
            message: format!(
                "covariance formed from {snapshots} snapshot(s) is rank-deficient for \
                 {num_sources} source(s)"
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::synthetic_snapshot;

    fn scan() -> ScanGrid {
        ScanGrid {
            azimuth_min_deg: -60.0,
            azimuth_max_deg: 60.0,
            elevation_min_deg: -30.0,
            elevation_max_deg: 30.0,
            step_deg: 1.0,
        }
    }

    #[test]
    fn test_single_source_ula() {
        let snap = synthetic_snapshot(8, 1, 0.5, &[(30.0, 0.0)], 20.0, 200, 11);
        let cov = SampleCovariance::from_snapshot(&snap);
        let music = MusicEstimator::new(8, 1, 0.5, scan());

        let est = music.estimate(&cov, 1).unwrap();
        assert!(
            (est.azimuth_deg - 30.0).abs() <= 2.0,
            "azimuth {} not near 30",
            est.azimuth_deg
        );
        assert!((est.elevation_deg).abs() < 1e-9);
    }

    #[test]
    fn test_single_source_planar() {
        let snap = synthetic_snapshot(8, 8, 0.5, &[(-20.0, 10.0)], 20.0, 200, 5);
        let cov = SampleCovariance::from_snapshot(&snap);
        let music = MusicEstimator::new(8, 8, 0.5, scan());

        let est = music.estimate(&cov, 1).unwrap();
        assert!(
            (est.azimuth_deg - -20.0).abs() <= 2.0,
            "azimuth {} not near -20",
            est.azimuth_deg
        );
        assert!(
            (est.elevation_deg - 10.0).abs() <= 2.0,
            "elevation {} not near 10",
            est.elevation_deg
        );
    }

    #[test]
    fn test_confidence_in_unit_range() {
        let snap = synthetic_snapshot(8, 1, 0.5, &[(15.0, 0.0)], 15.0, 200, 21);
        let cov = SampleCovariance::from_snapshot(&snap);
        let music = MusicEstimator::new(8, 1, 0.5, scan());

        let est = music.estimate(&cov, 1).unwrap();
        assert!(est.confidence.value() >= 0.0);
        assert!(est.confidence.value() <= 1.0);
    }

    #[test]
    fn test_too_few_snapshots_rejected() {
        let snap = synthetic_snapshot(8, 1, 0.5, &[(15.0, 0.0)], 15.0, 1, 21);
        let cov = SampleCovariance::from_snapshot(&snap);
        let music = MusicEstimator::new(8, 1, 0.5, scan());

        assert!(matches!(
            music.estimate(&cov, 1),
            Err(DoaError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_too_few_elements_rejected() {
        let snap = synthetic_snapshot(2, 1, 0.5, &[(15.0, 0.0)], 15.0, 50, 21);
        let cov = SampleCovariance::from_snapshot(&snap);
        let music = MusicEstimator::new(2, 1, 0.5, scan());

        assert!(matches!(
            music.estimate(&cov, 2),
            Err(DoaError::InsufficientData { .. })
        ));
    }
}
