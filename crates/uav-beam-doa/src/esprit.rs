//! ESPRIT angle estimation via shift invariance.
//!
//! Avoids the MUSIC grid scan by exploiting the rotational invariance
//! between maximally overlapping sub-arrays:
//!
//! 1. Eigendecompose the covariance and keep the signal subspace `Es`.
//! 2. Select the two overlapping sub-arrays along one axis:
//!    `E1 = J1 Es`, `E2 = J2 Es`.
//! 3. Solve the invariance equation `E2 = E1 * Phi` by least squares.
//! 4. The dominant eigenvalue of `Phi` encodes the electrical phase shift
//!    between adjacent elements, from which the angle follows.
//!
//! For the planar array this is done twice: along the vertical axis for
//! elevation, then along the horizontal axis for azimuth (corrected by
//! `cos(elevation)`). Lower latency than MUSIC, comparable accuracy for
//! well-separated sources; degrades on very small arrays.

use std::f64::consts::PI;

use ndarray::Array2;
use num_complex::Complex64;
use uav_beam_core::{AngleEstimate, Confidence};

use crate::covariance::SampleCovariance;
use crate::eigen::eigen_hermitian;
use crate::music::check_subspace;
use crate::{DoaError, Result};

/// ESPRIT estimator over a uniform planar array.
#[derive(Debug, Clone)]
pub struct EspritEstimator {
    elements_h: usize,
    elements_v: usize,
    spacing: f64,
}

impl EspritEstimator {
    /// Creates an ESPRIT estimator for the given array geometry.
    #[must_use]
    pub fn new(elements_h: usize, elements_v: usize, spacing: f64) -> Self {
        Self {
            elements_h,
            elements_v,
            spacing,
        }
    }

    /// Estimates the dominant source direction from a sample covariance.
    ///
    /// # Errors
    ///
    /// Returns [`DoaError::InsufficientData`] if the covariance cannot
    /// support a stable subspace split or a sub-array solve degenerates.
    pub fn estimate(&self, cov: &SampleCovariance, num_sources: usize) -> Result<AngleEstimate> {
        let n = cov.dim();
        check_subspace(n, cov.num_snapshots(), num_sources)?;

        let (eigenvalues, eigenvectors) = eigen_hermitian(cov.matrix());

        // Signal subspace: eigenvectors of the largest d eigenvalues.
        let signal = eigenvectors
            .slice(ndarray::s![.., n - num_sources..])
            .to_owned();

        // Elevation from the vertical shift invariance (when the array has
        // vertical aperture at all).
        let elevation_deg = if self.elements_v > 1 {
            let (e1, e2) = self.select_vertical(&signal);
            let lambda = self.invariance_eigenvalue(&e1, &e2)?;
            let sin_el = (lambda.arg() / (2.0 * PI * self.spacing)).clamp(-1.0, 1.0);
            sin_el.asin().to_degrees()
        } else {
            0.0
        };

        // Azimuth from the horizontal shift invariance, cos-elevation
        // corrected.
        let (e1, e2) = self.select_horizontal(&signal);
        let lambda = self.invariance_eigenvalue(&e1, &e2)?;
        let cos_el = elevation_deg.to_radians().cos().max(0.1);
        let sin_az = (lambda.arg() / (2.0 * PI * self.spacing * cos_el)).clamp(-1.0, 1.0);
        let azimuth_deg = sin_az.asin().to_degrees();

        let confidence = eigenvalue_separation(&eigenvalues, num_sources);

        Ok(AngleEstimate {
            azimuth_deg,
            elevation_deg,
            confidence,
        })
    }

    /// Overlapping sub-arrays along the vertical axis: rows `v < V-1`
    /// against rows `v >= 1`.
    fn select_vertical(&self, signal: &Array2<Complex64>) -> (Array2<Complex64>, Array2<Complex64>) {
        let h = self.elements_h;
        let v = self.elements_v;
        let d = signal.ncols();
        let rows = h * (v - 1);

        let mut e1 = Array2::<Complex64>::zeros((rows, d));
        let mut e2 = Array2::<Complex64>::zeros((rows, d));
        for i in 0..rows {
            for c in 0..d {
                e1[[i, c]] = signal[[i, c]];
                e2[[i, c]] = signal[[i + h, c]];
            }
        }
        (e1, e2)
    }

    /// Overlapping sub-arrays along the horizontal axis: columns `h < H-1`
    /// against columns `h >= 1`, taken across every row of the array.
    fn select_horizontal(
        &self,
        signal: &Array2<Complex64>,
    ) -> (Array2<Complex64>, Array2<Complex64>) {
        let h = self.elements_h;
        let v = self.elements_v;
        let d = signal.ncols();
        let rows = (h - 1) * v;

        let mut e1 = Array2::<Complex64>::zeros((rows, d));
        let mut e2 = Array2::<Complex64>::zeros((rows, d));
        let mut out = 0;
        for row in 0..v {
            for col in 0..h - 1 {
                let src = row * h + col;
                for c in 0..d {
                    e1[[out, c]] = signal[[src, c]];
                    e2[[out, c]] = signal[[src + 1, c]];
                }
                out += 1;
            }
        }
        (e1, e2)
    }

    /// Solves `E2 = E1 * Phi` by least squares and returns the dominant
    /// eigenvalue of `Phi`.
    fn invariance_eigenvalue(
        &self,
        e1: &Array2<Complex64>,
        e2: &Array2<Complex64>,
    ) -> Result<Complex64> {
        let e1_h = hermitian_transpose(e1);
        let gram = e1_h.dot(e1);
        let rhs = e1_h.dot(e2);

        let gram_inv = invert(&gram).ok_or_else(|| DoaError::InsufficientData {
            message: "sub-array Gram matrix is singular".into(),
        })?;
        let phi = gram_inv.dot(&rhs);

        Ok(dominant_eigenvalue(&phi))
    }
}

/// Confidence from the separation between signal and noise eigenvalues:
/// well-separated subspaces give values near 1, a collapsed spectrum gives 0.
fn eigenvalue_separation(eigenvalues: &[f64], num_sources: usize) -> Confidence {
    let n = eigenvalues.len();
    let noise_dim = n - num_sources;
    let noise_mean = eigenvalues[..noise_dim].iter().sum::<f64>() / noise_dim as f64;
    let signal_min = eigenvalues[noise_dim];
    if signal_min <= 0.0 {
        return Confidence::MIN;
    }
    Confidence::clamped(1.0 - noise_mean / signal_min)
}

fn hermitian_transpose(a: &Array2<Complex64>) -> Array2<Complex64> {
    a.t().mapv(|z| z.conj())
}

/// Gauss-Jordan inverse of a small complex matrix with partial pivoting.
///
/// Returns `None` if the matrix is singular.
fn invert(a: &Array2<Complex64>) -> Option<Array2<Complex64>> {
    let n = a.nrows();
    let mut aug = Array2::<Complex64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, i + n]] = Complex64::new(1.0, 0.0);
    }

    for col in 0..n {
        let mut max_val = 0.0;
        let mut max_row = col;
        for row in col..n {
            let val = aug[[row, col]].norm();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        if max_val < 1e-12 {
            return None;
        }
        if max_row != col {
            for j in 0..2 * n {
                let tmp = aug[[col, j]];
                aug[[col, j]] = aug[[max_row, j]];
                aug[[max_row, j]] = tmp;
            }
        }

        let pivot_inv = Complex64::new(1.0, 0.0) / aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] *= pivot_inv;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[[row, col]];
            for j in 0..2 * n {
                let sub = aug[[col, j]] * factor;
                aug[[row, j]] -= sub;
            }
        }
    }

    let mut out = Array2::<Complex64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            out[[i, j]] = aug[[i, j + n]];
        }
    }
    Some(out)
}

/// Dominant eigenvalue of a small complex matrix via power iteration with a
/// Rayleigh-quotient readout. Exact for 1x1.
fn dominant_eigenvalue(phi: &Array2<Complex64>) -> Complex64 {
    let d = phi.nrows();
    if d == 1 {
        return phi[[0, 0]];
    }

    let mut x: Vec<Complex64> = vec![Complex64::new(1.0 / (d as f64).sqrt(), 0.0); d];
    let mut lambda = Complex64::new(0.0, 0.0);
    for _ in 0..100 {
        let mut y = vec![Complex64::new(0.0, 0.0); d];
        for i in 0..d {
            for j in 0..d {
                y[i] += phi[[i, j]] * x[j];
            }
        }
        let norm: f64 = y.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
        if norm < 1e-15 {
            break;
        }
        for z in &mut y {
            *z /= norm;
        }
        // Rayleigh quotient x^H Phi x with the normalized iterate.
        let mut num = Complex64::new(0.0, 0.0);
        for i in 0..d {
            let mut row = Complex64::new(0.0, 0.0);
            for j in 0..d {
                row += phi[[i, j]] * y[j];
            }
            num += y[i].conj() * row;
        }
        lambda = num;
        x = y;
    }
    lambda
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::synthetic_snapshot;

    #[test]
    fn test_single_source_ula() {
        let snap = synthetic_snapshot(8, 1, 0.5, &[(30.0, 0.0)], 20.0, 500, 13);
        let cov = SampleCovariance::from_snapshot(&snap);
        let esprit = EspritEstimator::new(8, 1, 0.5);

        let est = esprit.estimate(&cov, 1).unwrap();
        assert!(
            (est.azimuth_deg - 30.0).abs() <= 3.0,
            "azimuth {} not near 30",
            est.azimuth_deg
        );
        assert!(est.elevation_deg.abs() < 1e-9);
    }

    #[test]
    fn test_single_source_planar() {
        let snap = synthetic_snapshot(8, 8, 0.5, &[(-15.0, 8.0)], 20.0, 500, 29);
        let cov = SampleCovariance::from_snapshot(&snap);
        let esprit = EspritEstimator::new(8, 8, 0.5);

        let est = esprit.estimate(&cov, 1).unwrap();
        assert!(
            (est.azimuth_deg - -15.0).abs() <= 3.0,
            "azimuth {} not near -15",
            est.azimuth_deg
        );
        assert!(
            (est.elevation_deg - 8.0).abs() <= 3.0,
            "elevation {} not near 8",
            est.elevation_deg
        );
    }

    #[test]
    fn test_negative_azimuth() {
        let snap = synthetic_snapshot(8, 1, 0.5, &[(-25.0, 0.0)], 20.0, 500, 31);
        let cov = SampleCovariance::from_snapshot(&snap);
        let esprit = EspritEstimator::new(8, 1, 0.5);

        let est = esprit.estimate(&cov, 1).unwrap();
        assert!(
            (est.azimuth_deg - -25.0).abs() <= 3.0,
            "azimuth {} not near -25",
            est.azimuth_deg
        );
    }

    #[test]
    fn test_confidence_high_at_high_snr() {
        let snap = synthetic_snapshot(8, 1, 0.5, &[(10.0, 0.0)], 25.0, 500, 17);
        let cov = SampleCovariance::from_snapshot(&snap);
        let esprit = EspritEstimator::new(8, 1, 0.5);

        let est = esprit.estimate(&cov, 1).unwrap();
        assert!(
            est.confidence.value() > 0.5,
            "confidence {} too low for 25 dB SNR",
            est.confidence.value()
        );
    }

    #[test]
    fn test_rank_deficient_rejected() {
        let snap = synthetic_snapshot(8, 1, 0.5, &[(10.0, 0.0)], 25.0, 1, 17);
        let cov = SampleCovariance::from_snapshot(&snap);
        let esprit = EspritEstimator::new(8, 1, 0.5);

        assert!(matches!(
            esprit.estimate(&cov, 1),
            Err(DoaError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_invert_identity() {
        let mut m = Array2::<Complex64>::zeros((3, 3));
        for i in 0..3 {
            m[[i, i]] = Complex64::new(2.0, 0.0);
        }
        let inv = invert(&m).unwrap();
        for i in 0..3 {
            assert!((inv[[i, i]].re - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invert_singular() {
        let m = Array2::<Complex64>::zeros((2, 2));
        assert!(invert(&m).is_none());
    }
}
