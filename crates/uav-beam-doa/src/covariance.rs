//! Spatial sample covariance of an array snapshot.

use ndarray::Array2;
use num_complex::Complex64;
use uav_beam_core::ArraySnapshot;

use crate::{DoaError, Result};

/// The `N x N` sample covariance matrix `R = (1/K) * sum_k x_k x_k^H` of an
/// array snapshot, together with the number of snapshots `K` that formed it.
///
/// Carrying `K` lets the estimators reject rank-deficient covariances built
/// from too few independent snapshots.
#[derive(Debug, Clone)]
pub struct SampleCovariance {
    matrix: Array2<Complex64>,
    num_snapshots: usize,
}

impl SampleCovariance {
    /// Builds the sample covariance from an array snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &ArraySnapshot) -> Self {
        let n = snapshot.num_elements();
        let k = snapshot.num_snapshots();
        let samples = snapshot.samples();

        let mut matrix = Array2::<Complex64>::zeros((n, n));
        for snap in samples.rows() {
            for i in 0..n {
                for j in 0..n {
                    matrix[[i, j]] += snap[i] * snap[j].conj();
                }
            }
        }
        let scale = 1.0 / k as f64;
        matrix.mapv_inplace(|z| z * scale);

        Self {
            matrix,
            num_snapshots: k,
        }
    }

    /// Wraps an externally computed covariance matrix.
    ///
    /// `num_snapshots` is the number of snapshots that produced it and is
    /// used for rank-deficiency checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square.
    pub fn from_matrix(matrix: Array2<Complex64>, num_snapshots: usize) -> Result<Self> {
        if matrix.nrows() != matrix.ncols() {
            return Err(DoaError::DimensionMismatch {
                expected: matrix.nrows(),
                actual: matrix.ncols(),
            });
        }
        Ok(Self {
            matrix,
            num_snapshots,
        })
    }

    /// The covariance matrix.
    #[must_use]
    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    /// Matrix dimension (number of array elements).
    #[must_use]
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of snapshots that formed the covariance.
    #[must_use]
    pub fn num_snapshots(&self) -> usize {
        self.num_snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::synthetic_snapshot;

    #[test]
    fn test_covariance_is_hermitian() {
        let snap = synthetic_snapshot(4, 2, 0.5, &[(20.0, 5.0)], 10.0, 100, 7);
        let cov = SampleCovariance::from_snapshot(&snap);
        let m = cov.matrix();
        for i in 0..8 {
            for j in 0..8 {
                let diff = m[[i, j]] - m[[j, i]].conj();
                assert!(diff.norm() < 1e-9, "not Hermitian at ({i},{j})");
            }
        }
    }

    #[test]
    fn test_from_matrix_rejects_non_square() {
        let m = Array2::<Complex64>::zeros((3, 4));
        assert!(SampleCovariance::from_matrix(m, 10).is_err());
    }

    #[test]
    fn test_diagonal_is_real_positive() {
        let snap = synthetic_snapshot(4, 1, 0.5, &[(0.0, 0.0)], 20.0, 50, 3);
        let cov = SampleCovariance::from_snapshot(&snap);
        for i in 0..4 {
            let d = cov.matrix()[[i, i]];
            assert!(d.im.abs() < 1e-9);
            assert!(d.re > 0.0);
        }
    }
}
