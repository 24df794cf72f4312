//! Hermitian eigendecomposition for small spatial covariance matrices.
//!
//! The covariance matrices handled here are N x N with N = number of array
//! elements (typically 16-64), so a dense Jacobi sweep is both adequate and
//! dependency-free. The Hermitian problem H = A + jB is lifted to the real
//! symmetric augmented form
//!
//! ```text
//! M = | A  -B |
//!     | B   A |   (2N x 2N, symmetric)
//! ```
//!
//! whose eigenvalues are those of H, each appearing twice; the eigenvector
//! (v_r, v_i) of M maps back to the complex eigenvector v_r + j*v_i.

use ndarray::Array2;
use num_complex::Complex64;

/// Eigendecomposition of a Hermitian matrix.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvalues sorted ascending
/// and eigenvectors as the corresponding columns of the returned matrix.
pub fn eigen_hermitian(matrix: &Array2<Complex64>) -> (Vec<f64>, Array2<Complex64>) {
    let n = matrix.nrows();
    debug_assert_eq!(n, matrix.ncols(), "covariance must be square");

    // Build the real symmetric augmented matrix.
    let mut aug = vec![vec![0.0f64; 2 * n]; 2 * n];
    for i in 0..n {
        for j in 0..n {
            let z = matrix[[i, j]];
            aug[i][j] = z.re;
            aug[i][n + j] = -z.im;
            aug[n + i][j] = z.im;
            aug[n + i][n + j] = z.re;
        }
    }

    let (eig_vals, eig_vecs) = jacobi_eigen(&aug);

    // Each eigenvalue of H appears twice in M. Sort ascending and pick one
    // representative per pair.
    let mut indices: Vec<usize> = (0..2 * n).collect();
    indices.sort_by(|&a, &b| eig_vals[a].total_cmp(&eig_vals[b]));

    let mut eigenvalues = Vec::with_capacity(n);
    let mut eigenvectors = Array2::<Complex64>::zeros((n, n));
    let mut used = vec![false; 2 * n];

    for &idx in &indices {
        if used[idx] {
            continue;
        }
        used[idx] = true;

        let col = eigenvalues.len();
        eigenvalues.push(eig_vals[idx]);
        for k in 0..n {
            eigenvectors[[k, col]] = Complex64::new(eig_vecs[idx][k], eig_vecs[idx][n + k]);
        }

        // Mark the paired duplicate as consumed.
        for &idx2 in &indices {
            if !used[idx2] && (eig_vals[idx2] - eig_vals[idx]).abs() < 1e-6 {
                used[idx2] = true;
                break;
            }
        }

        if eigenvalues.len() == n {
            break;
        }
    }

    (eigenvalues, eigenvectors)
}

/// Cyclic Jacobi eigendecomposition of a real symmetric matrix.
///
/// Returns unsorted eigenvalues and eigenvectors; `eigenvectors[i]` is the
/// eigenvector belonging to `eigenvalues[i]`.
fn jacobi_eigen(a: &[Vec<f64>]) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut d: Vec<f64> = (0..n).map(|i| a[i][i]).collect();
    let mut v = vec![vec![0.0; n]; n];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    let mut b = d.clone();
    let mut z = vec![0.0; n];
    let mut mat = a.to_vec();

    for _ in 0..100 {
        let mut sm = 0.0;
        for i in 0..n - 1 {
            for j in i + 1..n {
                sm += mat[i][j].abs();
            }
        }
        if sm < 1e-12 {
            break;
        }

        for p in 0..n - 1 {
            for q in p + 1..n {
                if mat[p][q].abs() < 1e-15 {
                    continue;
                }
                let h = d[q] - d[p];
                let t = if h.abs() < 1e-15 {
                    1.0_f64.copysign(mat[p][q])
                } else {
                    let theta = 0.5 * h / mat[p][q];
                    1.0 / (theta.abs() + (1.0 + theta * theta).sqrt()) * theta.signum()
                };
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;
                let tau = s / (1.0 + c);
                let a_pq = mat[p][q];

                z[p] -= t * a_pq;
                z[q] += t * a_pq;
                d[p] -= t * a_pq;
                d[q] += t * a_pq;
                mat[p][q] = 0.0;

                for j in 0..p {
                    let g = mat[j][p];
                    let h = mat[j][q];
                    mat[j][p] = g - s * (h + g * tau);
                    mat[j][q] = h + s * (g - h * tau);
                }
                for j in p + 1..q {
                    let g = mat[p][j];
                    let h = mat[j][q];
                    mat[p][j] = g - s * (h + g * tau);
                    mat[j][q] = h + s * (g - h * tau);
                }
                for j in q + 1..n {
                    let g = mat[p][j];
                    let h = mat[q][j];
                    mat[p][j] = g - s * (h + g * tau);
                    mat[q][j] = h + s * (g - h * tau);
                }
                for row in v.iter_mut() {
                    let g = row[p];
                    let h = row[q];
                    row[p] = g - s * (h + g * tau);
                    row[q] = h + s * (g - h * tau);
                }
            }
        }

        for i in 0..n {
            b[i] += z[i];
            d[i] = b[i];
            z[i] = 0.0;
        }
    }

    // v holds eigenvectors as columns; return them as rows for indexing.
    let eigenvectors: Vec<Vec<f64>> = (0..n).map(|i| (0..n).map(|j| v[j][i]).collect()).collect();

    (d, eigenvectors)
}
