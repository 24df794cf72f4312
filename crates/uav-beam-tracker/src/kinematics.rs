//! Kalman filter for receiver trajectory prediction.
//!
//! Implements a constant-acceleration model in 3-D space.
//! State: [px, py, pz, vx, vy, vz, ax, ay, az] (metres, m/s, m/s²)
//! Observation: position [px, py, pz], optionally followed by a velocity
//! observation [vx, vy, vz] from the same report.

use serde::{Deserialize, Serialize};
use uav_beam_core::KinematicObservation;

/// 9×9 matrix type (row-major)
type Mat9 = [[f64; 9]; 9];
/// 3×3 matrix type (row-major)
type Mat3 = [[f64; 3]; 3];
/// 9-vector
type Vec9 = [f64; 9];
/// 3-vector
type Vec3 = [f64; 3];

/// Trajectory predictor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Physical bound on speed per axis, m/s.
    pub max_velocity: f64,
    /// Physical bound on acceleration per axis, m/s².
    pub max_acceleration: f64,
    /// Process noise (jerk) standard deviation.
    pub process_noise_std: f64,
    /// Position measurement noise standard deviation, metres.
    pub measurement_noise_std: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            max_velocity: 30.0,
            max_acceleration: 5.0,
            process_noise_std: 0.1,
            measurement_noise_std: 1.0,
        }
    }
}

/// Kalman filter state for one tracked receiver.
///
/// The filter uses a constant-acceleration motion model with additive
/// white-noise jerk. Observations implying motion outside the configured
/// physical bounds are blended, not rejected: the gain-weighted update is
/// applied and the resulting velocity/acceleration components clamped.
#[derive(Debug, Clone)]
pub struct KinematicFilter {
    /// State estimate [px, py, pz, vx, vy, vz, ax, ay, az]
    x: Vec9,
    /// State covariance (9×9, symmetric positive-definite)
    p: Mat9,
    config: PredictorConfig,
    /// Timestamp of the last absorbed observation; `None` until initialized.
    last_timestamp_ms: Option<u64>,
}

impl KinematicFilter {
    /// Creates an uninitialized filter; the first observation initializes it.
    #[must_use]
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            x: [0.0; 9],
            p: mat9_identity(),
            config,
            last_timestamp_ms: None,
        }
    }

    /// `true` once at least one observation has been absorbed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.last_timestamp_ms.is_some()
    }

    /// Absorbs one observation.
    ///
    /// The first observation initializes the filter (position from the
    /// observation, velocity from the observation or zero, large initial
    /// covariance) rather than failing. Subsequent observations predict
    /// the state forward to the observation timestamp and apply the
    /// gain-weighted correction.
    pub fn update(&mut self, obs: &KinematicObservation) {
        let Some(last_ms) = self.last_timestamp_ms else {
            self.initialize(obs);
            return;
        };

        let dt_secs = (obs.timestamp_ms.saturating_sub(last_ms)) as f64 / 1000.0;
        if dt_secs > 0.0 {
            self.predict(dt_secs);
        }

        let obs_var = self.config.measurement_noise_std * self.config.measurement_noise_std;
        self.update_block(obs.position, 0, obs_var);
        if let Some(velocity) = obs.velocity {
            // Sequential update: velocity noise assumed independent of the
            // position noise, so a second 3-D block update is exact.
            self.update_block(velocity, 3, obs_var);
        }

        self.clamp_dynamics();
        self.last_timestamp_ms = Some(obs.timestamp_ms);
    }

    /// Extrapolates the current filtered state `horizon_ms` ahead using the
    /// motion model only.
    ///
    /// Deterministic and side-effect-free: stored state is not mutated, so
    /// repeated calls with the same horizon return identical results.
    #[must_use]
    pub fn predict_ahead(&self, horizon_ms: f64) -> Vec3 {
        let t = horizon_ms / 1000.0;
        let mut out = [0.0; 3];
        for i in 0..3 {
            out[i] = self.x[i] + self.x[i + 3] * t + 0.5 * self.x[i + 6] * t * t;
        }
        out
    }

    /// Current position estimate [px, py, pz].
    #[must_use]
    pub fn position(&self) -> Vec3 {
        [self.x[0], self.x[1], self.x[2]]
    }

    /// Current velocity estimate [vx, vy, vz].
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        [self.x[3], self.x[4], self.x[5]]
    }

    /// Current acceleration estimate [ax, ay, az].
    #[must_use]
    pub fn acceleration(&self) -> Vec3 {
        [self.x[6], self.x[7], self.x[8]]
    }

    /// Scalar position uncertainty: trace of the top-left 3×3 of P.
    #[must_use]
    pub fn position_uncertainty(&self) -> f64 {
        self.p[0][0] + self.p[1][1] + self.p[2][2]
    }

    fn initialize(&mut self, obs: &KinematicObservation) {
        self.x = [0.0; 9];
        self.x[..3].copy_from_slice(&obs.position);
        if let Some(v) = obs.velocity {
            self.x[3..6].copy_from_slice(&v);
        }

        // P₀ = 100 · I₉: high uncertainty in every state component.
        self.p = [[0.0; 9]; 9];
        for i in 0..9 {
            self.p[i][i] = 100.0;
        }
        self.last_timestamp_ms = Some(obs.timestamp_ms);
    }

    /// Predict forward by `dt_secs` using the constant-acceleration model.
    ///
    /// State transition per axis:
    ///   p += dt·v + dt²/2·a,  v += dt·a
    ///
    /// Covariance update: P ← F·P·Fᵀ + Q with Q the discrete white-noise
    /// jerk matrix, Q = σ² · G·Gᵀ, G = [dt³/6, dt²/2, dt]ᵀ per axis.
    fn predict(&mut self, dt_secs: f64) {
        let dt = dt_secs;
        let half_dt2 = 0.5 * dt * dt;

        for i in 0..3 {
            self.x[i] += dt * self.x[i + 3] + half_dt2 * self.x[i + 6];
            self.x[i + 3] += dt * self.x[i + 6];
        }

        let mut f = mat9_identity();
        for i in 0..3 {
            f[i][i + 3] = dt;
            f[i][i + 6] = half_dt2;
            f[i + 3][i + 6] = dt;
        }

        let ft = mat9_transpose(&f);
        let fp = mat9_mul(&f, &self.p);
        let fpft = mat9_mul(&fp, &ft);

        let q = build_process_noise(dt, self.config.process_noise_std);
        self.p = mat9_add(&fpft, &q);
    }

    /// 3-D block measurement update against state components
    /// `offset..offset+3` (0 = position, 3 = velocity).
    ///
    /// Innovation:    y = z − H·x
    /// Innovation cov: S = H·P·Hᵀ + R   (3×3, R = σ² · I₃)
    /// Kalman gain:   K = P·Hᵀ · S⁻¹   (9×3)
    /// State update:  x ← x + K·y
    /// Cov update:    P ← (I₉ − K·H)·P
    fn update_block(&mut self, z: Vec3, offset: usize, noise_var: f64) {
        let hx: Vec3 = [self.x[offset], self.x[offset + 1], self.x[offset + 2]];
        let y = vec3_sub(z, hx);

        // P·Hᵀ = columns offset..offset+3 of P  (9×3)
        let mut ph_t = [[0.0f64; 3]; 9];
        for i in 0..9 {
            for j in 0..3 {
                ph_t[i][j] = self.p[i][offset + j];
            }
        }

        // S = H·P·Hᵀ + R = 3×3 block of P at (offset, offset) + R
        let mut s = [[0.0f64; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                s[i][j] = self.p[offset + i][offset + j];
            }
            s[i][i] += noise_var;
        }

        let s_inv = match mat3_inv(&s) {
            Some(m) => m,
            // Singular innovation covariance: skip this update.
            None => return,
        };

        // K = P·Hᵀ · S⁻¹  (9×3)
        let mut k = [[0.0f64; 3]; 9];
        for i in 0..9 {
            for j in 0..3 {
                for l in 0..3 {
                    k[i][j] += ph_t[i][l] * s_inv[l][j];
                }
            }
        }

        for i in 0..9 {
            for j in 0..3 {
                self.x[i] += k[i][j] * y[j];
            }
        }

        // P ← (I₉ − K·H)·P; since H selects columns offset..offset+3,
        // (K·H)ᵢⱼ = K[i][j−offset] for j in that band, else 0.
        let mut kh = [[0.0f64; 9]; 9];
        for i in 0..9 {
            for j in 0..3 {
                kh[i][offset + j] = k[i][j];
            }
        }
        let i_minus_kh = mat9_sub(&mat9_identity(), &kh);
        self.p = mat9_mul(&i_minus_kh, &self.p);
    }

    /// Clamp velocity and acceleration components to the configured
    /// physical bounds.
    fn clamp_dynamics(&mut self) {
        let vmax = self.config.max_velocity;
        let amax = self.config.max_acceleration;
        for i in 3..6 {
            self.x[i] = self.x[i].clamp(-vmax, vmax);
        }
        for i in 6..9 {
            self.x[i] = self.x[i].clamp(-amax, amax);
        }
    }
}

// ---------------------------------------------------------------------------
// Private math helpers
// ---------------------------------------------------------------------------

/// 9×9 matrix multiply: C = A · B.
fn mat9_mul(a: &Mat9, b: &Mat9) -> Mat9 {
    let mut c = [[0.0f64; 9]; 9];
    for i in 0..9 {
        for k in 0..9 {
            let aik = a[i][k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..9 {
                c[i][j] += aik * b[k][j];
            }
        }
    }
    c
}

/// 9×9 matrix element-wise add.
fn mat9_add(a: &Mat9, b: &Mat9) -> Mat9 {
    let mut c = [[0.0f64; 9]; 9];
    for i in 0..9 {
        for j in 0..9 {
            c[i][j] = a[i][j] + b[i][j];
        }
    }
    c
}

/// 9×9 matrix element-wise subtract: A − B.
fn mat9_sub(a: &Mat9, b: &Mat9) -> Mat9 {
    let mut c = [[0.0f64; 9]; 9];
    for i in 0..9 {
        for j in 0..9 {
            c[i][j] = a[i][j] - b[i][j];
        }
    }
    c
}

/// 9×9 identity matrix.
fn mat9_identity() -> Mat9 {
    let mut m = [[0.0f64; 9]; 9];
    for i in 0..9 {
        m[i][i] = 1.0;
    }
    m
}

/// Transpose of a 9×9 matrix.
fn mat9_transpose(a: &Mat9) -> Mat9 {
    let mut t = [[0.0f64; 9]; 9];
    for i in 0..9 {
        for j in 0..9 {
            t[j][i] = a[i][j];
        }
    }
    t
}

/// Analytical inverse of a 3×3 matrix via cofactor expansion.
///
/// Returns `None` if |det| < 1e-12 (singular or near-singular).
fn mat3_inv(m: &Mat3) -> Option<Mat3> {
    let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
    let c01 = -(m[1][0] * m[2][2] - m[1][2] * m[2][0]);
    let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];

    let c10 = -(m[0][1] * m[2][2] - m[0][2] * m[2][1]);
    let c11 = m[0][0] * m[2][2] - m[0][2] * m[2][0];
    let c12 = -(m[0][0] * m[2][1] - m[0][1] * m[2][0]);

    let c20 = m[0][1] * m[1][2] - m[0][2] * m[1][1];
    let c21 = -(m[0][0] * m[1][2] - m[0][2] * m[1][0]);
    let c22 = m[0][0] * m[1][1] - m[0][1] * m[1][0];

    let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;

    Some([
        [c00 * inv_det, c10 * inv_det, c20 * inv_det],
        [c01 * inv_det, c11 * inv_det, c21 * inv_det],
        [c02 * inv_det, c12 * inv_det, c22 * inv_det],
    ])
}

/// Element-wise subtract of two 3-vectors.
fn vec3_sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Discrete-time process-noise matrix for white-noise jerk.
///
/// Per axis, Q = σ² · G·Gᵀ with G = [dt³/6, dt²/2, dt]ᵀ.
fn build_process_noise(dt: f64, sigma: f64) -> Mat9 {
    let var = sigma * sigma;
    let g = [dt * dt * dt / 6.0, dt * dt / 2.0, dt];

    let mut q = [[0.0f64; 9]; 9];
    for axis in 0..3 {
        for a in 0..3 {
            for b in 0..3 {
                q[axis + 3 * a][axis + 3 * b] = var * g[a] * g[b];
            }
        }
    }
    q
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
