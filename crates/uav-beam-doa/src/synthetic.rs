//! Deterministic synthetic snapshot generation for tests and calibration.

use std::f64::consts::PI;

use ndarray::Array2;
use num_complex::Complex64;
use uav_beam_core::ArraySnapshot;

use crate::steering::steering_vector;

/// Generates a deterministic snapshot with point sources at the given
/// `(azimuth_deg, elevation_deg)` directions plus complex white noise.
///
/// Determinism matters here: the same seed always produces the same
/// snapshot, so estimator tests have stable tolerances.
#[must_use]
pub fn synthetic_snapshot(
    elements_h: usize,
    elements_v: usize,
    spacing_wavelengths: f64,
    sources: &[(f64, f64)],
    snr_db: f64,
    num_snapshots: usize,
    seed: u64,
) -> ArraySnapshot {
    let n = elements_h * elements_v;
    let amp = 10.0_f64.powf(snr_db / 20.0);

    let mut rng = Lcg::new(seed);

    let steering: Vec<_> = sources
        .iter()
        .map(|&(az, el)| steering_vector(elements_h, elements_v, spacing_wavelengths, az, el))
        .collect();

    let mut samples = Array2::<Complex64>::zeros((num_snapshots, n));
    for t in 0..num_snapshots {
        // Each source carries a distinct random phase per snapshot so the
        // signal covariance has full rank over the source set.
        for sv in &steering {
            let phase = 2.0 * PI * rng.uniform();
            let s = Complex64::from_polar(amp, phase);
            for i in 0..n {
                samples[[t, i]] += s * sv[i];
            }
        }
        for i in 0..n {
            let noise = Complex64::new(
                rng.normal() * (0.5f64).sqrt(),
                rng.normal() * (0.5f64).sqrt(),
            );
            samples[[t, i]] += noise;
        }
    }

    ArraySnapshot::new(samples, elements_h, elements_v)
        .expect("synthetic snapshot dimensions are valid by construction")
}

/// Minimal LCG with Box-Muller, kept local so snapshot generation needs no
/// RNG dependency and stays bit-reproducible across platforms.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407),
        }
    }

    fn uniform(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 11) as f64 / (1u64 << 53) as f64
    }

    fn normal(&mut self) -> f64 {
        let u1 = self.uniform().max(1e-15);
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}
