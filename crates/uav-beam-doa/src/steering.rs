//! Steering vectors for a uniform planar array.
//!
//! Element `(h, v)` sits at `(h * d, v * d)` wavelengths in the array
//! plane; its phase response toward azimuth theta and elevation phi is
//!
//! ```text
//! arg a[h, v] = 2*pi*d * (h * sin(theta) * cos(phi) + v * sin(phi))
//! ```
//!
//! Elements are flattened in `(v * elements_h + h)` order, matching
//! [`uav_beam_core::ArraySnapshot`].

use std::f64::consts::PI;

use ndarray::Array1;
use num_complex::Complex64;

/// Steering vector of an `elements_h x elements_v` planar array toward
/// `(azimuth_deg, elevation_deg)`.
#[must_use]
pub fn steering_vector(
    elements_h: usize,
    elements_v: usize,
    spacing_wavelengths: f64,
    azimuth_deg: f64,
    elevation_deg: f64,
) -> Array1<Complex64> {
    let az = azimuth_deg.to_radians();
    let el = elevation_deg.to_radians();
    let u = az.sin() * el.cos();
    let w = el.sin();

    let n = elements_h * elements_v;
    let mut a = Array1::<Complex64>::zeros(n);
    for v in 0..elements_v {
        for h in 0..elements_h {
            let phase = 2.0 * PI * spacing_wavelengths * (h as f64 * u + v as f64 * w);
            a[v * elements_h + h] = Complex64::from_polar(1.0, phase);
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadside_all_ones() {
        let a = steering_vector(4, 2, 0.5, 0.0, 0.0);
        for z in a.iter() {
            assert!((z.re - 1.0).abs() < 1e-12);
            assert!(z.im.abs() < 1e-12);
        }
    }

    #[test]
    fn test_unit_magnitude() {
        let a = steering_vector(8, 4, 0.5, 37.0, -12.0);
        assert_eq!(a.len(), 32);
        for z in a.iter() {
            assert!((z.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_linear_phase_along_rows() {
        // At elevation 0 the phase progresses linearly along h with slope
        // 2*pi*d*sin(az), independent of v.
        let a = steering_vector(4, 2, 0.5, 30.0, 0.0);
        let expected_step = 2.0 * PI * 0.5 * 30.0_f64.to_radians().sin();
        for v in 0..2 {
            for h in 1..4 {
                let prev = a[v * 4 + h - 1];
                let cur = a[v * 4 + h];
                let step = (cur * prev.conj()).arg();
                assert!(
                    (step - expected_step).abs() < 1e-9,
                    "phase step {step} != {expected_step}"
                );
            }
        }
    }
}
