//! Beam grid geometry.
//!
//! The transmit grid partitions the array's field of view uniformly into
//! `num_beams_h x num_beams_v` pointing directions. Beam `(col, row)` points
//! at the centre of its cell and is numbered `row * num_beams_h + col`.

use uav_beam_core::{BeamGridConfig, BeamId};

/// Mapping between beam indices and pointing directions.
#[derive(Debug, Clone)]
pub struct BeamGrid {
    config: BeamGridConfig,
}

impl BeamGrid {
    /// Builds the grid from its configuration.
    #[must_use]
    pub fn new(config: BeamGridConfig) -> Self {
        debug_assert!(config.num_beams_h > 0 && config.num_beams_v > 0);
        Self { config }
    }

    /// The grid configuration.
    #[must_use]
    pub fn config(&self) -> &BeamGridConfig {
        &self.config
    }

    /// Total number of beams.
    #[must_use]
    pub fn num_beams(&self) -> usize {
        self.config.num_beams()
    }

    /// Pointing direction `(azimuth_deg, elevation_deg)` of a beam, or
    /// `None` for an index outside the grid.
    #[must_use]
    pub fn direction_of(&self, beam: BeamId) -> Option<(f64, f64)> {
        let idx = beam.index() as usize;
        if idx >= self.num_beams() {
            return None;
        }
        let col = idx % self.config.num_beams_h;
        let row = idx / self.config.num_beams_h;

        let az_span = self.config.azimuth_max_deg - self.config.azimuth_min_deg;
        let el_span = self.config.elevation_max_deg - self.config.elevation_min_deg;
        let az = self.config.azimuth_min_deg
            + (col as f64 + 0.5) * az_span / self.config.num_beams_h as f64;
        let el = self.config.elevation_min_deg
            + (row as f64 + 0.5) * el_span / self.config.num_beams_v as f64;
        Some((az, el))
    }

    /// The beam whose pointing direction is angularly closest to
    /// `(azimuth_deg, elevation_deg)`, using wrap-aware azimuth comparison.
    #[must_use]
    pub fn beam_toward(&self, azimuth_deg: f64, elevation_deg: f64) -> BeamId {
        let mut best = BeamId::new(0);
        let mut best_dist = f64::MAX;
        for idx in 0..self.num_beams() {
            let beam = BeamId::new(idx as u32);
            let Some((az, el)) = self.direction_of(beam) else {
                continue;
            };
            let daz = wrap_azimuth_diff(azimuth_deg, az);
            let del = elevation_deg - el;
            let dist = daz * daz + del * del;
            if dist < best_dist {
                best_dist = dist;
                best = beam;
            }
        }
        best
    }

    /// The beam pointing toward a position, with the transmitter at the
    /// origin: azimuth from the +x boresight in the horizontal plane,
    /// elevation from that plane.
    #[must_use]
    pub fn beam_toward_position(&self, position: [f64; 3]) -> BeamId {
        let (az, el) = direction_to(position);
        self.beam_toward(az, el)
    }
}

/// Azimuth/elevation (degrees) of a position seen from the origin.
#[must_use]
pub fn direction_to(position: [f64; 3]) -> (f64, f64) {
    let [x, y, z] = position;
    let horizontal = (x * x + y * y).sqrt();
    let az = y.atan2(x).to_degrees();
    let el = z.atan2(horizontal).to_degrees();
    (az, el)
}

/// Shortest signed azimuth difference `a - b`, wrapped to (-180, 180].
#[must_use]
pub fn wrap_azimuth_diff(a: f64, b: f64) -> f64 {
    let mut d = (a - b) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> BeamGrid {
        BeamGrid::new(BeamGridConfig::default())
    }

    #[test]
    fn test_direction_round_trip() {
        let g = grid();
        for idx in 0..g.num_beams() as u32 {
            let beam = BeamId::new(idx);
            let (az, el) = g.direction_of(beam).unwrap();
            assert_eq!(g.beam_toward(az, el), beam, "round trip failed for {beam}");
        }
    }

    #[test]
    fn test_out_of_range_beam() {
        let g = grid();
        assert!(g.direction_of(BeamId::new(10_000)).is_none());
    }

    #[test]
    fn test_beam_toward_clamps_to_fov_edge() {
        let g = grid();
        // Way outside the field of view: nearest beam is on the edge.
        let beam = g.beam_toward(170.0, 0.0);
        let (az, _) = g.direction_of(beam).unwrap();
        assert!(az > 50.0, "expected an edge beam, got azimuth {az}");
    }

    #[test]
    fn test_wrap_azimuth_diff() {
        assert!((wrap_azimuth_diff(179.0, -179.0) - -2.0).abs() < 1e-9);
        assert!((wrap_azimuth_diff(-179.0, 179.0) - 2.0).abs() < 1e-9);
        assert!((wrap_azimuth_diff(10.0, 350.0) - 20.0).abs() < 1e-9);
        assert!((wrap_azimuth_diff(0.0, 0.0)).abs() < 1e-9);
    }

    #[test]
    fn test_direction_to_axes() {
        let (az, el) = direction_to([100.0, 0.0, 0.0]);
        assert!(az.abs() < 1e-9);
        assert!(el.abs() < 1e-9);

        let (az, el) = direction_to([0.0, 100.0, 0.0]);
        assert!((az - 90.0).abs() < 1e-9);
        assert!(el.abs() < 1e-9);

        let (_, el) = direction_to([100.0, 0.0, 100.0]);
        assert!((el - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_beam_toward_position() {
        let g = grid();
        // A position on boresight maps to a beam near azimuth 0.
        let beam = g.beam_toward_position([500.0, 0.0, 0.0]);
        let (az, el) = g.direction_of(beam).unwrap();
        assert!(az.abs() < 8.0, "azimuth {az} too far from boresight");
        assert!(el.abs() < 8.0, "elevation {el} too far from boresight");
    }
}
