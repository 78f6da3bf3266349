//! # Curvature analysis
//!
//! Signed discrete curvature at every point of a closed path, plus a smoothed version used for
//! corner detection.
//!
//! Curvature is positive for a left (anticlockwise) turn and negative for a right (clockwise)
//! turn. Every consumer in the crate relies on this convention.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{frame::cross2, track::ClosedPath, EPSILON};
use util::maths::circular_moving_average;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the curvature analysis
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CurvatureParams {
    /// Half width, in points, of the moving average used to smooth the raw curvature.
    pub smoothing_half_window: usize,
}

/// Curvature at a single point.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct CurvatureSample {
    /// Raw signed curvature, 1/meters
    pub raw_m: f64,

    /// Smoothed signed curvature, 1/meters
    pub smoothed_m: f64,
}

/// The curvature of every point in a closed path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurvatureProfile {
    pub samples: Vec<CurvatureSample>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CurvatureParams {
    fn default() -> Self {
        Self {
            smoothing_half_window: 5,
        }
    }
}

impl CurvatureProfile {
    /// Compute the raw and smoothed curvature of the path.
    pub fn compute(path: &ClosedPath, params: &CurvatureParams) -> Self {
        let raw = raw_curvature(path);
        let smoothed = circular_moving_average(&raw, params.smoothing_half_window);

        trace!(
            "Curvature range [{:.5}, {:.5}] 1/m",
            raw.iter().cloned().fold(f64::INFINITY, f64::min),
            raw.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        );

        Self {
            samples: raw
                .into_iter()
                .zip(smoothed.into_iter())
                .map(|(raw_m, smoothed_m)| CurvatureSample { raw_m, smoothed_m })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The raw curvature values.
    pub fn raw(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.raw_m).collect()
    }

    /// The smoothed curvature values.
    pub fn smoothed(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.smoothed_m).collect()
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Raw signed curvature at each point of the path.
pub fn raw_curvature(path: &ClosedPath) -> Vec<f64> {
    let n = path.len();
    (0..n)
        .map(|i| signed_curvature(&path.point(i + n - 1), &path.point(i), &path.point(i + 1)))
        .collect()
}

/// Signed curvature at `curr`, from the turning angle between the segments into and out of it
/// divided by their mean length.
///
/// Zero length segments give zero curvature.
pub fn signed_curvature(prev: &Vector2<f64>, curr: &Vector2<f64>, next: &Vector2<f64>) -> f64 {
    let d_in = curr - prev;
    let d_out = next - curr;
    let l_in = d_in.norm();
    let l_out = d_out.norm();

    if l_in <= EPSILON || l_out <= EPSILON {
        return 0.0;
    }

    let turn_rad = cross2(&d_in, &d_out).atan2(d_in.dot(&d_out));

    turn_rad / (0.5 * (l_in + l_out))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::track::test::s_bend_loop;
    use approx::assert_relative_eq;
    use util::maths::max_adjacent_difference;

    #[test]
    fn test_signed_curvature() {
        let o = Vector2::new(0.0, 0.0);
        let a = Vector2::new(1.0, 0.0);

        // Left turn is positive, right turn negative
        assert!(signed_curvature(&o, &a, &Vector2::new(2.0, 0.5)) > 0.0);
        assert!(signed_curvature(&o, &a, &Vector2::new(2.0, -0.5)) < 0.0);
        assert_eq!(signed_curvature(&o, &a, &Vector2::new(2.0, 0.0)), 0.0);

        // Degenerate segments
        assert_eq!(signed_curvature(&o, &o, &a), 0.0);
        assert_eq!(signed_curvature(&o, &a, &a), 0.0);
    }

    #[test]
    fn test_circle_curvature() {
        let r = 40.0;
        let anticlockwise = ClosedPath::circle(Vector2::zeros(), r, 360).unwrap();
        let profile = CurvatureProfile::compute(&anticlockwise, &CurvatureParams::default());

        for s in &profile.samples {
            assert_relative_eq!(s.raw_m, 1.0 / r, max_relative = 1e-3);
            assert_relative_eq!(s.smoothed_m, 1.0 / r, max_relative = 1e-3);
        }

        // The same circle driven the other way round turns right
        let mut points = anticlockwise.points().to_vec();
        points.reverse();
        let clockwise = ClosedPath::new(points).unwrap();
        for k in raw_curvature(&clockwise) {
            assert_relative_eq!(k, -1.0 / r, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_smoothing_reduces_adjacent_difference() {
        let path = s_bend_loop(1.0);

        for half_window in &[1, 3, 5, 9] {
            let profile = CurvatureProfile::compute(
                &path,
                &CurvatureParams {
                    smoothing_half_window: *half_window,
                },
            );

            assert!(
                max_adjacent_difference(&profile.smoothed())
                    <= max_adjacent_difference(&profile.raw()) + 1e-12
            );
        }
    }
}
