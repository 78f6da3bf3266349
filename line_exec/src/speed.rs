//! # Speed profile module
//!
//! Target speeds are derived from the curvature of the finished line. At each point the speed is
//! the one at which the lateral acceleration around the local radius equals the friction limit,
//! `v = sqrt(mu g r)`, bounded by a floor and a ceiling. The profile is then smoothed so that
//! targets do not step between neighbouring points.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Deserialize;

// Internal
use crate::EPSILON;
use util::maths::circular_moving_average;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the speed profile
#[derive(Deserialize, Debug, Clone)]
pub struct SpeedParams {
    /// Tyre friction coefficient
    pub friction_coeff: f64,

    /// Gravitational acceleration
    pub gravity_ms2: f64,

    /// Smallest radius used, tighter turns are treated as this radius
    pub min_radius_m: f64,

    /// Lowest target speed
    pub speed_floor_ms: f64,

    /// Highest target speed
    pub speed_ceiling_ms: f64,

    /// Number of moving average passes over the profile
    pub smoothing_passes: usize,

    /// Half width of each moving average pass
    pub smoothing_half_window: usize,
}

/// Builds friction limited target speeds from curvature.
#[derive(Debug, Clone)]
pub struct SpeedProfileBuilder {
    params: SpeedParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SpeedError {
    #[error("Friction coefficient ({friction}) and gravity ({gravity}) must be positive")]
    InvalidGrip { friction: f64, gravity: f64 },

    #[error("The minimum radius must be positive, found {0} m")]
    InvalidMinRadius(f64),

    #[error("Speed floor ({floor} m/s) must be non-negative and not above the ceiling ({ceiling} m/s)")]
    InvalidSpeedLimits { floor: f64, ceiling: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SpeedParams {
    fn default() -> Self {
        Self {
            friction_coeff: 1.0,
            gravity_ms2: 9.81,
            min_radius_m: 5.0,
            speed_floor_ms: 5.0,
            speed_ceiling_ms: 60.0,
            smoothing_passes: 8,
            smoothing_half_window: 5,
        }
    }
}

impl SpeedProfileBuilder {
    pub fn new(params: SpeedParams) -> Result<Self, SpeedError> {
        if !(params.friction_coeff > 0.0 && params.gravity_ms2 > 0.0) {
            return Err(SpeedError::InvalidGrip {
                friction: params.friction_coeff,
                gravity: params.gravity_ms2,
            });
        }

        if !(params.min_radius_m > 0.0) {
            return Err(SpeedError::InvalidMinRadius(params.min_radius_m));
        }

        if !(params.speed_floor_ms >= 0.0 && params.speed_floor_ms <= params.speed_ceiling_ms) {
            return Err(SpeedError::InvalidSpeedLimits {
                floor: params.speed_floor_ms,
                ceiling: params.speed_ceiling_ms,
            });
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &SpeedParams {
        &self.params
    }

    /// Radius of the turn with the given curvature, never below the minimum radius.
    ///
    /// Non-finite curvature is treated as a straight.
    pub fn radius_m(&self, curv_m: f64) -> f64 {
        let curv_m = if curv_m.is_finite() { curv_m.abs() } else { 0.0 };
        (1.0 / curv_m.max(EPSILON)).max(self.params.min_radius_m)
    }

    /// Unsmoothed target speed for the given curvature.
    pub fn target_speed_ms(&self, curv_m: f64) -> f64 {
        let grip_ms2 = self.params.friction_coeff * self.params.gravity_ms2;
        (grip_ms2 * self.radius_m(curv_m))
            .sqrt()
            .clamp(self.params.speed_floor_ms, self.params.speed_ceiling_ms)
    }

    /// Build the smoothed target speed profile for a loop of curvature values.
    pub fn build(&self, curv_m: &[f64]) -> Vec<f64> {
        let mut speeds_ms: Vec<f64> = curv_m.iter().map(|&c| self.target_speed_ms(c)).collect();

        for _ in 0..self.params.smoothing_passes {
            speeds_ms = circular_moving_average(&speeds_ms, self.params.smoothing_half_window);
        }

        // Averages of bounded values are bounded, this only removes rounding
        for v in speeds_ms.iter_mut() {
            *v = v.clamp(self.params.speed_floor_ms, self.params.speed_ceiling_ms);
        }

        debug!(
            "Speed profile range [{:.2}, {:.2}] m/s",
            speeds_ms.iter().cloned().fold(f64::INFINITY, f64::min),
            speeds_ms.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        );

        speeds_ms
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Estimated time to complete one lap.
///
/// `segment_lengths_m[i]` is the distance from point `i` to point `i + 1` (wrapping). Each segment
/// is driven at the mean of its end point speeds.
pub fn lap_time_s(segment_lengths_m: &[f64], speeds_ms: &[f64]) -> f64 {
    let n = speeds_ms.len().min(segment_lengths_m.len());

    (0..n)
        .map(|i| {
            let mean_ms = 0.5 * (speeds_ms[i] + speeds_ms[(i + 1) % n]);
            segment_lengths_m[i] / mean_ms.max(EPSILON)
        })
        .sum()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invalid_params() {
        let params = SpeedParams {
            speed_floor_ms: 10.0,
            speed_ceiling_ms: 5.0,
            ..Default::default()
        };
        assert!(matches!(
            SpeedProfileBuilder::new(params),
            Err(SpeedError::InvalidSpeedLimits { .. })
        ));

        let params = SpeedParams {
            friction_coeff: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            SpeedProfileBuilder::new(params),
            Err(SpeedError::InvalidGrip { .. })
        ));
    }

    #[test]
    fn test_floor_and_ceiling() {
        let builder = SpeedProfileBuilder::new(SpeedParams::default()).unwrap();

        // Straight, hairpin, and a mixture of both
        let curv_m: Vec<f64> = (0..200)
            .map(|i| match i % 40 {
                0..=9 => 0.0,
                10..=19 => 2.0,
                20..=29 => -0.5,
                _ => 0.01,
            })
            .collect();

        for v in builder.build(&curv_m) {
            assert!(v >= 5.0 && v <= 60.0, "speed {} out of range", v);
        }

        assert_eq!(builder.target_speed_ms(0.0), 60.0);
        assert_eq!(builder.target_speed_ms(10.0), 5.0f64.max((9.81f64 * 5.0).sqrt()));
        assert_eq!(builder.target_speed_ms(f64::NAN), 60.0);
        assert_eq!(builder.target_speed_ms(f64::INFINITY), 60.0);
    }

    #[test]
    fn test_constant_radius() {
        let builder = SpeedProfileBuilder::new(SpeedParams {
            friction_coeff: 0.9,
            ..Default::default()
        })
        .unwrap();

        let radius_m = 50.0;
        let speeds_ms = builder.build(&vec![1.0 / radius_m; 120]);

        let expected_ms = (0.9 * 9.81 * radius_m).sqrt();
        for v in speeds_ms {
            assert_relative_eq!(v, expected_ms, epsilon = 1e-9);
        }

        assert_relative_eq!(builder.radius_m(-1.0 / radius_m), radius_m, epsilon = 1e-9);
        assert_eq!(builder.radius_m(1.0), 5.0);
    }

    #[test]
    fn test_lap_time() {
        // 100 m at a constant 10 m/s
        assert_relative_eq!(lap_time_s(&[25.0; 4], &[10.0; 4]), 10.0, epsilon = 1e-12);

        // Each segment driven at the mean of its end speeds
        assert_relative_eq!(
            lap_time_s(&[10.0, 10.0], &[10.0, 30.0]),
            1.0,
            epsilon = 1e-12
        );
    }
}
