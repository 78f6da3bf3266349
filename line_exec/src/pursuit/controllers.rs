//! # Pursuit controllers module
//!
//! The steering controller used by the pursuit controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PD controller stepped with an explicit time delta, with a first order low pass filter on
/// the derivative.
#[derive(Debug, Serialize, Clone)]
pub struct PdController {
    /// Proportional gain
    k_p: f64,

    /// Derivative gain
    k_d: f64,

    /// Time constant of the derivative filter, zero for no filtering
    d_filter_s: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// Filtered error derivative
    filtered_deriv: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PdController {
    /// Create a new controller with the given gains and no derivative filtering.
    pub fn new(k_p: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_d,
            d_filter_s: 0.0,
            prev_error: None,
            filtered_deriv: 0.0,
        }
    }

    /// Low pass filter the derivative with the given time constant. Non-positive values disable
    /// the filter.
    pub fn with_d_filter(mut self, d_filter_s: f64) -> Self {
        self.d_filter_s = d_filter_s.max(0.0);
        self
    }

    /// Get the value of the controller for the given error, `dt_s` after the previous call.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        // With no previous error or no elapsed time there is no usable derivative. Differencing
        // against zero would give a large spike on the first tick, so the term is left out.
        let deriv = match self.prev_error {
            Some(e) if dt_s > 0.0 => {
                let raw = (error - e) / dt_s;
                self.filtered_deriv += dt_s / (self.d_filter_s + dt_s) * (raw - self.filtered_deriv);
                self.filtered_deriv
            }
            _ => 0.0,
        };

        self.prev_error = Some(error);

        self.k_p * error + self.k_d * deriv
    }

    /// The error passed in on the previous call.
    pub fn prev_error(&self) -> Option<f64> {
        self.prev_error
    }

    /// Forget the previous error and the filtered derivative.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.filtered_deriv = 0.0;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pd() {
        let mut pd = PdController::new(2.0, 0.5);

        // No derivative on the first call
        assert_relative_eq!(pd.get(0.1, 0.1), 0.2);
        assert_eq!(pd.prev_error(), Some(0.1));

        // (0.3 - 0.1) / 0.1 = 2
        assert_relative_eq!(pd.get(0.3, 0.1), 0.6 + 1.0, epsilon = 1e-12);

        // No derivative without elapsed time
        assert_relative_eq!(pd.get(0.2, 0.0), 0.4);

        pd.reset();
        assert_eq!(pd.prev_error(), None);
        assert_relative_eq!(pd.get(-0.1, 0.1), -0.2);
    }

    #[test]
    fn test_pd_derivative_filter() {
        let mut pd = PdController::new(0.0, 1.0).with_d_filter(0.1);

        // A step in the error only lets a fraction dt / (tc + dt) of the raw derivative through
        pd.get(0.0, 0.1);
        assert_relative_eq!(pd.get(1.0, 0.1), 0.5 * 10.0, epsilon = 1e-12);

        // and then decays rather than vanishing at once
        assert_relative_eq!(pd.get(1.0, 0.1), 0.25 * 10.0, epsilon = 1e-12);

        // An error flipping sign every tick is attenuated
        let mut unfiltered = PdController::new(0.0, 1.0);
        let mut filtered = PdController::new(0.0, 1.0).with_d_filter(0.1);
        let mut peak = (0f64, 0f64);
        for k in 0..20 {
            let error = if k % 2 == 0 { 0.1 } else { -0.1 };
            peak.0 = peak.0.max(unfiltered.get(error, 0.05).abs());
            peak.1 = peak.1.max(filtered.get(error, 0.05).abs());
        }
        assert!(peak.1 < 0.5 * peak.0, "filtered {} unfiltered {}", peak.1, peak.0);

        pd.reset();
        pd.get(1.0, 0.1);
        assert_relative_eq!(pd.get(1.0, 0.1), 0.0);
    }
}
