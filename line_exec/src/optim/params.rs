//! Line optimiser parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the line optimiser
#[derive(Deserialize, Debug, Clone)]
pub struct OptimiserParams {
    /// Maximum number of relaxation iterations
    pub max_iterations: usize,

    /// Iteration stops early once the largest offset change in an iteration falls below this
    /// value. Set to zero to always run `max_iterations`.
    pub convergence_epsilon_m: f64,

    /// Gain on the bending term, which straightens the line
    pub bending_gain: f64,

    /// Half width of the window over which the mean bending is taken
    pub bending_half_window: usize,

    /// Gain on the offset Laplacian, which removes jitter between neighbouring offsets
    pub smoothing_gain: f64,

    /// Distance kept from the road edge
    pub margin_m: f64,

    /// If true the line is pulled towards the corner entry, apex and exit targets
    pub pro_line: bool,

    /// Peak weight of the pull towards the inside at each apex
    pub apex_weight: f64,

    /// Peak weight of the pull towards the outside at each entry and exit
    pub entry_exit_weight: f64,

    /// Standard deviation of the pull weights, in points
    pub target_sigma: f64,

    /// Neighbour averaging passes applied to the final offsets
    pub smoothing_passes: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for OptimiserParams {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            convergence_epsilon_m: 1e-5,
            bending_gain: 0.3,
            bending_half_window: 20,
            smoothing_gain: 0.05,
            margin_m: 0.5,
            pro_line: true,
            apex_weight: 0.015,
            entry_exit_weight: 0.0075,
            target_sigma: 4.0,
            smoothing_passes: 3,
        }
    }
}
