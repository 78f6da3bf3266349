//! # Line optimiser module
//!
//! The racing line is described by one lateral offset per centreline point, measured along the
//! point's normal. The optimiser treats the offsets as an elastic band and relaxes it:
//!
//! - The bending term moves each point in proportion to how much more (or less) sharply the line
//!   bends there than on average over a short window around it. Bends are spread out over the
//!   available width, which lowers the peak curvature. A loop that already bends evenly, such as
//!   a circle, is left where it is.
//! - The smoothing term is a discrete Laplacian on the offsets which removes point to point
//!   jitter.
//! - In pro line mode each corner adds Gaussian pulls towards the outside of the track at entry
//!   and exit and towards the inside at the apex.
//!
//! After every iteration the offsets are clamped to the usable corridor, half the road width less
//! a margin, so the line never leaves the road at any point in the process.
//!
//! This is a local relaxation, it does not find the global minimum curvature line.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

pub use params::OptimiserParams;
pub use state::LineOptimiser;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Summary of an optimiser run
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct OptimiserReport {
    /// Number of iterations run
    pub iterations: usize,

    /// Largest offset change in the last iteration
    pub final_max_delta_m: f64,

    /// True if the run stopped early because the offsets converged
    pub converged: bool,

    /// Largest absolute offset in the final line
    pub max_offset_m: f64,

    /// Number of corner targets the line was pulled towards
    pub num_targets: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OptimError {
    #[error("The path has {path} points but the frame field has {frames}")]
    FrameMismatch { path: usize, frames: usize },

    #[error("The road width must be positive and finite, found {0} m")]
    InvalidRoadWidth(f64),

    #[error(
        "The corridor is empty: a margin of {margin_m} m leaves no room on a {road_width_m} m road"
    )]
    EmptyCorridor { road_width_m: f64, margin_m: f64 },

    #[error(
        "Bending gain ({bending}) and smoothing gain ({smoothing}) must be non-negative and sum \
        to at most 0.5"
    )]
    UnstableGains { bending: f64, smoothing: f64 },

    #[error("The corner target sigma must be positive, found {0}")]
    InvalidTargetSigma(f64),

    #[error("The offsets became non-finite on iteration {0}")]
    Diverged(usize),
}
