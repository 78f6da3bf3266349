//! # Corner module
//!
//! Corners are found in the smoothed curvature of the resampled centreline. A corner opens when
//! the curvature magnitude rises above an enter threshold and closes when it falls below a lower
//! exit threshold, the band between the two stops the state flickering at the boundary.
//!
//! Neighbouring corners which turn the same way and are separated by only a few points are
//! merged. Corners which turn opposite ways (an S bend) are never merged, whatever the gap: doing
//! so would put the inside target of one half on its outside.
//!
//! Each corner then gets entry, apex and exit indices which the optimiser uses as targets. The
//! apex is placed late, shifted from the curvature peak towards the exit.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod segmenter;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use params::CornerParams;
pub use segmenter::CornerSegmenter;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A corner of the track, all indices refer to the resampled centreline.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    /// First index of the corner
    pub start_index: usize,

    /// Last index of the corner (inclusive)
    pub end_index: usize,

    /// Number of points in the corner
    pub length: usize,

    /// Which way the corner turns, this is the side of the track the inside of the corner is on
    pub turn: Turn,

    /// Index of the peak smoothed curvature
    pub peak_index: usize,

    /// Smoothed signed curvature at the peak, 1/meters
    pub peak_curvature_m: f64,

    /// Index of the (late) apex
    pub apex_index: usize,

    /// Index at which the line should be on the outside before turning in
    pub entry_index: usize,

    /// Index at which the line should be back on the outside
    pub exit_index: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Direction of a turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Turn {
    /// Anticlockwise, positive curvature, the inside is on the left
    Left,

    /// Clockwise, negative curvature, the inside is on the right
    Right,
}

#[derive(Debug, thiserror::Error)]
pub enum CornerError {
    #[error("The exit threshold ({exit}) must be positive and below the enter threshold ({enter})")]
    InvalidHysteresis { enter: f64, exit: f64 },

    #[error("The late apex fraction must be in [0, 1], found {0}")]
    InvalidLateApexFraction(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Turn {
    /// The turn direction of a signed curvature. Zero counts as a left turn.
    pub fn from_curvature(curv_m: f64) -> Self {
        if curv_m < 0.0 {
            Turn::Right
        } else {
            Turn::Left
        }
    }

    /// The inside sign of the turn, +1 for left and -1 for right.
    pub fn sign(self) -> f64 {
        match self {
            Turn::Left => 1.0,
            Turn::Right => -1.0,
        }
    }
}
