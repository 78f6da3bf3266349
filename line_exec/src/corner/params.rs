//! Corner segmentation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for corner segmentation.
///
/// Lengths, gaps and leads are counted in points of the resampled centreline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CornerParams {
    /// Smoothed curvature magnitude above which a corner opens.
    ///
    /// Units: 1/meters
    pub enter_threshold_m: f64,

    /// Smoothed curvature magnitude below which an open corner closes. Must be below the enter
    /// threshold.
    ///
    /// Units: 1/meters
    pub exit_threshold_m: f64,

    /// Corners with fewer points than this are discarded.
    pub min_corner_length: usize,

    /// Corners whose peak curvature magnitude is below this are discarded.
    ///
    /// Units: 1/meters
    pub min_peak_curvature_m: f64,

    /// Corners turning the same way with fewer than this many points between them are merged.
    pub merge_gap: usize,

    /// Number of points before the corner start at which the entry target is placed.
    pub entry_lead: usize,

    /// Number of points after the corner end at which the exit target is placed.
    pub exit_lead: usize,

    /// Fraction of the corner length by which the apex is shifted from the curvature peak
    /// towards the exit.
    pub late_apex_fraction: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CornerParams {
    fn default() -> Self {
        Self {
            enter_threshold_m: 0.03,
            exit_threshold_m: 0.02,
            min_corner_length: 4,
            min_peak_curvature_m: 0.035,
            merge_gap: 6,
            entry_lead: 8,
            exit_lead: 8,
            late_apex_fraction: 0.25,
        }
    }
}
