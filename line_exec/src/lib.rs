//! # Racing line library.
//!
//! Builds a racing line around a closed track loop and provides the pursuit controller which
//! drives a vehicle along it.
//!
//! The line is built once per track load by a pipeline of pure stages, each in its own module:
//!
//! 1. [`track`] - resample the centreline evenly by arc length
//! 2. [`frame`] - tangent and continuous normal at each point
//! 3. [`curvature`] - signed curvature and its smoothed version
//! 4. [`corner`] - corner detection with hysteresis and sign aware merging
//! 5. [`optim`] - the elastic band optimiser over lateral offsets
//! 6. [`speed`] - friction limited target speeds
//!
//! [`line`] assembles the stages into a [`line::RacingLine`], which [`pursuit`] then follows
//! tick by tick.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Closed centreline paths and arc length resampling
pub mod track;

/// Tangent/normal frames along a closed path
pub mod frame;

/// Signed curvature analysis
pub mod curvature;

/// Corner segmentation
pub mod corner;

/// Lateral offset optimiser
pub mod optim;

/// Target speed profile
pub mod speed;

/// The racing line and its build pipeline
pub mod line;

/// Pursuit controller - keeps the vehicle on the racing line
pub mod pursuit;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Floor used to guard divisions by lengths and curvatures which may be zero.
pub const EPSILON: f64 = 1e-9;
