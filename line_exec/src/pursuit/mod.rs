//! # Pursuit control module
//!
//! Pursuit control keeps the vehicle on the racing line and at the line's target speed. It is
//! run once per simulation tick with the latest vehicle state.
//!
//! Each tick the controller:
//!
//! 1. Localises the vehicle on the line, searching a small window around the previous nearest
//!    point (the cursor). The first tick after a line is set scans the whole line.
//! 2. Picks a lookahead point further along the line, the distance growing with speed.
//! 3. Blends the heading error to the line tangent with the bearing error to the lookahead point,
//!    and adds a correction for lateral errors outside a deadband.
//! 4. Passes the blended error through a PD controller to get the steer demand.
//! 5. Compares the speed with the target at the nearest point (reactive braking) and with the
//!    targets at several points ahead (anticipatory braking), and demands throttle only when not
//!    braking.
//!
//! Positive steer turns left. A positive lateral error means the vehicle is left of the line.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use controllers::PdController;
pub use params::{Difficulty, PursuitParams, SkillParams, SKILL_TABLE};
pub use state::{ControllerState, PursuitCtrl};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Monitoring quantities of one controller tick
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Index of the nearest line point
    pub cursor: usize,

    /// Index of the lookahead point
    pub lookahead_index: usize,

    /// Distance from the nearest line point, positive to the left of the line
    pub lat_error_m: f64,

    /// Heading of the line tangent relative to the vehicle heading
    pub tangent_error_rad: f64,

    /// Bearing of the lookahead point relative to the vehicle heading
    pub lookahead_error_rad: f64,

    /// Correction added for lateral error
    pub lat_correction_rad: f64,

    /// Error passed to the steering controller
    pub head_demand_rad: f64,

    /// Vehicle speed
    pub speed_ms: f64,

    /// Target speed at the nearest point, infinite if the line has no limit there
    pub target_speed_ms: f64,

    /// Lowest target speed among the anticipation samples
    pub anticipated_speed_ms: f64,

    /// Brake demand from the speed excess at the nearest point
    pub reactive_brake: f64,

    /// Brake demand from the anticipation samples
    pub anticipatory_brake: f64,

    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,

    /// Completed laps since the line was set
    pub laps: usize,

    /// Distance driven along the line since it was set
    pub distance_m: f64,

    /// True if the tick input was invalid and the fail safe command was issued
    pub fail_safe: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PursuitError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid pursuit parameters: {0}")]
    InvalidParams(&'static str),
}
