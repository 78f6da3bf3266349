//! # Vehicle exchange
//!
//! The controller is given a [`TickInput`] each simulation step and answers with a [`DriveCmd`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The vehicle state reported to the controller at each tick.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct TickInput {
    /// Position in the track frame, meters.
    pub x_m: f64,
    pub y_m: f64,

    /// Heading, the angle of the vehicle's forward axis to +X, radians.
    pub heading_rad: f64,

    /// Velocity in the track frame, meters/second.
    pub vel_x_ms: f64,
    pub vel_y_ms: f64,

    /// Time since the previous tick, seconds.
    pub dt_s: f64,
}

/// The command sent to the vehicle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveCmd {
    /// Throttle demand in [0, 1].
    pub throttle: f64,

    /// Brake demand in [0, 1].
    pub brake: f64,

    /// Steer demand in [-1, 1].
    ///
    /// Follows the right hand rule about +Z, so that positive steer turns the vehicle to the
    /// left.
    pub steer: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TickInput {
    /// Speed of the vehicle, meters/second.
    pub fn speed_ms(&self) -> f64 {
        self.vel_x_ms.hypot(self.vel_y_ms)
    }

    /// Returns true if every field is finite and time does not run backwards.
    pub fn is_valid(&self) -> bool {
        [
            self.x_m,
            self.y_m,
            self.heading_rad,
            self.vel_x_ms,
            self.vel_y_ms,
            self.dt_s,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.dt_s >= 0.0
    }
}

impl DriveCmd {
    /// A command which leaves the vehicle to coast.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// The command issued when the controller can't trust its inputs: no throttle, full brake,
    /// wheels straight.
    pub fn fail_safe() -> Self {
        Self {
            throttle: 0.0,
            brake: 1.0,
            steer: 0.0,
        }
    }
}
