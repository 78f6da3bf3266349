//! Pursuit controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Skill parameters of each difficulty, slowest first.
pub const SKILL_TABLE: [(Difficulty, SkillParams); 3] = [
    (
        Difficulty::Novice,
        SkillParams {
            aggressiveness: 0.7,
            lookahead_gain_s: 0.6,
            steer_k_p: 1.0,
            steer_k_d: 0.06,
        },
    ),
    (
        Difficulty::Amateur,
        SkillParams {
            aggressiveness: 0.85,
            lookahead_gain_s: 0.5,
            steer_k_p: 1.2,
            steer_k_d: 0.08,
        },
    ),
    (
        Difficulty::Pro,
        SkillParams {
            aggressiveness: 1.0,
            lookahead_gain_s: 0.4,
            steer_k_p: 1.4,
            steer_k_d: 0.1,
        },
    ),
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the pursuit controller
#[derive(Deserialize, Debug, Clone)]
pub struct PursuitParams {
    /// Driver skill preset
    pub difficulty: Difficulty,

    /// Number of points behind the cursor searched for the nearest point
    pub search_behind: usize,

    /// Number of points ahead of the cursor searched for the nearest point
    pub search_ahead: usize,

    /// Lookahead distance at zero speed, grows with the skill's lookahead gain
    pub lookahead_base_m: f64,

    /// Weight of the line tangent heading error in the heading demand
    pub tangent_weight: f64,

    /// Weight of the bearing to the lookahead point in the heading demand
    pub lookahead_weight: f64,

    /// Heading correction per meter of lateral error outside the deadband
    pub lateral_gain_rad_m: f64,

    /// Lateral errors smaller than this are not corrected
    pub lateral_deadband_m: f64,

    /// Limit on the lateral correction
    pub max_lateral_correction_rad: f64,

    /// Steering angle corresponding to full steer
    pub max_steer_angle_rad: f64,

    /// Speed at which the steering gain is halved, the gain scales with
    /// `ref / (ref + speed)`. Zero disables the scaling.
    pub steer_speed_ref_ms: f64,

    /// Time constant of the low pass filter on the steering derivative term
    pub steer_d_filter_s: f64,

    /// Number of points sampled ahead for anticipatory braking
    pub brake_samples: usize,

    /// Braking horizon at zero speed
    pub brake_lookahead_base_m: f64,

    /// Braking horizon growth with speed
    pub brake_lookahead_gain_s: f64,

    /// Deceleration corresponding to full brake
    pub max_decel_ms2: f64,

    /// Brake demand per m/s above the target speed at the nearest point
    pub reactive_brake_gain: f64,

    /// Speed excesses below this are ignored
    pub speed_tolerance_ms: f64,

    /// Throttle demand per m/s below the target speed
    pub throttle_gain: f64,

    /// Fraction of the throttle removed at full steer
    pub steer_throttle_cut: f64,
}

/// Per difficulty driving parameters.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillParams {
    /// Fraction of the line's target speed the driver aims for
    pub aggressiveness: f64,

    /// Lookahead distance per m/s of speed
    pub lookahead_gain_s: f64,

    /// Steering proportional gain
    pub steer_k_p: f64,

    /// Steering derivative gain
    pub steer_k_d: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Driver difficulty presets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Novice,
    Amateur,
    Pro,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Difficulty {
    /// The skill parameters of this difficulty.
    pub fn skill(self) -> SkillParams {
        SKILL_TABLE
            .iter()
            .find(|(d, _)| *d == self)
            .map(|(_, s)| *s)
            .unwrap_or(SKILL_TABLE[0].1)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "novice" => Ok(Difficulty::Novice),
            "amateur" => Ok(Difficulty::Amateur),
            "pro" => Ok(Difficulty::Pro),
            _ => Err(format!(
                "Unknown difficulty \"{}\", expected novice, amateur or pro",
                s
            )),
        }
    }
}

impl Default for PursuitParams {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Pro,
            search_behind: 5,
            search_ahead: 30,
            lookahead_base_m: 4.0,
            tangent_weight: 0.5,
            lookahead_weight: 0.5,
            lateral_gain_rad_m: 0.1,
            lateral_deadband_m: 0.25,
            max_lateral_correction_rad: 0.3,
            max_steer_angle_rad: 0.5,
            steer_speed_ref_ms: 30.0,
            steer_d_filter_s: 0.1,
            brake_samples: 8,
            brake_lookahead_base_m: 10.0,
            brake_lookahead_gain_s: 2.0,
            max_decel_ms2: 10.0,
            reactive_brake_gain: 0.2,
            speed_tolerance_ms: 0.5,
            throttle_gain: 0.25,
            steer_throttle_cut: 0.5,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_skill_table() {
        for (d, s) in SKILL_TABLE.iter() {
            assert_eq!(d.skill(), *s);
        }

        let novice = Difficulty::Novice.skill();
        let amateur = Difficulty::Amateur.skill();
        let pro = Difficulty::Pro.skill();
        assert!(novice.aggressiveness < amateur.aggressiveness);
        assert!(amateur.aggressiveness < pro.aggressiveness);
        assert_eq!(pro.aggressiveness, 1.0);

        assert_eq!("Novice".parse::<Difficulty>(), Ok(Difficulty::Novice));
        assert_eq!("pro".parse::<Difficulty>(), Ok(Difficulty::Pro));
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_shipped_params() {
        let params: PursuitParams = util::params::load_from_path(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../params/pursuit.toml"
        ))
        .unwrap();

        assert!(params.max_steer_angle_rad > 0.0);
        assert!(params.steer_speed_ref_ms >= 0.0);
        assert!(params.steer_d_filter_s >= 0.0);
        assert!(params.brake_samples > 0);
        assert!(params.tangent_weight + params.lookahead_weight > 0.0);
    }
}
