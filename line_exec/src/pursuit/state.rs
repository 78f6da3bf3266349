//! Pursuit controller state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::Vector2;

// Internal
use super::*;
use crate::{line::RacingLinePoint, EPSILON};
use track_if::vehicle::{DriveCmd, TickInput};
use util::{
    maths::{forward_distance, wrap_index, wrap_pi},
    params,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pursuit controller.
pub struct PursuitCtrl {
    params: PursuitParams,

    skill: SkillParams,

    /// The line being followed, empty if no line has been set
    line: Vec<RacingLinePoint>,

    state: ControllerState,
}

/// State carried by the controller between ticks. Reset whenever a new line is set.
#[derive(Debug, Clone)]
pub struct ControllerState {
    /// Index of the nearest line point on the previous tick
    pub cursor: Option<usize>,

    /// Steering controller, holding the previous heading error
    pub steer_ctrl: PdController,

    /// Number of times the vehicle has crossed the start of the line
    pub laps: usize,

    /// Distance driven along the line
    pub distance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PursuitCtrl {
    /// Initialise the controller from a parameter file.
    pub fn init(params_path: &str) -> Result<Self, PursuitError> {
        let params = match params::load(params_path) {
            Ok(p) => p,
            Err(e) => return Err(PursuitError::ParamLoadError(e)),
        };

        Self::new(params)
    }

    pub fn new(params: PursuitParams) -> Result<Self, PursuitError> {
        if !(params.max_steer_angle_rad > 0.0) {
            return Err(PursuitError::InvalidParams(
                "the maximum steer angle must be positive",
            ));
        }
        if !(params.max_decel_ms2 > 0.0) {
            return Err(PursuitError::InvalidParams(
                "the maximum deceleration must be positive",
            ));
        }
        if !(params.tangent_weight >= 0.0
            && params.lookahead_weight >= 0.0
            && params.tangent_weight + params.lookahead_weight > 0.0)
        {
            return Err(PursuitError::InvalidParams(
                "heading weights must be non-negative and not both zero",
            ));
        }

        if !(params.steer_speed_ref_ms >= 0.0 && params.steer_d_filter_s >= 0.0) {
            return Err(PursuitError::InvalidParams(
                "the steering speed reference and derivative filter must be non-negative",
            ));
        }

        let skill = params.difficulty.skill();

        Ok(Self {
            state: ControllerState::new(&skill, &params),
            skill,
            params,
            line: Vec::new(),
        })
    }

    /// Set the line to follow, resetting the controller state.
    pub fn set_line(&mut self, line: Vec<RacingLinePoint>) {
        info!("Following a new line of {} points", line.len());
        self.line = line;
        self.state = ControllerState::new(&self.skill, &self.params);
    }

    /// Change the driver difficulty.
    ///
    /// The cursor and lap count are kept, only the steering controller is rebuilt.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        debug!("Difficulty set to {:?}", difficulty);
        self.params.difficulty = difficulty;
        self.skill = difficulty.skill();
        self.state.steer_ctrl = steer_controller(&self.skill, &self.params);
    }

    pub fn params(&self) -> &PursuitParams {
        &self.params
    }

    pub fn skill(&self) -> &SkillParams {
        &self.skill
    }

    pub fn line(&self) -> &[RacingLinePoint] {
        &self.line
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Process one tick, returning the drive command and the status report.
    pub fn proc(&mut self, input: &TickInput) -> (DriveCmd, StatusReport) {
        tick(&self.line, &self.params, &self.skill, &mut self.state, input)
    }
}

impl ControllerState {
    pub fn new(skill: &SkillParams, params: &PursuitParams) -> Self {
        Self {
            cursor: None,
            steer_ctrl: steer_controller(skill, params),
            laps: 0,
            distance_m: 0.0,
        }
    }

    /// The heading error passed to the steering controller on the previous tick.
    pub fn prev_heading_error_rad(&self) -> Option<f64> {
        self.steer_ctrl.prev_error()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the drive command for one tick.
pub fn tick(
    line: &[RacingLinePoint],
    params: &PursuitParams,
    skill: &SkillParams,
    state: &mut ControllerState,
    input: &TickInput,
) -> (DriveCmd, StatusReport) {
    let mut report = StatusReport::default();

    if line.is_empty() {
        return (DriveCmd::neutral(), report);
    }

    if !input.is_valid() {
        warn!("Invalid tick input {:?}, issuing the fail safe command", input);
        let cmd = DriveCmd::fail_safe();
        report.fail_safe = true;
        report.brake = cmd.brake;
        return (cmd, report);
    }

    let pos_m = Vector2::new(input.x_m, input.y_m);
    let speed_ms = input.speed_ms();
    report.speed_ms = speed_ms;

    // ---- LOCALISATION ----

    let cursor = localise(line, params, state, &pos_m);
    let nearest = &line[cursor];
    report.cursor = cursor;
    report.laps = state.laps;
    report.distance_m = state.distance_m;

    // ---- STEERING ----

    report.lat_error_m = (pos_m - nearest.position_m).dot(&nearest.left());
    report.tangent_error_rad =
        wrap_pi(nearest.tangent[1].atan2(nearest.tangent[0]) - input.heading_rad);

    let lookahead_m = params.lookahead_base_m + speed_ms * skill.lookahead_gain_s;
    report.lookahead_index = walk_forward(line, cursor, lookahead_m);

    let to_target_m = line[report.lookahead_index].position_m - pos_m;
    report.lookahead_error_rad = if to_target_m.norm() > EPSILON {
        wrap_pi(to_target_m[1].atan2(to_target_m[0]) - input.heading_rad)
    } else {
        report.tangent_error_rad
    };

    let blended_rad = (params.tangent_weight * report.tangent_error_rad
        + params.lookahead_weight * report.lookahead_error_rad)
        / (params.tangent_weight + params.lookahead_weight);

    // Steer back towards the line, so the correction opposes the lateral error
    let lat_excess_m = report.lat_error_m.abs() - params.lateral_deadband_m;
    report.lat_correction_rad = if lat_excess_m > 0.0 {
        (-params.lateral_gain_rad_m * lat_excess_m * report.lat_error_m.signum()).clamp(
            -params.max_lateral_correction_rad,
            params.max_lateral_correction_rad,
        )
    } else {
        0.0
    };

    report.head_demand_rad = blended_rad + report.lat_correction_rad;

    // Yaw rate per unit steer grows with speed
    let gain_scale = if params.steer_speed_ref_ms > 0.0 {
        params.steer_speed_ref_ms / (params.steer_speed_ref_ms + speed_ms)
    } else {
        1.0
    };
    let steer_rad = state.steer_ctrl.get(report.head_demand_rad, input.dt_s) * gain_scale;
    let steer = (steer_rad / params.max_steer_angle_rad).clamp(-1.0, 1.0);

    // ---- SPEED ----

    report.target_speed_ms = target_speed_ms(nearest, skill);

    let reactive_excess_ms = speed_ms - report.target_speed_ms - params.speed_tolerance_ms;
    report.reactive_brake = if reactive_excess_ms > 0.0 {
        (reactive_excess_ms * params.reactive_brake_gain).min(1.0)
    } else {
        0.0
    };

    // Deceleration needed to shed the excess speed before reaching each sample point
    let horizon_m = params.brake_lookahead_base_m + speed_ms * params.brake_lookahead_gain_s;
    let num_samples = params.brake_samples.max(1);
    let mut anticipated_ms = report.target_speed_ms;
    let mut required_decel_ms2 = 0f64;

    for k in 1..=num_samples {
        let dist_m = horizon_m * k as f64 / num_samples as f64;
        let sample_ms = target_speed_ms(&line[walk_forward(line, cursor, dist_m)], skill);
        anticipated_ms = anticipated_ms.min(sample_ms);

        let excess_ms = speed_ms - sample_ms;
        if excess_ms > params.speed_tolerance_ms && speed_ms > EPSILON {
            let time_s = dist_m / speed_ms;
            required_decel_ms2 = required_decel_ms2.max(excess_ms / time_s.max(EPSILON));
        }
    }
    report.anticipated_speed_ms = anticipated_ms;
    report.anticipatory_brake = (required_decel_ms2 / params.max_decel_ms2).min(1.0);

    let brake = report.reactive_brake.max(report.anticipatory_brake).clamp(0.0, 1.0);

    let throttle = if brake > 0.0 {
        0.0
    } else {
        let demand = if report.target_speed_ms.is_finite() {
            ((report.target_speed_ms - speed_ms) * params.throttle_gain).clamp(0.0, 1.0)
        } else {
            1.0
        };
        demand * (1.0 - params.steer_throttle_cut * steer.abs()).max(0.0)
    };

    report.throttle = throttle;
    report.brake = brake;
    report.steer = steer;

    (
        DriveCmd {
            throttle,
            brake,
            steer,
        },
        report,
    )
}

/// Steering controller for the skill.
fn steer_controller(skill: &SkillParams, params: &PursuitParams) -> PdController {
    PdController::new(skill.steer_k_p, skill.steer_k_d).with_d_filter(params.steer_d_filter_s)
}

/// Target speed at the point scaled by the driver's aggressiveness. Non-finite targets mean no
/// limit.
fn target_speed_ms(point: &RacingLinePoint, skill: &SkillParams) -> f64 {
    if point.target_speed_ms.is_finite() {
        point.target_speed_ms * skill.aggressiveness
    } else {
        f64::INFINITY
    }
}

/// Find the nearest line point, updating the cursor, lap count and distance travelled.
fn localise(
    line: &[RacingLinePoint],
    params: &PursuitParams,
    state: &mut ControllerState,
    pos_m: &Vector2<f64>,
) -> usize {
    let n = line.len();
    let dist_sq = |i: usize| (line[i].position_m - pos_m).norm_squared();

    let nearest = match state.cursor {
        Some(c) if params.search_behind + params.search_ahead + 1 < n => {
            let mut best = c % n;
            for k in -(params.search_behind as isize)..=(params.search_ahead as isize) {
                let i = wrap_index(c, k, n);
                if dist_sq(i) < dist_sq(best) {
                    best = i;
                }
            }
            best
        }
        _ => {
            let mut best = 0;
            for i in 1..n {
                if dist_sq(i) < dist_sq(best) {
                    best = i;
                }
            }
            best
        }
    };

    if let Some(prev) = state.cursor {
        // Only forward progress counts towards distance and laps
        let fwd = forward_distance(prev, nearest, n);
        if fwd > 0 && fwd <= n / 2 {
            state.distance_m += forward_length_m(line, prev, nearest);
            if nearest < prev {
                state.laps += 1;
                info!("Lap {} completed", state.laps);
            }
        }
    }

    state.cursor = Some(nearest);
    nearest
}

/// Index of the first point at least `dist_m` further along the line than `from`.
fn walk_forward(line: &[RacingLinePoint], from: usize, dist_m: f64) -> usize {
    let n = line.len();
    let mut index = from % n;
    let mut walked_m = 0.0;

    for _ in 1..n {
        if walked_m >= dist_m {
            break;
        }
        let next = (index + 1) % n;
        walked_m += (line[next].position_m - line[index].position_m).norm();
        index = next;
    }

    index
}

/// Distance along the line from `from` forward to `to`.
fn forward_length_m(line: &[RacingLinePoint], from: usize, to: usize) -> f64 {
    if to >= from {
        line[to].distance_m - line[from].distance_m
    } else {
        let n = line.len();
        let closing_m = (line[0].position_m - line[n - 1].position_m).norm();
        line[n - 1].distance_m + closing_m - line[from].distance_m + line[to].distance_m
    }
}
