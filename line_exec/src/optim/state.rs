//! Line optimiser state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use nalgebra::Vector2;

// Internal
use super::{OptimError, OptimiserParams, OptimiserReport};
use crate::{corner::Corner, frame::FrameField, track::ClosedPath};
use util::maths::{circular_moving_average, cyclic_distance, wrap_index};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest stable sum of the bending and smoothing gains for the explicit update
const MAX_TOTAL_GAIN: f64 = 0.5;

/// Pulls are ignored beyond this many standard deviations from their target
const TARGET_CUTOFF_SIGMAS: f64 = 3.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Elastic band optimiser over the lateral offsets of the line.
#[derive(Debug, Clone)]
pub struct LineOptimiser {
    params: OptimiserParams,

    centre_m: Vec<Vector2<f64>>,
    normals: Vec<Vector2<f64>>,

    /// +1 where the normal points left, -1 where it was flipped
    orientation: Vec<f64>,

    /// Sign relating the normal at `i` to the normal at `i + 1`, only negative across a seam
    link_sign: Vec<f64>,

    /// Half the road width less the margin
    usable_m: f64,

    targets: Vec<CornerTarget>,

    offsets_m: Vec<f64>,

    iterations: usize,
}

/// Point the line is pulled towards in pro line mode.
#[derive(Debug, Copy, Clone)]
struct CornerTarget {
    index: usize,

    /// Target offset measured along the left normal
    left_offset_m: f64,

    weight: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineOptimiser {
    /// Create a new optimiser with all offsets at zero (on the centreline).
    pub fn new(
        path: &ClosedPath,
        frames: &FrameField,
        road_width_m: f64,
        params: OptimiserParams,
    ) -> Result<Self, OptimError> {
        if path.len() != frames.len() {
            return Err(OptimError::FrameMismatch {
                path: path.len(),
                frames: frames.len(),
            });
        }

        if !(road_width_m.is_finite() && road_width_m > 0.0) {
            return Err(OptimError::InvalidRoadWidth(road_width_m));
        }

        let usable_m = 0.5 * road_width_m - params.margin_m;
        if !(usable_m > 0.0 && params.margin_m >= 0.0) {
            return Err(OptimError::EmptyCorridor {
                road_width_m,
                margin_m: params.margin_m,
            });
        }

        let (bending, smoothing) = (params.bending_gain, params.smoothing_gain);
        if !(bending >= 0.0 && smoothing >= 0.0 && bending + smoothing <= MAX_TOTAL_GAIN) {
            return Err(OptimError::UnstableGains { bending, smoothing });
        }

        if params.pro_line && !(params.target_sigma > 0.0) {
            return Err(OptimError::InvalidTargetSigma(params.target_sigma));
        }

        let n = path.len();
        let normals: Vec<Vector2<f64>> = frames.samples.iter().map(|s| s.normal).collect();
        let link_sign = (0..n)
            .map(|i| {
                if normals[i].dot(&normals[(i + 1) % n]) < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self {
            params,
            centre_m: path.points().to_vec(),
            normals,
            orientation: frames.samples.iter().map(|s| s.orientation).collect(),
            link_sign,
            usable_m,
            targets: Vec::new(),
            offsets_m: vec![0.0; n],
            iterations: 0,
        })
    }

    /// Add the entry, apex and exit targets of the corners.
    ///
    /// Has no effect unless pro line mode is enabled in the parameters.
    pub fn with_corners(mut self, corners: &[Corner]) -> Self {
        if !self.params.pro_line {
            debug!("Pro line mode disabled, ignoring {} corner(s)", corners.len());
            return self;
        }

        for c in corners {
            let inside_m = c.turn.sign() * self.usable_m;

            self.targets.push(CornerTarget {
                index: c.entry_index,
                left_offset_m: -inside_m,
                weight: self.params.entry_exit_weight,
            });
            self.targets.push(CornerTarget {
                index: c.apex_index,
                left_offset_m: inside_m,
                weight: self.params.apex_weight,
            });
            self.targets.push(CornerTarget {
                index: c.exit_index,
                left_offset_m: -inside_m,
                weight: self.params.entry_exit_weight,
            });
        }

        self
    }

    /// Current offsets along the normals.
    pub fn offsets(&self) -> &[f64] {
        &self.offsets_m
    }

    /// Consume the optimiser returning the offsets.
    pub fn into_offsets(self) -> Vec<f64> {
        self.offsets_m
    }

    /// Largest offset magnitude allowed.
    pub fn usable_m(&self) -> f64 {
        self.usable_m
    }

    /// Number of iterations run so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Positions of the line with the current offsets.
    pub fn positions(&self) -> Vec<Vector2<f64>> {
        self.centre_m
            .iter()
            .zip(self.normals.iter())
            .zip(self.offsets_m.iter())
            .map(|((c, n), o)| c + n * *o)
            .collect()
    }

    /// Run one relaxation iteration, returning the largest offset change.
    ///
    /// The offsets are within the usable corridor after every call.
    pub fn step(&mut self) -> Result<f64, OptimError> {
        let n = self.offsets_m.len();
        let points_m = self.positions();

        // Lateral bending of the line at each point
        let bending_m: Vec<f64> = (0..n)
            .map(|i| {
                let prev = points_m[wrap_index(i, -1, n)];
                let next = points_m[(i + 1) % n];
                (prev - points_m[i] * 2.0 + next).dot(&self.normals[i])
            })
            .collect();
        let mean_bending_m = circular_moving_average(&bending_m, self.params.bending_half_window);

        let sigma = self.params.target_sigma;
        let cutoff = TARGET_CUTOFF_SIGMAS * sigma;

        let mut max_delta_m = 0f64;
        let mut new_offsets_m = Vec::with_capacity(n);

        for i in 0..n {
            let offset_m = self.offsets_m[i];
            let (prev_m, next_m) = self.neighbours(i);

            let mut delta_m = self.params.bending_gain * (bending_m[i] - mean_bending_m[i])
                + self.params.smoothing_gain * (prev_m - 2.0 * offset_m + next_m);

            for t in &self.targets {
                let dist = cyclic_distance(i, t.index, n) as f64;
                if dist > cutoff {
                    continue;
                }
                let w = t.weight * (-dist * dist / (2.0 * sigma * sigma)).exp();
                delta_m += w * (t.left_offset_m * self.orientation[i] - offset_m);
            }

            let new_offset_m = (offset_m + delta_m).clamp(-self.usable_m, self.usable_m);
            if !new_offset_m.is_finite() {
                return Err(OptimError::Diverged(self.iterations));
            }

            max_delta_m = max_delta_m.max((new_offset_m - offset_m).abs());
            new_offsets_m.push(new_offset_m);
        }

        self.offsets_m = new_offsets_m;
        self.iterations += 1;

        Ok(max_delta_m)
    }

    /// Run the optimiser to convergence or the iteration limit, then smooth the result.
    pub fn run(&mut self) -> Result<OptimiserReport, OptimError> {
        let mut report = OptimiserReport {
            num_targets: self.targets.len(),
            ..Default::default()
        };

        for _ in 0..self.params.max_iterations {
            report.final_max_delta_m = self.step()?;

            if report.final_max_delta_m < self.params.convergence_epsilon_m {
                report.converged = true;
                break;
            }
        }
        report.iterations = self.iterations;

        if report.converged {
            debug!("Optimiser converged after {} iterations", report.iterations);
        } else {
            debug!(
                "Optimiser stopped at the iteration limit ({}), last change {:.2e} m",
                report.iterations, report.final_max_delta_m
            );
        }

        for pass in 0..self.params.smoothing_passes {
            self.smooth();
            trace!("Offset smoothing pass {} done", pass);
        }

        report.max_offset_m = self.offsets_m.iter().fold(0f64, |acc, o| acc.max(o.abs()));

        info!(
            "Optimised line: {} iterations, max offset {:.2} m of {:.2} m usable",
            report.iterations, report.max_offset_m, self.usable_m
        );

        Ok(report)
    }

    /// One pass of neighbour averaging followed by the corridor clamp.
    fn smooth(&mut self) {
        let n = self.offsets_m.len();
        self.offsets_m = (0..n)
            .map(|i| {
                let (prev_m, next_m) = self.neighbours(i);
                ((prev_m + self.offsets_m[i] + next_m) / 3.0).clamp(-self.usable_m, self.usable_m)
            })
            .collect();
    }

    /// Offsets of the previous and next points expressed along the normal at `i`.
    fn neighbours(&self, i: usize) -> (f64, f64) {
        let n = self.offsets_m.len();
        let prev = wrap_index(i, -1, n);
        let next = (i + 1) % n;

        (
            self.offsets_m[prev] * self.link_sign[prev],
            self.offsets_m[next] * self.link_sign[i],
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        corner::{CornerParams, CornerSegmenter},
        curvature::{CurvatureParams, CurvatureProfile},
        track::test::single_corner_loop,
    };

    fn circle() -> (ClosedPath, FrameField) {
        let path = ClosedPath::circle(Vector2::zeros(), 50.0, 300).unwrap();
        let frames = FrameField::compute(&path);
        (path, frames)
    }

    #[test]
    fn test_invalid_setup() {
        let (path, frames) = circle();

        assert!(matches!(
            LineOptimiser::new(&path, &frames, 0.0, OptimiserParams::default()),
            Err(OptimError::InvalidRoadWidth(_))
        ));

        // A margin eating the whole road leaves no corridor
        let params = OptimiserParams {
            margin_m: 5.0,
            ..Default::default()
        };
        assert!(matches!(
            LineOptimiser::new(&path, &frames, 10.0, params),
            Err(OptimError::EmptyCorridor { .. })
        ));

        let params = OptimiserParams {
            bending_gain: 0.4,
            smoothing_gain: 0.2,
            ..Default::default()
        };
        assert!(matches!(
            LineOptimiser::new(&path, &frames, 10.0, params),
            Err(OptimError::UnstableGains { .. })
        ));

        let other = ClosedPath::circle(Vector2::zeros(), 50.0, 100).unwrap();
        assert!(matches!(
            LineOptimiser::new(&other, &frames, 10.0, OptimiserParams::default()),
            Err(OptimError::FrameMismatch { .. })
        ));
    }

    #[test]
    fn test_circle_stays_central() {
        let (path, frames) = circle();
        let mut optim = LineOptimiser::new(&path, &frames, 10.0, OptimiserParams::default())
            .unwrap()
            .with_corners(&[]);

        let report = optim.run().unwrap();

        assert!(report.converged);
        assert!(report.max_offset_m < 1e-6, "max offset {}", report.max_offset_m);
    }

    #[test]
    fn test_containment_every_iteration() {
        let path = single_corner_loop(1.0);
        let frames = FrameField::compute(&path);
        let curv = CurvatureProfile::compute(&path, &CurvatureParams::default());
        let corners = CornerSegmenter::new(CornerParams::default())
            .unwrap()
            .segment(&curv.smoothed());

        // Aggressive pulls on a narrow road so the clamp is exercised
        let params = OptimiserParams {
            bending_gain: 0.45,
            smoothing_gain: 0.05,
            apex_weight: 0.8,
            entry_exit_weight: 0.8,
            ..Default::default()
        };
        let mut optim = LineOptimiser::new(&path, &frames, 4.0, params)
            .unwrap()
            .with_corners(&corners);
        let usable_m = optim.usable_m();
        assert_eq!(usable_m, 1.5);

        let mut touched_edge = false;
        for _ in 0..300 {
            optim.step().unwrap();
            for o in optim.offsets() {
                assert!(o.abs() <= usable_m, "offset {} outside corridor", o);
                touched_edge |= (o.abs() - usable_m).abs() < 1e-12;
            }
        }
        assert!(touched_edge);

        // Every position is within the usable width of its centreline point
        for (p, c) in optim.positions().iter().zip(path.points()) {
            assert!((p - c).norm() <= usable_m + 1e-9);
        }
    }

    #[test]
    fn test_single_corner_line() {
        let path = single_corner_loop(1.0);
        let frames = FrameField::compute(&path);
        let curv = CurvatureProfile::compute(&path, &CurvatureParams::default());
        let corners = CornerSegmenter::new(CornerParams::default())
            .unwrap()
            .segment(&curv.smoothed());
        assert_eq!(corners.len(), 1);
        let corner = corners[0];

        let mut optim = LineOptimiser::new(&path, &frames, 10.0, OptimiserParams::default())
            .unwrap()
            .with_corners(&corners);
        let report = optim.run().unwrap();
        assert_eq!(report.num_targets, 3);

        // Offsets measured along the left normal
        let left = |i: usize| optim.offsets()[i] * frames.samples[i].orientation;

        // Inside (left) at the apex, outside (right) at entry and exit
        assert!(left(corner.apex_index) > 0.0, "apex {}", left(corner.apex_index));
        assert!(left(corner.entry_index) < 0.0, "entry {}", left(corner.entry_index));
        assert!(left(corner.exit_index) < 0.0, "exit {}", left(corner.exit_index));
    }
}
