//! # Racing line module
//!
//! Assembles the pipeline stages into a finished racing line:
//!
//! 1. Resample the centreline evenly
//! 2. Compute frames and curvature of the resampled centreline
//! 3. Find the corners
//! 4. Optimise the lateral offsets
//! 5. Measure the curvature of the resulting line and derive target speeds from it
//!
//! Lines can be saved to and loaded from JSON. Target speeds in a loaded file are not trusted,
//! the curvature and speeds are derived again from the loaded positions.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

// Internal
use crate::{
    corner::{Corner, CornerError, CornerParams, CornerSegmenter},
    curvature::{CurvatureParams, CurvatureProfile},
    frame::{rotate90, FrameField},
    optim::{LineOptimiser, OptimError, OptimiserParams, OptimiserReport},
    speed::{lap_time_s, SpeedError, SpeedParams, SpeedProfileBuilder},
    track::{ClosedPath, TrackError},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for building a racing line, normally loaded from `line.toml`.
#[derive(Deserialize, Debug, Clone)]
pub struct LineParams {
    /// Target spacing of the resampled centreline
    pub spacing_m: f64,

    pub curvature: CurvatureParams,

    pub corner: CornerParams,

    pub optimiser: OptimiserParams,

    pub speed: SpeedParams,
}

/// A single point on the racing line.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacingLinePoint {
    /// Position of the point
    pub position_m: Vector2<f64>,

    /// Offset from the centreline along `normal`
    pub offset_m: f64,

    /// Unit tangent of the line in the direction of travel
    pub tangent: Vector2<f64>,

    /// Unit normal of the centreline along which the offset is measured
    pub normal: Vector2<f64>,

    /// Smoothed signed curvature of the line, 1/meters
    pub curvature_m: f64,

    /// Radius of the line at this point, floored at the minimum radius
    pub radius_m: f64,

    /// Target speed at this point
    pub target_speed_ms: f64,

    /// Distance along the line from the first point
    pub distance_m: f64,
}

/// A finished racing line around a closed track.
#[derive(Debug, Clone, Serialize)]
pub struct RacingLine {
    points: Vec<RacingLinePoint>,

    corners: Vec<Corner>,

    source: LineSource,

    report: Option<OptimiserReport>,

    lap_time_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where the positions of a line came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSource {
    /// Produced by the optimiser
    Optimised,

    /// The optimiser failed and the line follows the centreline
    CentrelineFallback,

    /// Loaded from a file
    Loaded,
}

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("Invalid track geometry: {0}")]
    TrackError(#[from] TrackError),

    #[error("The road width must be positive and finite, found {0}")]
    InvalidRoadWidth(f64),

    #[error("Invalid corner parameters: {0}")]
    CornerError(#[from] CornerError),

    #[error("Optimiser error: {0}")]
    OptimError(#[from] OptimError),

    #[error("Invalid speed parameters: {0}")]
    SpeedError(#[from] SpeedError),

    #[error("Could not access the line file: {0}")]
    FileError(std::io::Error),

    #[error("Could not (de)serialise the line: {0}")]
    JsonError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LineParams {
    fn default() -> Self {
        Self {
            spacing_m: 1.0,
            curvature: CurvatureParams::default(),
            corner: CornerParams::default(),
            optimiser: OptimiserParams::default(),
            speed: SpeedParams::default(),
        }
    }
}

impl RacingLine {
    /// Build the racing line for a centreline and road width.
    pub fn build(
        centreline: &ClosedPath,
        road_width_m: f64,
        params: &LineParams,
    ) -> Result<Self, LineError> {
        if !(road_width_m.is_finite() && road_width_m > 0.0) {
            return Err(LineError::InvalidRoadWidth(road_width_m));
        }

        let path = centreline.resample_spacing(params.spacing_m)?;
        let frames = FrameField::compute(&path);
        let corners = find_corners(&path, params)?;

        let mut optim =
            LineOptimiser::new(&path, &frames, road_width_m, params.optimiser.clone())?
                .with_corners(&corners);
        let report = optim.run()?;

        let line = Self::assemble(
            &path,
            &frames,
            optim.into_offsets(),
            corners,
            LineSource::Optimised,
            Some(report),
            params,
        )?;

        info!(
            "Built racing line: {} points, {} corner(s), estimated lap time {:.2} s",
            line.len(),
            line.corners.len(),
            line.lap_time_s
        );

        Ok(line)
    }

    /// Build the racing line, falling back to the centreline if the optimiser fails.
    ///
    /// Errors in the track itself, including an invalid road width, or in the other stage
    /// parameters are still returned. The source of the returned line tells the caller whether the fallback was used.
    pub fn build_or_fallback(
        centreline: &ClosedPath,
        road_width_m: f64,
        params: &LineParams,
    ) -> Result<Self, LineError> {
        match Self::build(centreline, road_width_m, params) {
            Err(LineError::OptimError(e)) => {
                warn!("Line optimisation failed ({}), following the centreline instead", e);
                Self::centreline(centreline, params)
            }
            result => result,
        }
    }

    /// A line which follows the centreline with zero offsets.
    pub fn centreline(centreline: &ClosedPath, params: &LineParams) -> Result<Self, LineError> {
        let path = centreline.resample_spacing(params.spacing_m)?;
        let frames = FrameField::compute(&path);
        let corners = find_corners(&path, params)?;
        let offsets_m = vec![0.0; path.len()];

        Self::assemble(
            &path,
            &frames,
            offsets_m,
            corners,
            LineSource::CentrelineFallback,
            None,
            params,
        )
    }

    /// Rebuild a line from points, deriving the tangents, curvature and speeds again from the
    /// positions.
    pub fn from_points(
        points: Vec<RacingLinePoint>,
        params: &LineParams,
    ) -> Result<Self, LineError> {
        let path = ClosedPath::new(points.iter().map(|p| p.position_m).collect())?;
        if path.len() != points.len() {
            // The explicitly repeated closing point was dropped
            debug!("Dropped the repeated closing point of the loaded line");
        }

        let corners = find_corners(&path, params)?;
        let offsets_m: Vec<f64> = points.iter().take(path.len()).map(|p| p.offset_m).collect();
        let normals: Vec<Vector2<f64>> =
            points.iter().take(path.len()).map(|p| p.normal).collect();

        Self::from_positions(&path, offsets_m, normals, corners, LineSource::Loaded, None, params)
    }

    /// Save the points of the line as a JSON array.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), LineError> {
        let file = File::create(path).map_err(LineError::FileError)?;
        serde_json::to_writer_pretty(file, &self.points).map_err(LineError::JsonError)
    }

    /// Load a line saved with `save_json`.
    pub fn load_json<P: AsRef<Path>>(path: P, params: &LineParams) -> Result<Self, LineError> {
        let file = File::open(path).map_err(LineError::FileError)?;
        let points: Vec<RacingLinePoint> =
            serde_json::from_reader(BufReader::new(file)).map_err(LineError::JsonError)?;

        let line = Self::from_points(points, params)?;
        info!("Loaded racing line with {} points", line.len());

        Ok(line)
    }

    pub fn points(&self) -> &[RacingLinePoint] {
        &self.points
    }

    /// Point at the given index, wrapping around the loop.
    pub fn point(&self, index: usize) -> &RacingLinePoint {
        &self.points[index % self.points.len()]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn corners(&self) -> &[Corner] {
        &self.corners
    }

    pub fn source(&self) -> LineSource {
        self.source
    }

    pub fn report(&self) -> Option<&OptimiserReport> {
        self.report.as_ref()
    }

    /// Estimated lap time driving at the target speeds.
    pub fn lap_time_s(&self) -> f64 {
        self.lap_time_s
    }

    /// Length of one lap of the line.
    pub fn length_m(&self) -> f64 {
        match self.points.last() {
            Some(last) => {
                last.distance_m + (self.points[0].position_m - last.position_m).norm()
            }
            None => 0.0,
        }
    }

    /// Offset the centreline and build the line points.
    fn assemble(
        centre: &ClosedPath,
        frames: &FrameField,
        offsets_m: Vec<f64>,
        corners: Vec<Corner>,
        source: LineSource,
        report: Option<OptimiserReport>,
        params: &LineParams,
    ) -> Result<Self, LineError> {
        let normals: Vec<Vector2<f64>> = frames.samples.iter().map(|s| s.normal).collect();
        let positions_m: Vec<Vector2<f64>> = centre
            .points()
            .iter()
            .zip(normals.iter())
            .zip(offsets_m.iter())
            .map(|((c, n), o)| c + n * *o)
            .collect();

        let path = ClosedPath::new(positions_m)?;
        if path.len() != centre.len() {
            // Only possible if the line collapses so that its last point meets its first
            return Err(LineError::TrackError(TrackError::TooFewPoints(path.len())));
        }

        Self::from_positions(&path, offsets_m, normals, corners, source, report, params)
    }

    /// Derive tangents, curvature, speeds and distances for the line positions.
    fn from_positions(
        path: &ClosedPath,
        offsets_m: Vec<f64>,
        normals: Vec<Vector2<f64>>,
        corners: Vec<Corner>,
        source: LineSource,
        report: Option<OptimiserReport>,
        params: &LineParams,
    ) -> Result<Self, LineError> {
        let line_frames = FrameField::compute(path);
        let curv_m = CurvatureProfile::compute(path, &params.curvature).smoothed();

        let speed_builder = SpeedProfileBuilder::new(params.speed.clone())?;
        let speeds_ms = speed_builder.build(&curv_m);

        let distances_m = path.arc_lengths();
        let segment_lengths_m: Vec<f64> = (0..path.len()).map(|i| path.segment_length(i)).collect();

        let points = (0..path.len())
            .map(|i| RacingLinePoint {
                position_m: path.points()[i],
                offset_m: offsets_m[i],
                tangent: line_frames.samples[i].tangent,
                normal: normals[i],
                curvature_m: curv_m[i],
                radius_m: speed_builder.radius_m(curv_m[i]),
                target_speed_ms: speeds_ms[i],
                distance_m: distances_m[i],
            })
            .collect();

        Ok(Self {
            points,
            corners,
            source,
            report,
            lap_time_s: lap_time_s(&segment_lengths_m, &speeds_ms),
        })
    }
}

impl RacingLinePoint {
    /// Left hand normal of the line at this point.
    pub fn left(&self) -> Vector2<f64> {
        rotate90(&self.tangent)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn find_corners(path: &ClosedPath, params: &LineParams) -> Result<Vec<Corner>, LineError> {
    let curv = CurvatureProfile::compute(path, &params.curvature);
    let segmenter = CornerSegmenter::new(params.corner.clone())?;

    Ok(segmenter.segment(&curv.smoothed()))
}
