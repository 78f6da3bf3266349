//! # Track centreline
//!
//! This module defines the closed centreline of a track and its resampling into evenly spaced
//! points.
//!
//! A [`ClosedPath`] is a flat sequence of points which is logically circular: the segment from
//! the last point back to the first is implied and is never stored, so index arithmetic simply
//! wraps modulo the number of points.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::EPSILON;
use track_if::track::CentrelineSpec;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A closed loop of points.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ClosedPath {
    points_m: Vec<Vector2<f64>>,
}

/// A sequence of (curvature, distance) pieces which describes a loop.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PieceSequence {
    seq: Vec<(f64, f64)>,
    point_sep_m: f64,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("A closed path needs at least 3 points, found {0}")]
    TooFewPoints(usize),

    #[error("The path contains a non-finite coordinate at index {0}")]
    NonFinitePoint(usize),

    #[error("The path has zero total length")]
    ZeroLength,

    #[error("Cannot resample at a spacing of {0} m")]
    InvalidSpacing(f64),

    #[error("The piece sequence is invalid: {0}")]
    InvalidPieces(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ClosedPath {
    /// Create a new closed path from the points of a polyline.
    ///
    /// If the polyline is explicitly closed (the last point repeats the first) the repeated point
    /// is dropped.
    pub fn new(mut points_m: Vec<Vector2<f64>>) -> Result<Self, TrackError> {
        if let Some(i) = points_m
            .iter()
            .position(|p| !(p[0].is_finite() && p[1].is_finite()))
        {
            return Err(TrackError::NonFinitePoint(i));
        }

        let explicitly_closed = match (points_m.first(), points_m.last()) {
            (Some(first), Some(last)) => points_m.len() > 1 && (last - first).norm() <= EPSILON,
            _ => false,
        };
        if explicitly_closed {
            points_m.pop();
        }

        if points_m.len() < 3 {
            return Err(TrackError::TooFewPoints(points_m.len()));
        }

        Ok(Self { points_m })
    }

    /// Build the path described by a track centreline spec.
    pub fn from_spec(spec: &CentrelineSpec) -> Result<Self, TrackError> {
        match spec {
            CentrelineSpec::Points { points_m } => {
                Self::new(points_m.iter().map(|p| Vector2::new(p[0], p[1])).collect())
            }
            CentrelineSpec::Pieces { .. } => PieceSequence::from_spec(spec)?
                .into_path(Vector2::zeros(), 0.0),
        }
    }

    /// A regular polygon approximating a circle, traversed anticlockwise.
    pub fn circle(
        centre_m: Vector2<f64>,
        radius_m: f64,
        num_points: usize,
    ) -> Result<Self, TrackError> {
        let step = std::f64::consts::TAU / num_points as f64;
        Self::new(
            (0..num_points)
                .map(|i| {
                    let a = i as f64 * step;
                    centre_m + Vector2::new(a.cos(), a.sin()) * radius_m
                })
                .collect(),
        )
    }

    /// The points of the path.
    pub fn points(&self) -> &[Vector2<f64>] {
        &self.points_m
    }

    /// Get the number of points in the path
    pub fn len(&self) -> usize {
        self.points_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }

    /// Get the point at the given index, wrapping around the loop.
    pub fn point(&self, index: usize) -> Vector2<f64> {
        self.points_m[index % self.points_m.len()]
    }

    /// Length of the segment from the point at `index` to the next one.
    pub fn segment_length(&self, index: usize) -> f64 {
        (self.point(index + 1) - self.point(index)).norm()
    }

    /// Total length of the loop, including the closing segment.
    pub fn perimeter(&self) -> f64 {
        (0..self.len()).map(|i| self.segment_length(i)).sum()
    }

    /// Cumulative distance along the loop to each point, the first point being at zero.
    pub fn arc_lengths(&self) -> Vec<f64> {
        let mut dist_m = 0.0;
        (0..self.len())
            .map(|i| {
                let d = dist_m;
                dist_m += self.segment_length(i);
                d
            })
            .collect()
    }

    /// Resample the path into `count` points evenly spaced by arc length.
    ///
    /// The first output point is the first input point and the winding is preserved.
    pub fn resample(&self, count: usize) -> Result<Self, TrackError> {
        if count < 3 {
            return Err(TrackError::TooFewPoints(count));
        }

        let perimeter_m = self.perimeter();
        if perimeter_m <= EPSILON {
            return Err(TrackError::ZeroLength);
        }

        let spacing_m = perimeter_m / count as f64;
        let num_segs = self.len();

        let mut points_m = Vec::with_capacity(count);

        // Walk the input segments, accumulating the distance to the start of the current segment
        let mut seg = 0;
        let mut seg_start_m = 0.0;

        for k in 0..count {
            let target_m = k as f64 * spacing_m;

            loop {
                let start = self.point(seg);
                let end = self.point(seg + 1);
                let seg_len_m = (end - start).norm();

                if target_m <= seg_start_m + seg_len_m || seg + 1 >= num_segs {
                    let t = if seg_len_m > EPSILON {
                        ((target_m - seg_start_m) / seg_len_m).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    points_m.push(start + (end - start) * t);
                    break;
                }

                seg_start_m += seg_len_m;
                seg += 1;
            }
        }

        debug!(
            "Resampled {} points into {} at {:.3} m spacing (perimeter {:.2} m)",
            self.len(),
            count,
            spacing_m,
            perimeter_m
        );

        Ok(Self { points_m })
    }

    /// Resample the path with points separated by approximately `spacing_m`.
    ///
    /// The spacing is adjusted so that a whole number of points fits in the loop.
    pub fn resample_spacing(&self, spacing_m: f64) -> Result<Self, TrackError> {
        if !(spacing_m > EPSILON) {
            return Err(TrackError::InvalidSpacing(spacing_m));
        }

        let count = (self.perimeter() / spacing_m).round() as usize;
        self.resample(count.max(3))
    }
}

impl PieceSequence {
    /// Create a new sequence from (curvature [1/m], distance [m]) pairs.
    pub fn new(seq: Vec<(f64, f64)>, point_sep_m: f64) -> Result<Self, TrackError> {
        if seq.is_empty() {
            return Err(TrackError::InvalidPieces("the sequence is empty"));
        }
        if !(point_sep_m > EPSILON) {
            return Err(TrackError::InvalidPieces("the point separation must be positive"));
        }
        if seq
            .iter()
            .any(|(c, d)| !c.is_finite() || !d.is_finite() || *d < 0.0)
        {
            return Err(TrackError::InvalidPieces(
                "pieces must have finite curvature and non-negative distance",
            ));
        }

        Ok(Self { seq, point_sep_m })
    }

    pub fn from_spec(spec: &CentrelineSpec) -> Result<Self, TrackError> {
        match spec {
            CentrelineSpec::Pieces { seq, separation_m } => {
                if seq.len() % 2 != 0 {
                    Err(TrackError::InvalidPieces(
                        "expected (curvature, distance) pairs",
                    ))
                } else {
                    Self::new(seq.chunks(2).map(|p| (p[0], p[1])).collect(), *separation_m)
                }
            }
            _ => Err(TrackError::InvalidPieces("the spec is not a piece sequence")),
        }
    }

    /// Convert this sequence into a closed path starting at the given position and heading.
    pub fn into_path(
        self,
        start_m: Vector2<f64>,
        start_head_rad: f64,
    ) -> Result<ClosedPath, TrackError> {
        let mut points_m: Vec<Vector2<f64>> = Vec::new();

        let mut pos_m = start_m;
        let mut head_rad = start_head_rad;

        for (curv_m, dist_m) in self.seq {
            // Sample the piece at the point separation, the end point of the piece is the start
            // of the next one
            let num_s = (dist_m / self.point_sep_m).ceil() as usize;
            for i in 0..num_s {
                points_m.push(piece_point(pos_m, head_rad, curv_m, i as f64 * self.point_sep_m));
            }

            pos_m = piece_point(pos_m, head_rad, curv_m, dist_m);
            head_rad += curv_m * dist_m;
        }

        let closure_m = (pos_m - start_m).norm();
        if closure_m > self.point_sep_m {
            warn!(
                "Piece sequence does not close on itself, the end is {:.3} m from the start",
                closure_m
            );
        }

        // Remove points too close to their predecessor, i.e. those which fall between the end of
        // one piece and the start of the next (including the closing one)
        let min_sep_m = 0.5 * self.point_sep_m;
        let mut kept: Vec<Vector2<f64>> = Vec::with_capacity(points_m.len());
        for p in points_m {
            match kept.last() {
                Some(prev) if (p - prev).norm() < min_sep_m => (),
                _ => kept.push(p),
            }
        }
        while kept.len() > 1 {
            match (kept.first(), kept.last()) {
                (Some(first), Some(last)) if (first - last).norm() < min_sep_m => {
                    kept.pop();
                }
                _ => break,
            }
        }

        ClosedPath::new(kept)
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Position a distance `s_m` along a constant curvature piece.
fn piece_point(start_m: Vector2<f64>, head_rad: f64, curv_m: f64, s_m: f64) -> Vector2<f64> {
    // If the curvature is approximately zero we should move in a straight line, not in a curve
    // (the 1/curv_m below would blow up).
    if curv_m.abs() <= EPSILON {
        start_m + Vector2::new(head_rad.cos(), head_rad.sin()) * s_m
    } else {
        let end_head_rad = head_rad + curv_m * s_m;
        start_m
            + Vector2::new(
                (end_head_rad.sin() - head_rad.sin()) / curv_m,
                (head_rad.cos() - end_head_rad.cos()) / curv_m,
            )
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    /// A loop made of a single tight left hand corner between two straights, closed by a wide
    /// 270 degree left hand arc which stays below corner thresholds.
    pub fn single_corner_loop(sep_m: f64) -> ClosedPath {
        let r = 15.0;
        let big_r = 100.0;
        let straight = big_r - r;
        PieceSequence::new(
            vec![
                (0.0, straight),
                (1.0 / r, FRAC_PI_2 * r),
                (0.0, straight),
                (1.0 / big_r, 1.5 * PI * big_r),
            ],
            sep_m,
        )
        .unwrap()
        .into_path(Vector2::zeros(), 0.0)
        .unwrap()
    }

    /// A loop containing a left hand corner immediately followed by a right hand one (an S
    /// bend), closed by two wide 180 degree arcs.
    pub fn s_bend_loop(sep_m: f64) -> ClosedPath {
        let r = 15.0;
        let gap = 2.0;
        let a = 30.0;
        let c = 30.0;
        let big_r = 60.0;
        let big_r2 = r + 0.5 * gap + big_r;
        PieceSequence::new(
            vec![
                (0.0, a),
                (1.0 / r, FRAC_PI_2 * r),
                (0.0, gap),
                (-1.0 / r, FRAC_PI_2 * r),
                (0.0, c),
                (1.0 / big_r, PI * big_r),
                (0.0, a + 2.0 * r + c),
                (1.0 / big_r2, PI * big_r2),
            ],
            sep_m,
        )
        .unwrap()
        .into_path(Vector2::zeros(), 0.0)
        .unwrap()
    }

    #[test]
    fn test_new_path() {
        assert!(matches!(
            ClosedPath::new(vec![Vector2::zeros(), Vector2::new(1.0, 0.0)]),
            Err(TrackError::TooFewPoints(2))
        ));

        // An explicitly closed triangle is not enough, the repeated point is dropped
        assert!(matches!(
            ClosedPath::new(vec![
                Vector2::zeros(),
                Vector2::new(1.0, 0.0),
                Vector2::zeros()
            ]),
            Err(TrackError::TooFewPoints(2))
        ));

        assert!(matches!(
            ClosedPath::new(vec![
                Vector2::zeros(),
                Vector2::new(f64::NAN, 0.0),
                Vector2::new(0.0, 1.0)
            ]),
            Err(TrackError::NonFinitePoint(1))
        ));

        let square = ClosedPath::new(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
            Vector2::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(square.len(), 4);
        assert_relative_eq!(square.perimeter(), 40.0);
        assert_eq!(square.arc_lengths(), vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_zero_length_rejected() {
        let dot = ClosedPath {
            points_m: vec![Vector2::new(1.0, 1.0); 4],
        };
        assert!(matches!(dot.resample(10), Err(TrackError::ZeroLength)));
    }

    #[test]
    fn test_resample_square() {
        let square = ClosedPath::new(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
        ])
        .unwrap();

        let resampled = square.resample(8).unwrap();
        assert_eq!(resampled.len(), 8);

        // Every 5 m, anticlockwise from the origin
        let expected = [
            (0.0, 0.0),
            (5.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (10.0, 10.0),
            (5.0, 10.0),
            (0.0, 10.0),
            (0.0, 5.0),
        ];
        for (p, e) in resampled.points().iter().zip(expected.iter()) {
            assert_relative_eq!(p[0], e.0, epsilon = 1e-9);
            assert_relative_eq!(p[1], e.1, epsilon = 1e-9);
        }

        assert!(matches!(square.resample(2), Err(TrackError::TooFewPoints(2))));
        assert!(matches!(
            square.resample_spacing(0.0),
            Err(TrackError::InvalidSpacing(_))
        ));
        assert_eq!(square.resample_spacing(3.0).unwrap().len(), 13);
    }

    #[test]
    fn test_resample_closure() {
        // An irregular, unevenly sampled loop
        let raw = ClosedPath::new(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(3.0, -1.0),
            Vector2::new(40.0, 2.0),
            Vector2::new(42.0, 20.0),
            Vector2::new(41.0, 21.0),
            Vector2::new(10.0, 30.0),
            Vector2::new(-5.0, 12.0),
        ])
        .unwrap();

        let count = 157;
        let resampled = raw.resample(count).unwrap();
        let spacing_m = raw.perimeter() / count as f64;

        assert_eq!(resampled.len(), count);

        // Wrapping index arithmetic gets back to the start
        assert_eq!(resampled.point(count), resampled.point(0));

        // The implied closing segment is one spacing long, so the loop closes without a gap
        assert_relative_eq!(resampled.segment_length(count - 1), spacing_m, epsilon = 1e-6);

        // No segment is longer than the spacing (corners cut chords which can only be shorter)
        for i in 0..count {
            assert!(resampled.segment_length(i) <= spacing_m + 1e-9);
        }
    }

    #[test]
    fn test_piece_sequence() {
        // Full circle of radius 10 in two halves
        let seq = PieceSequence::new(vec![(0.1, PI * 10.0), (0.1, PI * 10.0)], 0.5).unwrap();
        let path = seq.into_path(Vector2::zeros(), 0.0).unwrap();

        // Every point is on the circle centred at (0, 10)
        for p in path.points() {
            assert_relative_eq!((p - Vector2::new(0.0, 10.0)).norm(), 10.0, epsilon = 1e-9);
        }
        assert_relative_eq!(path.perimeter(), 2.0 * PI * 10.0, max_relative = 1e-3);

        assert!(matches!(
            PieceSequence::new(vec![], 0.5),
            Err(TrackError::InvalidPieces(_))
        ));
        assert!(matches!(
            PieceSequence::new(vec![(0.0, -1.0)], 0.5),
            Err(TrackError::InvalidPieces(_))
        ));
        assert!(matches!(
            PieceSequence::from_spec(&CentrelineSpec::Pieces {
                separation_m: 1.0,
                seq: vec![0.0, 1.0, 0.1]
            }),
            Err(TrackError::InvalidPieces(_))
        ));
    }

    #[test]
    fn test_test_loops_close() {
        let path = single_corner_loop(1.0);
        assert!(path.segment_length(path.len() - 1) < 1.5);

        let path = s_bend_loop(1.0);
        assert!(path.segment_length(path.len() - 1) < 1.5);
    }
}
