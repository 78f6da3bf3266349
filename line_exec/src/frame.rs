//! # Frame field
//!
//! Computes a unit tangent and a unit normal at every point of a closed path.
//!
//! The normal is the tangent rotated a quarter turn anticlockwise, i.e. it points to the left of
//! the direction of travel, so a positive lateral offset along it is a move to the left. A
//! continuity pass then guarantees neighbouring normals never point in opposite directions.
//!
//! Known limitation: the continuity pass walks the loop once from the first point, so on a loop
//! whose normals would need an odd number of flips it leaves a single discontinuity at the wrap
//! seam. This is reported in [`FrameField::seam`] rather than guessed away.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{track::ClosedPath, EPSILON};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The frame at a single point of the path.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct FrameSample {
    /// Unit vector in the direction of travel
    pub tangent: Vector2<f64>,

    /// Unit vector perpendicular to the tangent
    pub normal: Vector2<f64>,

    /// +1 if `normal` is the left hand normal of the tangent, -1 if the continuity pass had to
    /// flip it.
    pub orientation: f64,
}

/// Frames for every point of a closed path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameField {
    pub samples: Vec<FrameSample>,

    /// Index of the sample whose normal is discontinuous with its predecessor across the wrap
    /// seam, if any.
    pub seam: Option<usize>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FrameField {
    /// Compute the frame field of the given path.
    pub fn compute(path: &ClosedPath) -> Self {
        let n = path.len();
        let mut samples: Vec<FrameSample> = Vec::with_capacity(n);

        let mut prev_tangent = initial_tangent(path);

        for i in 0..n {
            // Central difference, wrapping at both ends
            let diff = path.point(i + 1) - path.point(i + n - 1);
            let tangent = if diff.norm() > EPSILON {
                diff.normalize()
            } else {
                prev_tangent
            };
            prev_tangent = tangent;

            samples.push(FrameSample {
                tangent,
                normal: rotate90(&tangent),
                orientation: 1.0,
            });
        }

        // Continuity pass
        let mut num_flips = 0;
        for i in 1..n {
            if samples[i].normal.dot(&samples[i - 1].normal) < 0.0 {
                samples[i].normal = -samples[i].normal;
                samples[i].orientation = -samples[i].orientation;
                num_flips += 1;
            }
        }

        let seam = if n > 1 && samples[0].normal.dot(&samples[n - 1].normal) < 0.0 {
            warn!(
                "Frame field has a normal discontinuity at the wrap seam after {} flip(s)",
                num_flips
            );
            Some(0)
        } else {
            None
        };

        debug!("Computed {} frames ({} normal flips)", n, num_flips);

        Self { samples, seam }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The left hand normal at the given index, regardless of any continuity flip.
    pub fn left(&self, index: usize) -> Vector2<f64> {
        let s = &self.samples[index % self.samples.len()];
        s.normal * s.orientation
    }

    /// Number of indices (wrap seam included) where consecutive normals point in opposite
    /// directions.
    pub fn num_discontinuities(&self) -> usize {
        let n = self.samples.len();
        (0..n)
            .filter(|&i| {
                self.samples[i]
                    .normal
                    .dot(&self.samples[(i + 1) % n].normal)
                    < 0.0
            })
            .count()
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Rotate a vector a quarter turn anticlockwise.
pub fn rotate90(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-v[1], v[0])
}

/// Z component of the cross product of two planar vectors.
pub fn cross2(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

/// Tangent used in place of a degenerate central difference at the start of the loop.
fn initial_tangent(path: &ClosedPath) -> Vector2<f64> {
    (0..path.len())
        .map(|i| path.point(i + 1) - path.point(i))
        .find(|d| d.norm() > EPSILON)
        .map(|d| d.normalize())
        .unwrap_or_else(Vector2::x)
}
