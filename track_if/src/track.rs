//! # Track descriptions

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::Path;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A closed track loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSpec {
    /// Full width of the road, edge to edge, in meters.
    pub road_width_m: f64,

    /// The centreline of the road.
    pub centreline: CentrelineSpec,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The ways a track centreline may be described.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CentrelineSpec {
    /// An explicit polyline, in order of travel. The loop is closed implicitly from the last point
    /// back to the first, an explicit repeat of the first point is also accepted.
    Points {
        /// The `[x, y]` coordinates of each point in meters.
        points_m: Vec<[f64; 2]>,
    },

    /// A sequence of (curvature, distance) pairs that defines the loop, starting at the origin
    /// heading along +X.
    Pieces {
        /// The separation between each generated point
        separation_m: f64,

        /// The sequence of (curvature [1/m], distance [m]) pairs.
        ///
        /// Curvature follows the right hand rule about +Z, so that positive curvature is a turn
        /// to the left and negative curvature a turn to the right.
        seq: Vec<f64>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TrackSpecError {
    #[error("Cannot read the track file: {0}")]
    FileError(std::io::Error),

    #[error("Cannot parse the track file: {0}")]
    ParseError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrackSpec {
    /// Load a track from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrackSpecError> {
        let contents = std::fs::read_to_string(path).map_err(TrackSpecError::FileError)?;
        serde_json::from_str(&contents).map_err(TrackSpecError::ParseError)
    }
}
