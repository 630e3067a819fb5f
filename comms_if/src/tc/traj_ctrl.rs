//! # Trajectory control telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A path the base shall follow.
///
/// Each waypoint is a pose `[x, y, yaw]` in the global (odometry) frame, in
/// meters and radians. Waypoints are kept as plain vectors so that commands of
/// the wrong dimension can be detected and rejected by the controller rather
/// than by the parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathCmd {
    /// The ordered waypoints of the path.
    pub waypoints: Vec<Vec<f64>>,
}
