//! # Trajectory control module
//!
//! Trajectory control drives the base along a path of `[x, y, yaw]` waypoints
//! given in the odometry frame. On receiving a path a timed trajectory is
//! built from the current pose through every waypoint. Each cycle the
//! trajectory is sampled at the time elapsed since the path arrived and a
//! PID per axis corrects the position error, with the trajectory velocity fed
//! forward. The resulting body twist is the command for base control.
//!
//! Motion stops when the goal is reached, when a malformed path is received,
//! or when no path has been received for `max_update_time_s`, so the path
//! source must keep refreshing the path while motion is wanted.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;
pub mod trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::{AxisParams, Params, ParamsError};
pub use state::*;
pub use trajectory::*;
