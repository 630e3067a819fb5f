//! # Telemetry
//!
//! Diagnostic reports produced by the controllers. These are advisory only,
//! nothing in the controllers reads them back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::tc::base_ctrl::BodyTwist;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State of the base controller, published at a capped rate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseCtrlState {
    /// Hardware time at which the state was captured.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// The rate limited twist currently being executed.
    pub cmd: BodyTwist,

    /// Per-joint state, casters first then wheels.
    pub joints: Vec<JointDiag>,
}

/// Diagnostic state of a single caster or wheel joint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JointDiag {
    /// Name of the joint
    pub name: String,

    /// Measured speed.
    ///
    /// Units: radians/second
    pub speed_rads: f64,

    /// Low pass filtered speed.
    ///
    /// Units: radians/second
    pub speed_filtered_rads: f64,

    /// Absolute difference between the measured and desired speed.
    ///
    /// Units: radians/second
    pub speed_error_rads: f64,

    /// True if the stall detector flagged the joint as stuck.
    pub stuck: bool,

    /// Effort commanded to the joint on the last cycle.
    pub commanded_effort: f64,

    /// Effort the actuator reports it applied.
    pub applied_effort: f64,
}

/// Diagnostics of the trajectory controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrajCtrlDiag {
    /// Time at which the diagnostics were captured.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Human readable control state, e.g. `ACTIVE - OK`.
    pub control_state: String,

    /// X position error in the global frame.
    ///
    /// Units: meters
    pub error_x_m: f64,

    /// Y position error in the global frame.
    ///
    /// Units: meters
    pub error_y_m: f64,

    /// Yaw error.
    ///
    /// Units: radians
    pub error_yaw_rad: f64,

    /// Goal X position.
    ///
    /// Units: meters
    pub goal_x_m: f64,

    /// Goal Y position.
    ///
    /// Units: meters
    pub goal_y_m: f64,

    /// Goal yaw.
    ///
    /// Units: radians
    pub goal_yaw_rad: f64,

    /// Number of waypoints in the last received path.
    pub num_waypoints: usize,
}
