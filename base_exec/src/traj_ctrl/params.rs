//! Parameters structure for TrajCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::Interpolation;
use crate::pid::{PidGains, PidGainsError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct Params {

    // ---- CONTROLLERS ----

    /// X axis of the odometry frame.
    pub x: AxisParams,

    /// Y axis of the odometry frame.
    pub y: AxisParams,

    pub yaw: AxisParams,

    // ---- TRAJECTORY ----

    /// Interpolation used between waypoints.
    pub interpolation: Interpolation,

    /// Motion stops if no path has been received for this long.
    ///
    /// Units: seconds
    pub max_update_time_s: f64,

    // ---- GOAL ----

    /// Units: meters
    pub xy_goal_tolerance_m: f64,

    /// Units: radians
    pub yaw_goal_tolerance_rad: f64,

    // ---- DIAGNOSTICS ----

    /// Minimum interval between two diagnostics reports.
    ///
    /// Units: seconds
    pub diagnostics_publish_period_s: f64,
}

/// Controller and limit of a single axis.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct AxisParams {
    /// Velocity limit of the axis, used both to time the trajectory and to
    /// saturate the output.
    ///
    /// Units: meters/second or radians/second
    pub vel_limit: f64,

    pub pid: PidGains,
}

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Invalid gains on the {0} axis: {1}")]
    InvalidGains(&'static str, PidGainsError),

    #[error("The {0} velocity limit must be finite and positive, got {1}")]
    InvalidVelLimit(&'static str, f64),

    #[error("Parameter {0} must be finite and non-negative, got {1}")]
    Negative(&'static str, f64),

    #[error("The maximum update time must be finite and positive, got {0}")]
    InvalidMaxUpdateTime(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        for &(name, axis) in [("x", &self.x), ("y", &self.y), ("yaw", &self.yaw)].iter() {
            axis.pid
                .validate()
                .map_err(|e| ParamsError::InvalidGains(name, e))?;

            if !(axis.vel_limit.is_finite() && axis.vel_limit > 0.0) {
                return Err(ParamsError::InvalidVelLimit(name, axis.vel_limit));
            }
        }

        if !(self.max_update_time_s.is_finite() && self.max_update_time_s > 0.0) {
            return Err(ParamsError::InvalidMaxUpdateTime(self.max_update_time_s));
        }

        let non_negative = [
            ("xy_goal_tolerance_m", self.xy_goal_tolerance_m),
            ("yaw_goal_tolerance_rad", self.yaw_goal_tolerance_rad),
            ("diagnostics_publish_period_s", self.diagnostics_publish_period_s),
        ];
        for &(name, value) in non_negative.iter() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParamsError::Negative(name, value));
            }
        }

        Ok(())
    }

    /// Velocity limits as an `[x, y, yaw]` array.
    pub fn vel_limits(&self) -> [f64; 3] {
        [self.x.vel_limit, self.y.vel_limit, self.yaw.vel_limit]
    }
}
