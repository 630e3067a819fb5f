//! # Trajectory controllers module
//!
//! One PID controller per axis of the odometry frame. Each acts on the
//! position error to the sampled trajectory, with the trajectory's velocity
//! fed forward.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;

// Internal
use super::{Params, TrajSample};
use crate::{loc::Pose2, pid::PidController};
use comms_if::tc::base_ctrl::BodyTwist;
use util::maths::shortest_angular_distance;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The trajectory controllers
#[derive(Debug, Serialize, Clone)]
pub struct TrajControllers {
    x_ctrl: PidController,

    y_ctrl: PidController,

    yaw_ctrl: PidController,

    /// Units: meters/second, meters/second, radians/second
    vel_limits: [f64; 3],
}

/// Tracking errors, target minus current.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct TrackingError {
    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Units: radians
    pub yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajControllers {

    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &Params) -> Self {
        Self {
            x_ctrl: PidController::new(params.x.pid),
            y_ctrl: PidController::new(params.y.pid),
            yaw_ctrl: PidController::new(params.yaw.pid),
            vel_limits: params.vel_limits(),
        }
    }

    pub fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.yaw_ctrl.reset();
    }

    /// Get the body twist that drives the base from `pose` onto `target`.
    ///
    /// The command is computed in the odometry frame, rotated into the body
    /// frame and then saturated at the velocity limits.
    pub fn get_cmd(
        &mut self,
        target: &TrajSample,
        pose: &Pose2,
        dt_s: f64,
    ) -> (BodyTwist, TrackingError) {
        let error = TrackingError {
            x_m: target.pose[0] - pose.position_m.x,
            y_m: target.pose[1] - pose.position_m.y,
            yaw_rad: shortest_angular_distance(pose.yaw_rad, target.pose[2]),
        };

        let vel_odom = Vector2::new(
            self.x_ctrl.update(error.x_m, dt_s) + target.vel[0],
            self.y_ctrl.update(error.y_m, dt_s) + target.vel[1],
        );
        let yaw_rate = self.yaw_ctrl.update(error.yaw_rad, dt_s) + target.vel[2];

        let vel_body = Rotation2::new(-pose.yaw_rad) * vel_odom;

        let lim = &self.vel_limits;
        let cmd = BodyTwist::new(
            vel_body.x.max(-lim[0]).min(lim[0]),
            vel_body.y.max(-lim[1]).min(lim[1]),
            yaw_rate.max(-lim[2]).min(lim[2]),
        );

        trace!("TrajCtrl errors {:?}, command {:?}", error, cmd);

        (cmd, error)
    }
}
