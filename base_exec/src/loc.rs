//! # Localisation module
//!
//! Provides the planar pose of the base. Only simple odometry, integrating
//! the executed body twist, is provided here.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::base_ctrl::BodyTwist;
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;
use util::maths::normalize_angle;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose of the base body frame in the odometry frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Pose2 {
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Angle of the body x axis to the odometry x axis, in `(-pi, pi]`.
    ///
    /// Units: radians
    pub yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2 {
    pub fn new(x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            yaw_rad: normalize_angle(yaw_rad),
        }
    }

    /// The pose as an `[x, y, yaw]` array.
    pub fn to_array(&self) -> [f64; 3] {
        [self.position_m.x, self.position_m.y, self.yaw_rad]
    }

    /// Advance the pose by executing `twist` (in the body frame) for `dt_s`
    /// seconds.
    pub fn integrate(&mut self, twist: &BodyTwist, dt_s: f64) {
        let vel_body = Vector2::new(twist.lin_x_ms, twist.lin_y_ms);

        self.position_m += Rotation2::new(self.yaw_rad) * vel_body * dt_s;
        self.yaw_rad = normalize_angle(self.yaw_rad + twist.ang_z_rads * dt_s);
    }
}

impl Default for Pose2 {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_integrate_in_body_frame() {
        let mut pose = Pose2::new(1.0, 1.0, FRAC_PI_2);

        // Forward in the body frame is +y in the odometry frame
        pose.integrate(&BodyTwist::new(0.5, 0.0, 0.0), 2.0);
        assert!((pose.position_m.x - 1.0).abs() < 1e-12);
        assert!((pose.position_m.y - 2.0).abs() < 1e-12);

        // Yaw wraps
        pose.integrate(&BodyTwist::new(0.0, 0.0, 1.0), PI);
        assert!((pose.yaw_rad + FRAC_PI_2).abs() < 1e-12);
    }
}
