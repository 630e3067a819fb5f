//! Caster steering calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use comms_if::tc::base_ctrl::BodyTwist;
use nalgebra::Vector2;
use util::maths::{normalize_angle, shortest_angular_distance};

use super::{state::Core, Params};
use crate::{hardware::Hardware, kinematics::point_velocity_2d};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering demand for a single caster.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CasterSteer {
    /// The angle the caster is driven to, either the heading of the pivot's
    /// velocity or its alias half a turn away.
    ///
    /// Units: radians
    pub angle_rad: f64,

    /// The angle to remember for when the base is commanded to stand still.
    ///
    /// Units: radians
    pub stored_angle_rad: f64,

    /// Units: radians
    pub error_rad: f64,

    /// Units: radians/second
    pub velocity_rads: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the steering demand for a caster at `offset_m`.
///
/// While the command is below both epsilons (strictly) the stored angle is
/// held, otherwise the caster follows the heading of its pivot's velocity.
/// A caster is symmetric under a half turn, so whichever of the heading and
/// its alias is closer to the measured angle is chosen. On a tie the heading
/// itself is kept.
pub fn calc_steer(
    offset_m: &Vector2<f64>,
    cmd: &BodyTwist,
    measured_angle_rad: f64,
    stored_angle_rad: f64,
    params: &Params,
) -> CasterSteer {
    let standing_still = cmd.lin_speed_ms() < params.cmd_vel_trans_eps_ms
        && cmd.ang_z_rads.abs() < params.cmd_vel_rot_eps_rads;

    let heading_rad = if standing_still {
        stored_angle_rad
    }
    else {
        let v = point_velocity_2d(offset_m, cmd);
        v.y.atan2(v.x)
    };

    let error_rad = shortest_angular_distance(heading_rad, measured_angle_rad);

    let alias_rad = normalize_angle(heading_rad + PI);
    let alias_error_rad = shortest_angular_distance(alias_rad, measured_angle_rad);

    let (angle_rad, error_rad) = if alias_error_rad.abs() < error_rad.abs() {
        (alias_rad, alias_error_rad)
    }
    else {
        (heading_rad, error_rad)
    };

    CasterSteer {
        angle_rad,
        stored_angle_rad: heading_rad,
        error_rad,
        velocity_rads: -params.kp_caster_steer * error_rad,
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Core {

    /// Compute the steering demand of every caster from the current command.
    pub(crate) fn calc_caster_steer<H: Hardware>(&mut self, hw: &H) {
        for (caster, ctrl) in self.kin.casters.iter_mut().zip(self.caster_ctrls.iter_mut()) {
            let steer = calc_steer(
                &caster.offset_m,
                &self.cmd_current,
                hw.joint(caster.joint).position_rad,
                caster.steer_angle_stored_rad,
                &self.params,
            );

            caster.steer_angle_desired_rad = steer.angle_rad;
            caster.steer_angle_stored_rad = steer.stored_angle_rad;
            caster.steer_position_error_rad = steer.error_rad;
            caster.steer_velocity_desired_rads = steer.velocity_rads;

            ctrl.set_cmd(steer.velocity_rads);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
