//! Wheel speed calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::base_ctrl::BodyTwist;
use nalgebra::{Rotation2, Vector2};

use super::state::Core;
use crate::{hardware::Hardware, kinematics::point_velocity_2d};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Rolling speed of a wheel, before its direction multiplier is applied.
///
/// The velocity of the wheel's contact point is projected onto the caster's
/// rolling direction. The motion of the contact point caused by the caster
/// steering at `steer_rate_rads` is added so that the wheel rolls with the
/// steering instead of scrubbing.
///
/// Units: radians/second
pub fn calc_speed(
    position_m: &Vector2<f64>,
    offset_m: &Vector2<f64>,
    cmd: &BodyTwist,
    caster_angle_rad: f64,
    steer_rate_rads: f64,
    radius_m: f64,
) -> f64 {
    let contact_vel = point_velocity_2d(position_m, cmd);
    let rolling_vel = Rotation2::new(-caster_angle_rad) * contact_vel;

    let steer_vel = point_velocity_2d(offset_m, &BodyTwist::new(0.0, 0.0, steer_rate_rads));

    (rolling_vel.x + steer_vel.x) / radius_m
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Core {

    /// Compute the speed command of every wheel. Must run after the caster
    /// steering demands are computed.
    pub(crate) fn calc_wheel_speed<H: Hardware>(&mut self, hw: &H) {
        for (wheel, ctrl) in self.kin.wheels.iter_mut().zip(self.wheel_ctrls.iter_mut()) {
            let caster = &self.kin.casters[wheel.caster];

            wheel.speed_cmd_rads = calc_speed(
                &wheel.position_m,
                &wheel.offset_m,
                &self.cmd_current,
                hw.joint(caster.joint).position_rad,
                self.params.kp_wheel_steer * caster.steer_velocity_desired_rads,
                self.kin.wheel_radius_m * wheel.radius_scaler,
            );

            ctrl.set_cmd(wheel.direction_multiplier * wheel.speed_cmd_rads);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_straight_line() {
        let position = Vector2::new(0.2, 0.25);
        let offset = Vector2::new(0.0, 0.05);

        // Caster aligned with the motion
        let w = calc_speed(&position, &offset, &BodyTwist::new(0.4, 0.0, 0.0), 0.0, 0.0, 0.08);
        assert!((w - 5.0).abs() < 1e-12);

        // Caster turned sideways, driving sideways
        let w = calc_speed(&position, &offset, &BodyTwist::new(0.0, 0.4, 0.0), FRAC_PI_2, 0.0, 0.08);
        assert!((w - 5.0).abs() < 1e-9);

        // Caster facing backwards, the wheel rolls backwards
        let w = calc_speed(
            &position,
            &offset,
            &BodyTwist::new(0.4, 0.0, 0.0),
            std::f64::consts::PI,
            0.0,
            0.08,
        );
        assert!((w + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_steering_compensation() {
        // Base at rest, caster steering: the two wheels either side of the
        // pivot roll in opposite directions.
        let left = calc_speed(
            &Vector2::new(0.2, 0.25),
            &Vector2::new(0.0, 0.05),
            &BodyTwist::zero(),
            0.0,
            2.0,
            0.1,
        );
        let right = calc_speed(
            &Vector2::new(0.2, 0.15),
            &Vector2::new(0.0, -0.05),
            &BodyTwist::zero(),
            0.0,
            2.0,
            0.1,
        );

        assert!((left + 1.0).abs() < 1e-12);
        assert!((right - 1.0).abs() < 1e-12);
    }
}
