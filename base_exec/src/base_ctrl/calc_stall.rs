//! Stall detection
//!
//! Flags casters and wheels that are commanded to move but do not, while
//! pushing hard. The flags are diagnostic only and never change the commanded
//! effort.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{state::Core, Params};
use crate::hardware::Hardware;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// First order low pass filter, `alpha` weights the previous output.
pub fn low_pass(filtered: f64, measured: f64, alpha: f64) -> f64 {
    alpha * filtered + (1.0 - alpha) * measured
}

/// A caster is stuck if it barely moves, is far from its target angle and is
/// pushing against something.
pub fn is_caster_stuck(speed_rads: f64, position_error_rad: f64, effort: f64, params: &Params) -> bool {
    speed_rads.abs() < params.caster_speed_threshold_rads
        && position_error_rad.abs() > params.caster_position_error_threshold_rad
        && effort.abs() > params.caster_effort_threshold
}

/// A wheel is stuck if its filtered speed is low while it pushes hard.
pub fn is_wheel_stuck(speed_filtered_rads: f64, effort: f64, params: &Params) -> bool {
    speed_filtered_rads.abs() < params.wheel_speed_threshold_rads
        && effort.abs() > params.wheel_effort_threshold
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Core {

    /// Update the speed bookkeeping and stuck flags of every joint.
    pub(crate) fn calc_stall<H: Hardware>(&mut self, hw: &H) {
        let alpha = self.params.alpha_stall;

        for caster in self.kin.casters.iter_mut() {
            let joint = hw.joint(caster.joint);

            caster.speed_rads = joint.velocity_rads;
            caster.speed_filtered_rads = low_pass(caster.speed_filtered_rads, joint.velocity_rads, alpha);
            caster.speed_error_rads = (joint.velocity_rads - caster.steer_velocity_desired_rads).abs();
            caster.stuck = is_caster_stuck(
                joint.velocity_rads,
                caster.steer_position_error_rad,
                joint.applied_effort,
                &self.params,
            );
        }

        for wheel in self.kin.wheels.iter_mut() {
            let joint = hw.joint(wheel.joint);

            wheel.speed_actual_rads = joint.velocity_rads;
            wheel.speed_filtered_rads = low_pass(wheel.speed_filtered_rads, joint.velocity_rads, alpha);
            wheel.speed_error_rads =
                (joint.velocity_rads - wheel.direction_multiplier * wheel.speed_cmd_rads).abs();
            wheel.stuck = is_wheel_stuck(wheel.speed_filtered_rads, joint.applied_effort, &self.params);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_ctrl::tests::test_params;

    #[test]
    fn test_low_pass() {
        assert_eq!(low_pass(1.0, 3.0, 0.5), 2.0);
        assert_eq!(low_pass(1.0, 3.0, 1.0), 1.0);
        assert_eq!(low_pass(1.0, 3.0, 0.0), 3.0);

        // Converges on a constant input
        let mut f = 0.0;
        for _ in 0..100 {
            f = low_pass(f, 2.0, 0.5);
        }
        assert!((f - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_caster_stuck_needs_all_conditions() {
        let p = test_params();
        let slow = 0.5 * p.caster_speed_threshold_rads;
        let far = 2.0 * p.caster_position_error_threshold_rad;
        let hard = 2.0 * p.caster_effort_threshold;

        assert!(is_caster_stuck(slow, far, hard, &p));
        assert!(is_caster_stuck(-slow, -far, -hard, &p));
        assert!(!is_caster_stuck(10.0 * slow, far, hard, &p));
        assert!(!is_caster_stuck(slow, 0.1 * far, hard, &p));
        assert!(!is_caster_stuck(slow, far, 0.1 * hard, &p));
    }

    #[test]
    fn test_wheel_stuck() {
        let p = test_params();
        let slow = 0.5 * p.wheel_speed_threshold_rads;
        let hard = 2.0 * p.wheel_effort_threshold;

        assert!(is_wheel_stuck(slow, -hard, &p));
        assert!(!is_wheel_stuck(4.0 * slow, hard, &p));
        assert!(!is_wheel_stuck(slow, 0.25 * hard, &p));
    }
}
