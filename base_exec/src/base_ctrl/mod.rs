//! # Base control module
//!
//! Drives the casters and wheels of a holonomic base so that it follows a
//! commanded body twist. Each cycle the newest command is taken from the
//! command slot, rate limited, converted into caster steering and wheel speed
//! demands, and tracked by one velocity controller per joint.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_caster_steer;
mod calc_stall;
mod calc_wheel_speed;
mod cmd;
mod joint_ctrl;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use calc_caster_steer::*;
pub use calc_stall::*;
pub use calc_wheel_speed::*;
pub use cmd::*;
pub use joint_ctrl::*;
pub use params::*;
pub use state::*;

use crate::kinematics::KinematicsError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while setting up or starting BaseCtrl.
#[derive(Debug, thiserror::Error)]
pub enum BaseCtrlError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Invalid base description: {0}")]
    InvalidDescription(#[from] KinematicsError),

    #[error("BaseCtrl must be initialised before it is started")]
    NotInitialised,

    #[error("Caster {0} is not calibrated")]
    CasterNotCalibrated(String),
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        hardware::{SimHardware, SimJointParams},
        kinematics::BaseDescription,
    };

    pub(crate) fn test_params() -> Params {
        util::params::parse(
            r#"
            eps = 1e-5
            timeout_s = 1.0
            max_dt_s = 0.01
            kp_caster_steer = 10.0
            kp_wheel_steer = 1.0
            cmd_vel_trans_eps_ms = 1e-5
            cmd_vel_rot_eps_rads = 1e-5
            alpha_stall = 0.5
            caster_speed_threshold_rads = 0.2
            caster_position_error_threshold_rad = 0.05
            caster_effort_threshold = 3.45
            wheel_speed_threshold_rads = 0.2
            wheel_effort_threshold = 3.45
            state_publish_period_s = 0.1

            [max_vel]
            lin_x = 0.5
            lin_y = 0.5
            ang_z = 1.0

            [max_accel]
            lin_x = 0.5
            lin_y = 0.5
            ang_z = 1.0

            [caster_pid]
            k_p = 2.0
            k_i = 10.0
            k_d = 0.0
            output_limit = 10.0

            [wheel_pid]
            k_p = 2.0
            k_i = 10.0
            k_d = 0.0
            output_limit = 10.0
            "#,
        )
        .unwrap()
    }

    pub(crate) fn test_description() -> BaseDescription {
        let mut toml = String::from("wheel_radius_m = 0.079\nwheel_radius_multiplier = 1.0\n");

        // The front left caster has its right wheel mounted backwards
        for (name, x, y, r_dir) in &[
            ("fl", 0.2225, 0.2225, -1.0),
            ("fr", 0.2225, -0.2225, 1.0),
            ("bl", -0.2225, 0.2225, 1.0),
            ("br", -0.2225, -0.2225, 1.0),
        ] {
            toml.push_str(&format!(
                r#"
                [[casters]]
                name = "{0}_caster"
                joint = "{0}_caster_rotation_joint"
                offset_m = [{1}, {2}]

                    [[casters.wheels]]
                    joint = "{0}_caster_l_wheel_joint"
                    offset_m = [0.0, 0.049]

                    [[casters.wheels]]
                    joint = "{0}_caster_r_wheel_joint"
                    offset_m = [0.0, -0.049]
                    direction_multiplier = {3:.1}
                "#,
                name, x, y, r_dir
            ));
        }

        util::params::parse(&toml).unwrap()
    }

    pub(crate) fn test_sim(desc: &BaseDescription) -> SimHardware {
        let joint = SimJointParams {
            inertia: 0.05,
            damping: 0.5,
            max_effort: 10.0,
        };
        SimHardware::for_base(desc, joint, joint)
    }

    #[test]
    fn test_params_validate() {
        assert!(test_params().validate().is_ok());

        let mut p = test_params();
        p.alpha_stall = 1.5;
        assert!(matches!(p.validate(), Err(ParamsError::InvalidAlpha(_))));

        let mut p = test_params();
        p.timeout_s = 0.0;
        assert!(matches!(p.validate(), Err(ParamsError::NotPositive("timeout_s", _))));

        let mut p = test_params();
        p.max_accel.ang_z = -1.0;
        assert!(matches!(p.validate(), Err(ParamsError::Negative("max_accel.ang_z", _))));

        let mut p = test_params();
        let mut gains = p.wheel_pid;
        gains.output_limit = 0.0;
        p.pid_overrides.insert("fl_caster_l_wheel_joint".into(), gains);
        assert!(matches!(p.validate(), Err(ParamsError::InvalidGains(j, _)) if j == "fl_caster_l_wheel_joint"));
    }

    #[test]
    fn test_missing_gains_rejected() {
        // Gains are never defaulted
        let r: Result<Params, _> = util::params::parse("eps = 1e-5");
        assert!(r.is_err());
    }

    #[test]
    fn test_gain_overrides() {
        let mut p = test_params();
        let mut gains = p.caster_pid;
        gains.k_p = 7.0;
        p.pid_overrides.insert("fl_caster_rotation_joint".into(), gains);

        assert_eq!(p.caster_gains("fl_caster_rotation_joint").k_p, 7.0);
        assert_eq!(p.caster_gains("fr_caster_rotation_joint").k_p, 2.0);
        assert_eq!(p.wheel_gains("fl_caster_l_wheel_joint").k_p, 2.0);
    }
}
