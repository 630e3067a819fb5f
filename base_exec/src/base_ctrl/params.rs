//! Parameters structure for BaseCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use serde::Deserialize;

use crate::pid::{PidGains, PidGainsError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for base control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- COMMAND LIMITS ----

    /// Maximum velocity per axis. The translational limit applied at intake
    /// is the mean of the x and y limits.
    pub max_vel: AxisLimits,

    /// Maximum acceleration per axis.
    pub max_accel: AxisLimits,

    /// Translational command magnitudes at or below this are zeroed on
    /// intake.
    ///
    /// Units: meters/second
    pub eps: f64,

    /// Commands older than this are replaced by a zero twist.
    ///
    /// Units: seconds
    pub timeout_s: f64,

    /// Largest time step used in a single cycle.
    ///
    /// Units: seconds
    pub max_dt_s: f64,

    // ---- STEERING ----

    /// Gain from steering angle error to caster steering velocity.
    pub kp_caster_steer: f64,

    /// Fraction of the caster steering velocity compensated for in the wheel
    /// speeds.
    pub kp_wheel_steer: f64,

    /// Below this translational speed (and `cmd_vel_rot_eps_rads`) the base
    /// is considered commanded to stand still.
    ///
    /// Units: meters/second
    pub cmd_vel_trans_eps_ms: f64,

    /// Units: radians/second
    pub cmd_vel_rot_eps_rads: f64,

    // ---- STALL DETECTION ----

    /// Low pass filter coefficient, the weight of the previous filtered speed.
    pub alpha_stall: f64,

    /// Units: radians/second
    pub caster_speed_threshold_rads: f64,

    /// Units: radians
    pub caster_position_error_threshold_rad: f64,

    /// Units: newton meters
    pub caster_effort_threshold: f64,

    /// Units: radians/second
    pub wheel_speed_threshold_rads: f64,

    /// Units: newton meters
    pub wheel_effort_threshold: f64,

    // ---- DIAGNOSTICS ----

    /// Minimum interval between two published state reports.
    ///
    /// Units: seconds
    pub state_publish_period_s: f64,

    // ---- JOINT CONTROL ----

    /// Gains of every caster steering joint's velocity controller.
    pub caster_pid: PidGains,

    /// Gains of every wheel joint's velocity controller.
    pub wheel_pid: PidGains,

    /// Gains for particular joints, keyed by joint name, replacing the
    /// caster or wheel gains.
    #[serde(default)]
    pub pid_overrides: HashMap<String, PidGains>,
}

/// A limit on each axis of a body twist.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub struct AxisLimits {
    pub lin_x: f64,
    pub lin_y: f64,
    pub ang_z: f64,
}

/// Problems found when validating the parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Parameter {0} must be finite and non-negative, got {1}")]
    Negative(&'static str, f64),

    #[error("Parameter {0} must be finite and positive, got {1}")]
    NotPositive(&'static str, f64),

    #[error("The stall filter coefficient must be within [0, 1], got {0}")]
    InvalidAlpha(f64),

    #[error("Invalid PID gains for {0}: {1}")]
    InvalidGains(String, PidGainsError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AxisLimits {
    pub fn to_array(&self) -> [f64; 3] {
        [self.lin_x, self.lin_y, self.ang_z]
    }
}

impl Params {

    /// Check every parameter is usable. Nothing is defaulted or corrected.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let non_negative = [
            ("max_vel.lin_x", self.max_vel.lin_x),
            ("max_vel.lin_y", self.max_vel.lin_y),
            ("max_vel.ang_z", self.max_vel.ang_z),
            ("max_accel.lin_x", self.max_accel.lin_x),
            ("max_accel.lin_y", self.max_accel.lin_y),
            ("max_accel.ang_z", self.max_accel.ang_z),
            ("eps", self.eps),
            ("kp_caster_steer", self.kp_caster_steer),
            ("kp_wheel_steer", self.kp_wheel_steer),
            ("cmd_vel_trans_eps_ms", self.cmd_vel_trans_eps_ms),
            ("cmd_vel_rot_eps_rads", self.cmd_vel_rot_eps_rads),
            ("caster_speed_threshold_rads", self.caster_speed_threshold_rads),
            ("caster_position_error_threshold_rad", self.caster_position_error_threshold_rad),
            ("caster_effort_threshold", self.caster_effort_threshold),
            ("wheel_speed_threshold_rads", self.wheel_speed_threshold_rads),
            ("wheel_effort_threshold", self.wheel_effort_threshold),
            ("state_publish_period_s", self.state_publish_period_s),
        ];
        for &(name, value) in non_negative.iter() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParamsError::Negative(name, value));
            }
        }

        let positive = [("timeout_s", self.timeout_s), ("max_dt_s", self.max_dt_s)];
        for &(name, value) in positive.iter() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParamsError::NotPositive(name, value));
            }
        }

        if !(0.0..=1.0).contains(&self.alpha_stall) {
            return Err(ParamsError::InvalidAlpha(self.alpha_stall));
        }

        self.caster_pid
            .validate()
            .map_err(|e| ParamsError::InvalidGains("casters".into(), e))?;
        self.wheel_pid
            .validate()
            .map_err(|e| ParamsError::InvalidGains("wheels".into(), e))?;
        for (joint, gains) in self.pid_overrides.iter() {
            gains
                .validate()
                .map_err(|e| ParamsError::InvalidGains(joint.clone(), e))?;
        }

        Ok(())
    }

    /// Gains for a caster joint, taking overrides into account.
    pub fn caster_gains(&self, joint: &str) -> PidGains {
        *self.pid_overrides.get(joint).unwrap_or(&self.caster_pid)
    }

    /// Gains for a wheel joint, taking overrides into account.
    pub fn wheel_gains(&self, joint: &str) -> PidGains {
        *self.pid_overrides.get(joint).unwrap_or(&self.wheel_pid)
    }
}
