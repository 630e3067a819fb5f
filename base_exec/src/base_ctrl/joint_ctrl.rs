//! Velocity controller for a single joint

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::{
    hardware::{Hardware, JointId},
    pid::{PidController, PidGains},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drives one joint to a commanded velocity through a PID on the velocity
/// error.
#[derive(Debug, Clone, Serialize)]
pub struct JointVelCtrl {
    joint: JointId,

    pid: PidController,

    /// Units: radians/second
    cmd_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointVelCtrl {
    pub fn new(joint: JointId, gains: PidGains) -> Self {
        Self {
            joint,
            pid: PidController::new(gains),
            cmd_rads: 0.0,
        }
    }

    /// Clear the PID state and the command.
    pub fn reset(&mut self) {
        self.pid.reset();
        self.cmd_rads = 0.0;
    }

    pub fn set_cmd(&mut self, cmd_rads: f64) {
        self.cmd_rads = cmd_rads;
    }

    pub fn cmd(&self) -> f64 {
        self.cmd_rads
    }

    /// Run the PID on the current velocity error and command the resulting
    /// effort. Returns the commanded effort.
    pub fn update<H: Hardware>(&mut self, hw: &mut H, dt_s: f64) -> f64 {
        let error = self.cmd_rads - hw.joint(self.joint).velocity_rads;
        let effort = self.pid.update(error, dt_s);

        hw.set_commanded_effort(self.joint, effort);

        effort
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{SimHardware, SimJointParams};

    #[test]
    fn test_tracks_velocity() {
        let mut hw = SimHardware::new();
        let id = hw.add_joint(
            "wheel",
            SimJointParams {
                inertia: 0.05,
                damping: 0.5,
                max_effort: 10.0,
            },
            true,
        );

        let mut ctrl = JointVelCtrl::new(
            id,
            PidGains {
                k_p: 2.0,
                k_i: 10.0,
                k_d: 0.0,
                output_limit: 10.0,
            },
        );
        ctrl.set_cmd(3.0);

        for _ in 0..5000 {
            let effort = ctrl.update(&mut hw, 0.001);
            assert_eq!(hw.joint(id).commanded_effort, effort);
            hw.step(0.001);
        }

        assert!((hw.joint(id).velocity_rads - 3.0).abs() < 0.01);

        ctrl.reset();
        assert_eq!(ctrl.cmd(), 0.0);
    }
}
