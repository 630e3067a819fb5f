//! # Simulated hardware
//!
//! Each joint is modelled as a first order system, an inertia driven by the
//! applied effort and slowed by viscous damping:
//!
//! ```text
//! inertia * dv/dt = applied_effort - damping * v
//! ```
//!
//! Damping is integrated implicitly so the simulation stays stable for any
//! step size.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use serde::Deserialize;

use super::{Hardware, JointId, JointState};
use crate::kinematics::BaseDescription;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Dynamic properties of a simulated joint.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct SimJointParams {
    /// Rotational inertia of the joint.
    ///
    /// Units: kilogram meters^2
    pub inertia: f64,

    /// Viscous damping coefficient.
    ///
    /// Units: newton meter seconds/radian
    pub damping: f64,

    /// Largest effort the actuator can apply, in either direction.
    ///
    /// Units: newton meters
    pub max_effort: f64,
}

/// A simulated set of joints, stepped explicitly by the owner.
#[derive(Debug, Default)]
pub struct SimHardware {
    time_s: f64,

    joints: Vec<JointState>,

    dynamics: Vec<SimJoint>,
}

#[derive(Debug, Copy, Clone)]
struct SimJoint {
    params: SimJointParams,

    /// A stalled joint cannot move whatever the effort applied to it.
    stalled: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimHardware {
    /// Create an empty simulation with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a joint to the simulation, returning its ID.
    pub fn add_joint(&mut self, name: &str, params: SimJointParams, calibrated: bool) -> JointId {
        self.joints.push(JointState {
            name: name.to_string(),
            calibrated,
            ..Default::default()
        });
        self.dynamics.push(SimJoint {
            params,
            stalled: false,
        });

        JointId(self.joints.len() - 1)
    }

    /// Create a simulation containing every caster and wheel joint of the
    /// base, all calibrated.
    pub fn for_base(
        desc: &BaseDescription,
        caster_params: SimJointParams,
        wheel_params: SimJointParams,
    ) -> Self {
        let mut sim = Self::new();

        for caster in desc.casters.iter() {
            sim.add_joint(&caster.joint, caster_params, true);
            for wheel in caster.wheels.iter() {
                sim.add_joint(&wheel.joint, wheel_params, true);
            }
        }

        sim
    }

    /// Number of joints in the simulation.
    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    pub fn set_calibrated(&mut self, id: JointId, calibrated: bool) {
        self.joints[id.0].calibrated = calibrated;
    }

    /// Jam (or free) a joint. A stalled joint reports zero velocity.
    pub fn set_stalled(&mut self, id: JointId, stalled: bool) {
        self.dynamics[id.0].stalled = stalled;
        if stalled {
            self.joints[id.0].velocity_rads = 0.0;
        }
    }

    /// Directly set the position of a joint, for example to place a caster
    /// at a known angle.
    pub fn set_position(&mut self, id: JointId, position_rad: f64) {
        self.joints[id.0].position_rad = position_rad;
    }

    /// Set the simulation clock.
    pub fn set_time(&mut self, time_s: f64) {
        self.time_s = time_s;
    }

    /// Advance the simulation by `dt_s` seconds.
    ///
    /// Applied effort is the commanded effort saturated at the joint's
    /// maximum. A stalled joint applies effort but does not move.
    pub fn step(&mut self, dt_s: f64) {
        if dt_s <= 0.0 {
            warn!("Ignoring non-positive simulation step of {} s", dt_s);
            return;
        }

        for (joint, dynamics) in self.joints.iter_mut().zip(self.dynamics.iter()) {
            let p = &dynamics.params;

            joint.applied_effort = joint.commanded_effort.max(-p.max_effort).min(p.max_effort);

            if dynamics.stalled {
                joint.velocity_rads = 0.0;
                continue;
            }

            joint.velocity_rads = (joint.velocity_rads
                + joint.applied_effort * dt_s / p.inertia)
                / (1.0 + p.damping * dt_s / p.inertia);
            joint.position_rad += joint.velocity_rads * dt_s;
        }

        self.time_s += dt_s;
    }
}

impl Hardware for SimHardware {
    fn current_time_s(&self) -> f64 {
        self.time_s
    }

    fn find_joint(&self, name: &str) -> Option<JointId> {
        self.joints.iter().position(|j| j.name == name).map(JointId)
    }

    fn joint(&self, id: JointId) -> &JointState {
        &self.joints[id.0]
    }

    fn set_commanded_effort(&mut self, id: JointId, effort: f64) {
        self.joints[id.0].commanded_effort = effort;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: SimJointParams = SimJointParams {
        inertia: 0.1,
        damping: 1.0,
        max_effort: 2.0,
    };

    #[test]
    fn test_steady_state_velocity() {
        let mut hw = SimHardware::new();
        let id = hw.add_joint("j", PARAMS, true);
        hw.set_commanded_effort(id, 1.0);

        for _ in 0..10_000 {
            hw.step(0.001);
        }

        // Steady state velocity is effort / damping
        assert!((hw.joint(id).velocity_rads - 1.0).abs() < 1e-6);
        assert!((hw.current_time_s() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_effort_saturation_and_stall() {
        let mut hw = SimHardware::new();
        let id = hw.add_joint("j", PARAMS, false);
        assert_eq!(hw.find_joint("j"), Some(id));
        assert_eq!(hw.find_joint("k"), None);

        hw.set_commanded_effort(id, 10.0);
        hw.step(0.01);
        assert_eq!(hw.joint(id).applied_effort, 2.0);
        assert!(hw.joint(id).velocity_rads > 0.0);

        hw.set_stalled(id, true);
        let pos = hw.joint(id).position_rad;
        hw.step(0.01);
        assert_eq!(hw.joint(id).velocity_rads, 0.0);
        assert_eq!(hw.joint(id).position_rad, pos);
        assert_eq!(hw.joint(id).applied_effort, 2.0);
    }
}
