//! # Hardware abstraction
//!
//! The controllers never talk to actuators directly. Instead they are handed
//! an implementation of [`Hardware`] at construction, which owns the state of
//! every joint and the hardware clock. The hardware abstraction is assumed to
//! refresh every joint's measured state before each control cycle begins.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

pub use sim::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Identifies a joint within a particular hardware abstraction.
///
/// Joint IDs are only meaningful for the hardware instance that produced
/// them through [`Hardware::find_joint`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JointId(pub usize);

/// The state of a single actuated joint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JointState {
    /// Name of the joint
    pub name: String,

    /// Measured position of the joint.
    ///
    /// Units: radians
    pub position_rad: f64,

    /// Measured velocity of the joint.
    ///
    /// Units: radians/second
    pub velocity_rads: f64,

    /// Effort the actuator reports it applied.
    ///
    /// Units: newton meters
    pub applied_effort: f64,

    /// Effort commanded by the controllers, read back from the hardware.
    ///
    /// Units: newton meters
    pub commanded_effort: f64,

    /// True once the joint's position reference has been calibrated.
    pub calibrated: bool,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A hardware abstraction providing joint state and accepting effort commands.
pub trait Hardware {
    /// The current hardware time.
    ///
    /// Units: seconds
    fn current_time_s(&self) -> f64;

    /// Find the ID of the joint with the given name.
    fn find_joint(&self, name: &str) -> Option<JointId>;

    /// Get the state of a joint.
    ///
    /// `id` must have been returned by `find_joint` on this hardware.
    fn joint(&self, id: JointId) -> &JointState;

    /// Command the effort a joint shall apply on the next hardware cycle.
    ///
    /// `id` must have been returned by `find_joint` on this hardware.
    fn set_commanded_effort(&mut self, id: JointId, effort: f64);
}
