//! # Base library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to
//! access the controllers defined inside the base crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Base control module - converts body twist commands into caster and wheel efforts
pub mod base_ctrl;

/// Latest-wins command hand over between threads
pub mod cmd_slot;

/// Hardware abstraction - joint states, efforts and the simulated base
pub mod hardware;

/// Kinematics - the geometry of the casters and wheels
pub mod kinematics;

/// Localisation module - odometry pose of the base
pub mod loc;

/// Bounded PID controller
pub mod pid;

/// Trajectory control module - keeps the base on the given path
pub mod traj_ctrl;
