//! # Base Executable Parameters
//!
//! This module provides parameters for the base executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use base_lib::hardware::SimJointParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BaseExecParams {

    /// Target period of one base control cycle, run on the real-time thread.
    ///
    /// Units: seconds
    pub base_cycle_period_s: f64,

    /// Target period of one command source cycle, which also runs trajectory
    /// control.
    ///
    /// Units: seconds
    pub traj_cycle_period_s: f64,

    /// Time allowed for the base to come to rest after the last command.
    ///
    /// Units: seconds
    pub stop_settle_time_s: f64,

    /// Write base controller state reports to the session archive.
    pub archive_base_state: bool,

    /// Write trajectory controller diagnostics to the session archive.
    pub archive_traj_diag: bool,

    pub sim: SimParams,
}

/// Parameters of the simulated base.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    pub caster: SimJointParams,

    pub wheel: SimJointParams,

    /// Names of caster joints which start uncalibrated.
    #[serde(default)]
    pub uncalibrated_joints: Vec<String>,

    /// Names of joints which are jammed for the whole run.
    #[serde(default)]
    pub stalled_joints: Vec<String>,
}
