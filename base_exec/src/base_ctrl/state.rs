//! Implementations for the BaseCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, trace, warn};
use serde::Serialize;

// Internal
use super::{interpolate_cmd, limit_cmd, BaseCtrlError, JointVelCtrl, Params};
use crate::{
    cmd_slot::{CmdSlot, TryTake},
    hardware::Hardware,
    kinematics::{BaseDescription, BaseKinematics},
};
use comms_if::{
    tc::base_ctrl::BodyTwist,
    tm::{BaseCtrlState, JointDiag},
};
use util::module::Controller;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Base control module state
pub struct BaseCtrl<H: Hardware> {
    hw: H,

    mode: Mode,

    /// Commands arriving from outside the control cycle.
    cmd_slot: CmdSlot<BodyTwist>,

    /// Everything built by `init`.
    core: Option<Core>,
}

/// The configured part of the controller, exclusively owned by the control
/// cycle.
pub(crate) struct Core {
    pub(crate) params: Params,

    pub(crate) kin: BaseKinematics,

    /// One per caster, in the same order as `kin.casters`.
    pub(crate) caster_ctrls: Vec<JointVelCtrl>,

    /// One per wheel, in the same order as `kin.wheels`.
    pub(crate) wheel_ctrls: Vec<JointVelCtrl>,

    /// The last command taken from the slot, after intake limiting.
    pub(crate) cmd_desired: BodyTwist,

    /// The rate limited command being executed.
    pub(crate) cmd_current: BodyTwist,

    /// Units: seconds
    pub(crate) cmd_received_time_s: f64,

    /// Units: seconds
    pub(crate) last_time_s: f64,

    /// Units: seconds
    pub(crate) last_publish_time_s: Option<f64>,
}

/// Data required to initialise BaseCtrl.
#[derive(Debug, Clone)]
pub struct InitData {
    pub params: Params,

    pub description: BaseDescription,
}

/// Operating mode of the controller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Mode {
    /// Not started, or failed to start. No joint is commanded.
    Off,

    /// Tracking the commanded twist.
    Active,

    /// No command arrived within the timeout, the base is commanded to stand
    /// still.
    TimedOut,
}

/// Status report for BaseCtrl processing.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub mode: Mode,

    /// A new command was taken this cycle.
    pub new_cmd: bool,

    /// A command was pending but the slot was locked by the writer.
    pub cmd_contended: bool,

    pub num_stuck_casters: usize,

    pub num_stuck_wheels: usize,

    /// Full state, present only on cycles where it is due for publishing.
    pub state: Option<BaseCtrlState>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<H: Hardware> BaseCtrl<H> {

    /// Create an uninitialised controller driving the given hardware.
    pub fn new(hw: H) -> Self {
        Self {
            hw,
            mode: Mode::Off,
            cmd_slot: CmdSlot::new(),
            core: None,
        }
    }

    /// Get a handle through which commands can be sent to the controller from
    /// any thread.
    pub fn cmd_slot(&self) -> CmdSlot<BodyTwist> {
        self.cmd_slot.clone()
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn kinematics(&self) -> Option<&BaseKinematics> {
        self.core.as_ref().map(|c| &c.kin)
    }

    /// The rate limited command currently being executed.
    pub fn current_cmd(&self) -> BodyTwist {
        self.core
            .as_ref()
            .map(|c| c.cmd_current)
            .unwrap_or_default()
    }

    /// Velocity commands of the caster and wheel controllers, casters first.
    pub fn joint_cmds(&self) -> Vec<f64> {
        match self.core.as_ref() {
            Some(c) => c
                .caster_ctrls
                .iter()
                .chain(c.wheel_ctrls.iter())
                .map(|j| j.cmd())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Core {

    /// Clear all accumulated state ready for a start.
    fn reset<H: Hardware>(&mut self, hw: &H) {
        let now = hw.current_time_s();

        for ctrl in self.caster_ctrls.iter_mut().chain(self.wheel_ctrls.iter_mut()) {
            ctrl.reset();
        }

        // Hold the casters where they are until the first real command
        for caster in self.kin.casters.iter_mut() {
            caster.steer_angle_stored_rad = hw.joint(caster.joint).position_rad;
        }

        self.cmd_desired = BodyTwist::zero();
        self.cmd_current = BodyTwist::zero();
        self.cmd_received_time_s = now;
        self.last_time_s = now;
        self.last_publish_time_s = None;
    }

    /// Build the published state of every joint.
    fn state<H: Hardware>(&self, hw: &H, time_s: f64) -> BaseCtrlState {
        let mut joints = Vec::with_capacity(self.kin.casters.len() + self.kin.wheels.len());

        for c in self.kin.casters.iter() {
            let j = hw.joint(c.joint);
            joints.push(JointDiag {
                name: c.joint_name.clone(),
                speed_rads: c.speed_rads,
                speed_filtered_rads: c.speed_filtered_rads,
                speed_error_rads: c.speed_error_rads,
                stuck: c.stuck,
                commanded_effort: j.commanded_effort,
                applied_effort: j.applied_effort,
            });
        }

        for w in self.kin.wheels.iter() {
            let j = hw.joint(w.joint);
            joints.push(JointDiag {
                name: w.joint_name.clone(),
                speed_rads: w.speed_actual_rads,
                speed_filtered_rads: w.speed_filtered_rads,
                speed_error_rads: w.speed_error_rads,
                stuck: w.stuck,
                commanded_effort: j.commanded_effort,
                applied_effort: j.applied_effort,
            });
        }

        BaseCtrlState {
            time_s,
            cmd: self.cmd_current,
            joints,
        }
    }
}

impl<H: Hardware> Controller for BaseCtrl<H> {
    type InitData = InitData;
    type InitError = BaseCtrlError;
    type StartError = BaseCtrlError;

    type InputData = ();
    type OutputData = BodyTwist;
    type StatusReport = StatusReport;

    /// Initialise the BaseCtrl module.
    ///
    /// Parameters are validated and every joint in the description resolved
    /// against the hardware. The controller is left off.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let InitData {
            params,
            description,
        } = init_data;

        self.mode = Mode::Off;
        self.core = None;

        params.validate()?;
        let kin = BaseKinematics::new(&description, &self.hw)?;

        let caster_ctrls = kin
            .casters
            .iter()
            .map(|c| JointVelCtrl::new(c.joint, params.caster_gains(&c.joint_name)))
            .collect();
        let wheel_ctrls = kin
            .wheels
            .iter()
            .map(|w| JointVelCtrl::new(w.joint, params.wheel_gains(&w.joint_name)))
            .collect();

        info!(
            "BaseCtrl initialised with {} casters and {} wheels",
            kin.casters.len(),
            kin.wheels.len()
        );

        self.core = Some(Core {
            params,
            kin,
            caster_ctrls,
            wheel_ctrls,
            cmd_desired: BodyTwist::zero(),
            cmd_current: BodyTwist::zero(),
            cmd_received_time_s: 0.0,
            last_time_s: 0.0,
            last_publish_time_s: None,
        });

        Ok(())
    }

    /// Start the controller. Fails if any caster is uncalibrated, in which
    /// case the controller stays off.
    fn starting(&mut self) -> Result<(), Self::StartError> {
        self.mode = Mode::Off;

        let hw = &self.hw;
        let core = self.core.as_mut().ok_or(BaseCtrlError::NotInitialised)?;

        if let Some(c) = core.kin.casters.iter().find(|c| !hw.joint(c.joint).calibrated) {
            error!("Caster {} is not calibrated, BaseCtrl will not start", c.name);
            return Err(BaseCtrlError::CasterNotCalibrated(c.name.clone()));
        }

        core.reset(hw);
        self.mode = Mode::Active;

        info!("BaseCtrl started");

        Ok(())
    }

    /// Perform one control cycle.
    ///
    /// Returns the rate limited twist being executed.
    fn update(&mut self, _input_data: &Self::InputData) -> (Self::OutputData, Self::StatusReport) {
        let mut report = StatusReport {
            mode: self.mode,
            new_cmd: false,
            cmd_contended: false,
            num_stuck_casters: 0,
            num_stuck_wheels: 0,
            state: None,
        };

        let core = match self.core.as_mut() {
            Some(c) if self.mode != Mode::Off => c,
            _ => return (BodyTwist::zero(), report),
        };

        // Time step, capped so a late cycle cannot kick the controllers
        let now = self.hw.current_time_s();
        let dt_s = (now - core.last_time_s).min(core.params.max_dt_s).max(0.0);
        core.last_time_s = now;

        // ---- COMMAND INTAKE ----

        match self.cmd_slot.try_take() {
            TryTake::Taken(cmd) => {
                core.cmd_desired = limit_cmd(&cmd, &core.params);
                core.cmd_received_time_s = now;
                report.new_cmd = true;
                debug!("New base command {:?}", core.cmd_desired);
            }
            TryTake::Contended => {
                trace!("Command slot contended, keeping the previous command");
                report.cmd_contended = true;
            }
            TryTake::Empty => (),
        }

        // ---- TIMEOUT ----

        if now - core.cmd_received_time_s > core.params.timeout_s {
            if self.mode == Mode::Active {
                warn!(
                    "No base command received for {} s, stopping the base",
                    core.params.timeout_s
                );
                self.mode = Mode::TimedOut;
            }
            // Stale motion is never extrapolated, the base stops at once
            core.cmd_desired = BodyTwist::zero();
            core.cmd_current = BodyTwist::zero();
        }
        else {
            if self.mode == Mode::TimedOut {
                info!("Base command received, resuming");
                self.mode = Mode::Active;
            }

            core.cmd_current = interpolate_cmd(
                &core.cmd_current,
                &core.cmd_desired,
                &core.params.max_accel,
                dt_s,
            );
        }

        // ---- JOINT DEMANDS ----

        core.kin.update_wheel_positions(&self.hw);
        core.calc_caster_steer(&self.hw);
        core.calc_wheel_speed(&self.hw);

        for ctrl in core.caster_ctrls.iter_mut().chain(core.wheel_ctrls.iter_mut()) {
            ctrl.update(&mut self.hw, dt_s);
        }

        // ---- DIAGNOSTICS ----

        core.calc_stall(&self.hw);

        report.mode = self.mode;
        report.num_stuck_casters = core.kin.casters.iter().filter(|c| c.stuck).count();
        report.num_stuck_wheels = core.kin.wheels.iter().filter(|w| w.stuck).count();

        let publish_due = match core.last_publish_time_s {
            Some(t) => now - t >= core.params.state_publish_period_s,
            None => true,
        };
        if publish_due {
            report.state = Some(core.state(&self.hw, now));
            core.last_publish_time_s = Some(now);
        }

        trace!("BaseCtrl output: {:?}", core.cmd_current);

        (core.cmd_current, report)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
