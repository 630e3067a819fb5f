//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;

// Internal
use super::*;
use crate::{
    cmd_slot::{CmdSlot, TryTake},
    loc::Pose2,
};
use comms_if::{
    tc::{base_ctrl::BodyTwist, traj_ctrl::PathCmd},
    tm::TrajCtrlDiag,
};
use util::{maths::shortest_angular_distance, module::Controller};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of zero twists published after motion stops.
const NUM_STOP_CMDS: u32 = 3;

const STATE_ACTIVE: &str = "ACTIVE - OK";
const STATE_NO_TRAJ: &str = "NO TRAJECTORY";
const STATE_GOAL: &str = "REACHED GOAL";
const STATE_WATCHDOG: &str = "WATCHDOG - MOTION STOPPED";
const STATE_WRONG_DIM: &str = "Input trajectory has wrong dimension - MOTION STOPPED";
const STATE_NO_WAYPOINTS: &str = "No waypoints - MOTION STOPPED";
const STATE_INVALID: &str = "Input trajectory is invalid - MOTION STOPPED";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct TrajCtrl {
    params: Option<Params>,

    /// Executing mode
    mode: TrajCtrlMode,

    /// Human readable description of the control state
    control_state: &'static str,

    /// Paths arriving from outside the control cycle.
    path_slot: CmdSlot<PathCmd>,

    trajectory: Option<Trajectory>,

    /// Controller objects used to calculate twist commands
    controllers: Option<TrajControllers>,

    /// Latest pose of the base
    pose: Pose2,

    /// Number of waypoints in the last path received
    num_waypoints: usize,

    /// Units: seconds
    path_updated_time_s: f64,

    /// Units: seconds
    last_update_time_s: Option<f64>,

    /// Units: seconds
    last_diag_time_s: Option<f64>,

    /// Zero twists published since motion stopped
    stop_count: u32,

    /// Tracking error on the last cycle
    error: TrackingError,
}

/// Input data to trajectory control.
#[derive(Debug, Copy, Clone)]
pub struct InputData {
    /// Units: seconds
    pub time_s: f64,

    /// Current pose of the base in the odometry frame.
    pub pose: Pose2,
}

/// The status report for a single cycle.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub mode: TrajCtrlMode,

    /// A path was taken from the slot this cycle.
    pub new_path: bool,

    pub error: TrackingError,

    /// Full diagnostics, present only on cycles where they are due.
    pub diag: Option<TrajCtrlDiag>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur while setting up or starting TrajCtrl.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("TrajCtrl must be initialised before it is started")]
    NotInitialised,
}

/// The possible modes of execution of TrajCtrl.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum TrajCtrlMode {
    /// No trajectory has been received since starting.
    NoTrajectory,

    Following,

    GoalReached,

    /// Motion stopped by the watchdog or a malformed path.
    Stopped,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajCtrl {

    /// Create an uninitialised controller.
    pub fn new() -> Self {
        Self {
            params: None,
            mode: TrajCtrlMode::NoTrajectory,
            control_state: STATE_NO_TRAJ,
            path_slot: CmdSlot::new(),
            trajectory: None,
            controllers: None,
            pose: Pose2::default(),
            num_waypoints: 0,
            path_updated_time_s: 0.0,
            last_update_time_s: None,
            last_diag_time_s: None,
            stop_count: 0,
            error: TrackingError::default(),
        }
    }

    /// Get a handle through which paths can be sent from any thread.
    pub fn path_slot(&self) -> CmdSlot<PathCmd> {
        self.path_slot.clone()
    }

    pub fn mode(&self) -> TrajCtrlMode {
        self.mode
    }

    pub fn control_state(&self) -> &'static str {
        self.control_state
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    /// True when the base is within tolerance of the goal in both position
    /// and yaw. Always false if no trajectory has been received.
    pub fn goal_reached(&self) -> bool {
        let (params, traj) = match (self.params.as_ref(), self.trajectory.as_ref()) {
            (Some(p), Some(t)) => (p, t),
            _ => return false,
        };

        let goal = traj.goal();
        let dist_m = (self.pose.position_m.x - goal[0]).hypot(self.pose.position_m.y - goal[1]);
        let yaw_err_rad = shortest_angular_distance(self.pose.yaw_rad, goal[2]);

        dist_m <= params.xy_goal_tolerance_m && yaw_err_rad.abs() <= params.yaw_goal_tolerance_rad
    }

    /// Build a new trajectory from the current pose through the path's
    /// waypoints. A malformed path stops motion.
    fn update_path(&mut self, path: &PathCmd, time_s: f64, params: &Params) {
        self.num_waypoints = path.waypoints.len();

        if path.waypoints.is_empty() {
            debug!("Path has no waypoints");
            self.reject_path(STATE_NO_WAYPOINTS);
            return;
        }

        if let Some(wp) = path.waypoints.iter().find(|wp| wp.len() != NUM_AXES) {
            warn!(
                "Path waypoint has dimension {}, expected {}",
                wp.len(),
                NUM_AXES
            );
            self.reject_path(STATE_WRONG_DIM);
            return;
        }

        let mut points = Vec::with_capacity(path.waypoints.len() + 1);
        points.push(self.pose.to_array());
        points.extend(path.waypoints.iter().map(|wp| [wp[0], wp[1], wp[2]]));

        match Trajectory::new(points, &params.vel_limits(), params.interpolation) {
            Ok(traj) => {
                debug!(
                    "New trajectory through {} waypoints lasting {:.3} s",
                    self.num_waypoints,
                    traj.total_time_s()
                );
                self.trajectory = Some(traj);
                self.path_updated_time_s = time_s;
                self.mode = TrajCtrlMode::Following;
                self.control_state = STATE_ACTIVE;
            }
            Err(e) => {
                warn!("Could not build a trajectory from the path: {}", e);
                self.reject_path(STATE_INVALID);
            }
        }
    }

    /// Drop the current trajectory and stop, so no stale goal outlives a
    /// malformed path.
    fn reject_path(&mut self, control_state: &'static str) {
        self.trajectory = None;
        self.stop(TrajCtrlMode::Stopped, control_state);
    }

    /// Stop motion, entering the given mode.
    fn stop(&mut self, mode: TrajCtrlMode, control_state: &'static str) {
        self.mode = mode;
        self.control_state = control_state;
    }

    /// Diagnostics if they are due, or `force`d.
    fn diagnostics(&mut self, time_s: f64, params: &Params, force: bool) -> Option<TrajCtrlDiag> {
        let due = match self.last_diag_time_s {
            Some(t) => time_s - t > params.diagnostics_publish_period_s,
            None => true,
        };
        if !(due || force) {
            return None;
        }
        self.last_diag_time_s = Some(time_s);

        let goal = self
            .trajectory
            .as_ref()
            .map(|t| t.goal())
            .unwrap_or([0.0; NUM_AXES]);

        Some(TrajCtrlDiag {
            time_s,
            control_state: self.control_state.to_string(),
            error_x_m: self.error.x_m,
            error_y_m: self.error.y_m,
            error_yaw_rad: self.error.yaw_rad,
            goal_x_m: goal[0],
            goal_y_m: goal[1],
            goal_yaw_rad: goal[2],
            num_waypoints: self.num_waypoints,
        })
    }
}

impl Default for TrajCtrl {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for TrajCtrl {
    type InitData = Params;
    type InitError = TrajCtrlError;
    type StartError = TrajCtrlError;

    type InputData = InputData;
    type OutputData = Option<BodyTwist>;
    type StatusReport = StatusReport;

    /// Initialise the TrajCtrl module.
    fn init(&mut self, params: Self::InitData) -> Result<(), Self::InitError> {
        params.validate()?;

        self.controllers = Some(TrajControllers::new(&params));
        self.params = Some(params);

        info!("TrajCtrl initialised");

        Ok(())
    }

    fn starting(&mut self) -> Result<(), Self::StartError> {
        let ctrls = self.controllers.as_mut().ok_or(TrajCtrlError::NotInitialised)?;
        ctrls.reset();

        self.trajectory = None;
        self.num_waypoints = 0;
        self.stop(TrajCtrlMode::NoTrajectory, STATE_NO_TRAJ);
        self.stop_count = 0;
        self.last_update_time_s = None;
        self.last_diag_time_s = None;
        self.error = TrackingError::default();

        Ok(())
    }

    /// Process trajectory control.
    ///
    /// Returns the twist to command, or `None` once motion has been stopped
    /// long enough that nothing more needs publishing.
    fn update(&mut self, input_data: &Self::InputData) -> (Self::OutputData, Self::StatusReport) {
        let mut report = StatusReport {
            mode: self.mode,
            new_path: false,
            error: self.error,
            diag: None,
        };

        let params = match self.params {
            Some(p) => p,
            None => return (None, report),
        };

        let time_s = input_data.time_s;
        let dt_s = match self.last_update_time_s {
            Some(t) => time_s - t,
            None => 0.0,
        };
        self.last_update_time_s = Some(time_s);
        self.pose = input_data.pose;

        // ---- PATH INTAKE ----

        match self.path_slot.try_take() {
            TryTake::Taken(path) => {
                self.update_path(&path, time_s, &params);
                report.new_path = true;
            }
            TryTake::Contended => trace!("Path slot contended, keeping the previous path"),
            TryTake::Empty => (),
        }

        // ---- STOP CONDITIONS ----

        if self.mode == TrajCtrlMode::Following {
            if self.goal_reached() {
                info!("TrajCtrl reached the goal");
                self.stop(TrajCtrlMode::GoalReached, STATE_GOAL);
            }
            else if time_s - self.path_updated_time_s > params.max_update_time_s {
                warn!(
                    "No path received for {:.3} s, stopping motion",
                    time_s - self.path_updated_time_s
                );
                self.stop(TrajCtrlMode::Stopped, STATE_WATCHDOG);
            }
        }

        // ---- CONTROL ----

        let output = match (self.mode, self.trajectory.as_ref(), self.controllers.as_mut()) {
            (TrajCtrlMode::Following, Some(traj), Some(ctrls)) => {
                self.stop_count = 0;

                let target = traj.sample(time_s - self.path_updated_time_s);
                let (cmd, error) = ctrls.get_cmd(&target, &self.pose, dt_s);
                self.error = error;

                Some(cmd)
            }
            _ if self.stop_count < NUM_STOP_CMDS => {
                self.stop_count += 1;
                Some(BodyTwist::zero())
            }
            _ => None,
        };

        report.mode = self.mode;
        report.error = self.error;
        report.diag = self.diagnostics(time_s, &params, report.new_path);

        (output, report)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    /// Control cycle period
    const DT: f64 = 0.01;

    fn test_params() -> Params {
        util::params::parse(
            r#"
            interpolation = "linear"
            max_update_time_s = 100.0
            xy_goal_tolerance_m = 0.05
            yaw_goal_tolerance_rad = 0.05
            diagnostics_publish_period_s = 1.0

            [x]
            vel_limit = 0.2
            pid = { k_p = 0.5, k_i = 0.1, k_d = 0.0, output_limit = 0.5 }

            [y]
            vel_limit = 0.2
            pid = { k_p = 0.5, k_i = 0.1, k_d = 0.0, output_limit = 0.5 }

            [yaw]
            vel_limit = 0.2
            pid = { k_p = 0.5, k_i = 0.1, k_d = 0.0, output_limit = 0.5 }
            "#,
        )
        .unwrap()
    }

    fn started(params: Params) -> TrajCtrl {
        let mut ctrl = TrajCtrl::new();
        ctrl.init(params).unwrap();
        ctrl.starting().unwrap();
        ctrl
    }

    /// Run the controller for `duration_s`, with the base ideally executing
    /// the commanded twist. Returns the outputs of every cycle.
    fn run(ctrl: &mut TrajCtrl, pose: &mut Pose2, start_s: f64, duration_s: f64) -> Vec<Option<BodyTwist>> {
        let mut outputs = Vec::new();
        let num_cycles = (duration_s / DT).round() as usize;

        for i in 0..num_cycles {
            let input = InputData {
                time_s: start_s + i as f64 * DT,
                pose: *pose,
            };
            let (out, _) = ctrl.update(&input);
            if let Some(twist) = out {
                pose.integrate(&twist, DT);
            }
            outputs.push(out);
        }

        outputs
    }

    #[test]
    fn test_goal_reached_after_trajectory_ends() {
        let mut ctrl = started(test_params());
        let mut pose = Pose2::default();

        ctrl.path_slot().set(PathCmd {
            waypoints: vec![vec![1.0, 0.0, 0.0]],
        });

        // The trajectory lasts 5 s, run to 6 s
        let outputs = run(&mut ctrl, &mut pose, 0.0, 6.0);

        assert!((ctrl.trajectory().unwrap().total_time_s() - 5.0).abs() < 1e-12);
        assert!(ctrl.goal_reached());
        assert_eq!(ctrl.mode(), TrajCtrlMode::GoalReached);
        assert_eq!(ctrl.control_state(), "REACHED GOAL");
        assert!((pose.position_m.x - 1.0).abs() <= 0.05 + 1e-9);

        // Once stopped, at most three zero twists and then nothing
        let stop_idx = outputs
            .iter()
            .position(|o| *o == Some(BodyTwist::zero()))
            .unwrap();
        for (i, out) in outputs[stop_idx..].iter().enumerate() {
            if i < 3 {
                assert_eq!(*out, Some(BodyTwist::zero()));
            }
            else {
                assert_eq!(*out, None);
            }
        }

        // The velocity limits held throughout
        for twist in outputs.iter().flatten() {
            assert!(twist.lin_x_ms.abs() <= 0.2 + 1e-12);
            assert!(twist.lin_y_ms.abs() <= 0.2 + 1e-12);
        }
    }

    #[test]
    fn test_watchdog_stops_motion() {
        let mut params = test_params();
        params.max_update_time_s = 0.2;
        let mut ctrl = started(params);
        let mut pose = Pose2::default();
        let slot = ctrl.path_slot();

        slot.set(PathCmd {
            waypoints: vec![vec![1.0, 0.0, 0.0]],
        });
        let outputs = run(&mut ctrl, &mut pose, 0.0, 0.5);

        assert_eq!(ctrl.mode(), TrajCtrlMode::Stopped);
        assert_eq!(ctrl.control_state(), "WATCHDOG - MOTION STOPPED");

        // Moving until the watchdog fired just after 0.2 s
        assert!(outputs[..20].iter().all(|o| o.unwrap().lin_x_ms > 0.0));
        assert_eq!(outputs[21..24], [Some(BodyTwist::zero()); 3]);
        assert!(outputs[24..].iter().all(|o| o.is_none()));

        // A refreshed path resumes motion from where the base is
        slot.set(PathCmd {
            waypoints: vec![vec![1.0, 0.0, 0.0]],
        });
        let outputs = run(&mut ctrl, &mut pose, 0.5, 0.1);
        assert_eq!(ctrl.mode(), TrajCtrlMode::Following);
        assert!(outputs.iter().all(|o| o.unwrap().lin_x_ms > 0.0));
    }

    #[test]
    fn test_command_in_body_frame() {
        let mut ctrl = started(test_params());
        let mut pose = Pose2::new(0.0, 0.0, FRAC_PI_2);

        // Moving along odometry +y while facing +y is driving forwards
        ctrl.path_slot().set(PathCmd {
            waypoints: vec![vec![0.0, 1.0, FRAC_PI_2]],
        });
        let outputs = run(&mut ctrl, &mut pose, 0.0, 0.01);
        let cmd = outputs[0].unwrap();

        assert!((cmd.lin_x_ms - 0.2).abs() < 1e-9);
        assert!(cmd.lin_y_ms.abs() < 1e-9);
        assert!(cmd.ang_z_rads.abs() < 1e-9);
    }

    #[test]
    fn test_malformed_paths_stop_motion() {
        let mut ctrl = started(test_params());
        let mut pose = Pose2::default();
        let slot = ctrl.path_slot();

        slot.set(PathCmd {
            waypoints: vec![vec![1.0, 0.0, 0.0]],
        });
        run(&mut ctrl, &mut pose, 0.0, 0.1);
        assert_eq!(ctrl.mode(), TrajCtrlMode::Following);

        slot.set(PathCmd {
            waypoints: vec![vec![1.0, 0.0]],
        });
        let outputs = run(&mut ctrl, &mut pose, 0.1, 0.1);
        assert_eq!(ctrl.mode(), TrajCtrlMode::Stopped);
        assert_eq!(ctrl.control_state(), STATE_WRONG_DIM);
        assert_eq!(outputs[0], Some(BodyTwist::zero()));

        assert!(ctrl.trajectory().is_none());

        slot.set(PathCmd { waypoints: vec![] });
        run(&mut ctrl, &mut pose, 0.2, 0.1);
        assert_eq!(ctrl.control_state(), STATE_NO_WAYPOINTS);
        assert!(ctrl.trajectory().is_none());
        assert!(!ctrl.goal_reached());
    }

    #[test]
    fn test_rejected_path_forgets_old_goal() {
        let mut ctrl = started(test_params());
        let mut pose = Pose2::default();
        let slot = ctrl.path_slot();

        slot.set(PathCmd {
            waypoints: vec![vec![1.0, 0.0, 0.0]],
        });
        run(&mut ctrl, &mut pose, 0.0, 6.0);
        assert_eq!(ctrl.mode(), TrajCtrlMode::GoalReached);
        assert!(ctrl.goal_reached());

        // Sitting on the old goal, a bad path must not report it reached
        slot.set(PathCmd {
            waypoints: vec![vec![2.0, f64::NAN, 0.0]],
        });
        let input = InputData {
            time_s: 6.0,
            pose,
        };
        let (_, report) = ctrl.update(&input);

        assert_eq!(report.mode, TrajCtrlMode::Stopped);
        assert!(ctrl.trajectory().is_none());
        assert!(!ctrl.goal_reached());

        let diag = report.diag.unwrap();
        assert_eq!(diag.control_state, STATE_INVALID);
        assert_eq!(diag.num_waypoints, 1);
        assert_eq!((diag.goal_x_m, diag.goal_y_m, diag.goal_yaw_rad), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_idle_before_any_path() {
        let mut ctrl = started(test_params());
        let mut pose = Pose2::default();

        let outputs = run(&mut ctrl, &mut pose, 0.0, 0.1);
        assert_eq!(outputs[..3], [Some(BodyTwist::zero()); 3]);
        assert!(outputs[3..].iter().all(|o| o.is_none()));
        assert_eq!(ctrl.mode(), TrajCtrlMode::NoTrajectory);
        assert!(!ctrl.goal_reached());
    }

    #[test]
    fn test_diagnostics_capped() {
        let mut ctrl = started(test_params());
        let mut pose = Pose2::default();

        let mut times = Vec::new();
        for i in 0..350 {
            let time_s = i as f64 * DT;
            if i == 150 {
                ctrl.path_slot().set(PathCmd {
                    waypoints: vec![vec![0.5, 0.0, 0.0]],
                });
            }
            let (_, report) = ctrl.update(&InputData { time_s, pose });
            if let Some(diag) = report.diag {
                times.push(diag.time_s);
                if i == 150 {
                    assert_eq!(diag.num_waypoints, 1);
                    assert_eq!(diag.goal_x_m, 0.5);
                }
            }
        }

        // First cycle, forced on the new path, then capped
        assert_eq!(times.len(), 4);
        assert_eq!(times[0], 0.0);
        assert!((times[1] - 1.01).abs() < 1e-9);
        assert!((times[2] - 1.5).abs() < 1e-9);
        assert!((times[3] - 2.51).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = test_params();
        params.y.vel_limit = 0.0;

        let mut ctrl = TrajCtrl::new();
        assert!(matches!(
            ctrl.init(params),
            Err(TrajCtrlError::InvalidParams(ParamsError::InvalidVelLimit("y", _)))
        ));
        assert!(matches!(ctrl.starting(), Err(TrajCtrlError::NotInitialised)));
    }
}
