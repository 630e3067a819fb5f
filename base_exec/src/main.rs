//! Main base-side executable entry point.
//!
//! # Architecture
//!
//! The executable runs two threads:
//!
//!     - The real-time thread owns the base controller and the simulated
//!       hardware. Each cycle it runs base control, steps the simulation and
//!       integrates the odometry pose. It never blocks: commands are taken
//!       from a try-lock slot and diagnostics leave over a channel.
//!     - The main thread is the command source. It plays telecommands, runs
//!       trajectory control and forwards its twist into the base command
//!       slot, and archives the diagnostics sent from the real-time thread.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use serde::Serialize;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use base_lib::{
    base_ctrl::{self, BaseCtrl},
    hardware::{Hardware, SimHardware},
    kinematics::BaseDescription,
    loc::Pose2,
    traj_ctrl::{self, TrajCtrl},
};
use comms_if::tc::base_ctrl::BodyTwist;
use comms_if::tm::BaseCtrlState;
use params::BaseExecParams;
use tc_processor::CmdSinks;
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    module::Controller,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Holonomic base control executable
#[derive(Debug, StructOpt)]
#[structopt(name = "base_exec")]
enum Cli {
    /// Play a telecommand script, with one `<time_s>: <json>;` TC per line.
    Script {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },

    /// Drive the base with a constant body twist.
    Drive {
        /// Units: seconds
        #[structopt(long, default_value = "5")]
        duration_s: f64,

        #[structopt(flatten)]
        twist: BodyTwist,
    },
}

/// Data sent from the real-time thread.
enum RtTm {
    /// Latest odometry pose.
    Pose(Pose2),

    State(BaseCtrlState),
}

/// One row of the base state archive, a joint at a point in time.
#[derive(Serialize)]
struct JointRecord<'a> {
    time_s: f64,
    cmd_lin_x_ms: f64,
    cmd_lin_y_ms: f64,
    cmd_ang_z_rads: f64,
    name: &'a str,
    speed_rads: f64,
    speed_filtered_rads: f64,
    speed_error_rads: f64,
    stuck: bool,
    commanded_effort: f64,
    applied_effort: f64,
}

/// Source of the telecommands for this execution.
enum TcSource {
    Script(ScriptInterpreter),
    Drive { twist: BodyTwist, duration_s: f64 },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let cli = Cli::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("base_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Holonomic Base Executable\n");
    info!("Running on: {}", host::get_host_info());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: BaseExecParams =
        util::params::load("base_exec.toml").wrap_err("Could not load exec params")?;
    let description: BaseDescription = util::params::load("base_description.toml")
        .wrap_err("Could not load the base description")?;
    let base_params: base_ctrl::Params =
        util::params::load("base_ctrl.toml").wrap_err("Could not load BaseCtrl params")?;
    let traj_params: traj_ctrl::Params =
        util::params::load("traj_ctrl.toml").wrap_err("Could not load TrajCtrl params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match cli {
        Cli::Script { path } => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(&path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        }
        Cli::Drive { duration_s, twist } => {
            info!("Driving with {:?} for {:.02} s\n", twist, duration_s);
            TcSource::Drive { twist, duration_s }
        }
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let hw = build_sim(&exec_params, &description);

    let mut base_ctrl = BaseCtrl::new(hw);
    base_ctrl
        .init(base_ctrl::InitData {
            params: base_params,
            description,
        })
        .wrap_err("Failed to initialise BaseCtrl")?;
    base_ctrl.starting().wrap_err("Failed to start BaseCtrl")?;
    info!("BaseCtrl init complete");

    let mut traj_ctrl = TrajCtrl::new();
    traj_ctrl
        .init(traj_params)
        .wrap_err("Failed to initialise TrajCtrl")?;
    traj_ctrl.starting().wrap_err("Failed to start TrajCtrl")?;
    info!("TrajCtrl init complete");

    let sinks = CmdSinks {
        base: base_ctrl.cmd_slot(),
        path: traj_ctrl.path_slot(),
    };

    let mut base_archive = if exec_params.archive_base_state {
        Some(
            Archiver::from_path(&session, "base_ctrl_state.csv")
                .wrap_err("Failed to open the BaseCtrl archive")?,
        )
    }
    else {
        None
    };
    let mut traj_archive = if exec_params.archive_traj_diag {
        Some(
            Archiver::from_path(&session, "traj_ctrl_diag.csv")
                .wrap_err("Failed to open the TrajCtrl archive")?,
        )
    }
    else {
        None
    };

    info!("Module initialisation complete\n");

    // ---- REAL-TIME THREAD ----

    let running = Arc::new(AtomicBool::new(true));
    let (tm_tx, tm_rx) = mpsc::channel();

    let rt_handle = {
        let running = running.clone();
        let period_s = exec_params.base_cycle_period_s;
        thread::Builder::new()
            .name("base_ctrl".into())
            .spawn(move || rt_thread(base_ctrl, period_s, running, tm_tx))
            .wrap_err("Failed to spawn the real-time thread")?
    };

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut pose = Pose2::default();
    let mut num_paths = 0usize;

    loop {
        let cycle_start_instant = Instant::now();
        let time_s = session::get_elapsed_seconds();

        // ---- TELECOMMAND PROCESSING ----

        let end_of_tcs = match tc_source {
            TcSource::Script(ref mut si) => match si.get_pending_tcs() {
                PendingTcs::None => false,
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        tc_processor::exec(&sinks, tc);
                    }
                    false
                }
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    true
                }
            },
            // Resent each cycle so base control never times out
            TcSource::Drive { twist, duration_s } => {
                if time_s < duration_s {
                    sinks.base.set(twist);
                    false
                }
                else {
                    info!("Drive complete, stopping");
                    true
                }
            }
        };

        if end_of_tcs {
            break;
        }

        // ---- REAL-TIME TELEMETRY ----

        drain_tm(&tm_rx, &mut pose, base_archive.as_mut());

        // ---- TRAJECTORY CONTROL ----

        let (twist, report) = traj_ctrl.update(&traj_ctrl::InputData { time_s, pose });

        if let Some(t) = twist {
            sinks.base.set(t);
        }

        if report.new_path {
            if let Some(traj) = traj_ctrl.trajectory() {
                num_paths += 1;
                session.save(format!("trajectory_{:03}.json", num_paths), traj.clone());
            }
        }

        if let (Some(diag), Some(arch)) = (report.diag, traj_archive.as_mut()) {
            if let Err(e) = arch.serialise(diag) {
                warn!("Could not archive TrajCtrl diagnostics: {}", e);
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(exec_params.traj_cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - exec_params.traj_cycle_period_s
            ),
        }
    }

    // ---- SHUTDOWN ----

    // Let the base come to rest before stopping the real-time thread
    sinks.base.set(BodyTwist::zero());
    thread::sleep(Duration::from_secs_f64(exec_params.stop_settle_time_s));

    running.store(false, Ordering::Release);
    match rt_handle.join() {
        Ok(()) => (),
        Err(_) => warn!("Real-time thread panicked"),
    }

    drain_tm(&tm_rx, &mut pose, base_archive.as_mut());
    info!(
        "Final pose: ({:.3} m, {:.3} m, {:.3} rad)",
        pose.position_m.x, pose.position_m.y, pose.yaw_rad
    );

    info!("End of execution");

    session.exit();

    Ok(())
}

/// Build the simulated base from the description, applying the calibration
/// and stall faults requested in the parameters.
fn build_sim(params: &BaseExecParams, description: &BaseDescription) -> SimHardware {
    let mut hw = SimHardware::for_base(description, params.sim.caster, params.sim.wheel);

    for name in params.sim.uncalibrated_joints.iter() {
        match hw.find_joint(name) {
            Some(id) => hw.set_calibrated(id, false),
            None => warn!("Cannot uncalibrate unknown joint {}", name),
        }
    }

    for name in params.sim.stalled_joints.iter() {
        match hw.find_joint(name) {
            Some(id) => hw.set_stalled(id, true),
            None => warn!("Cannot stall unknown joint {}", name),
        }
    }

    hw
}

/// Real-time thread: run base control, then step the simulation and the
/// odometry, until `running` is cleared.
fn rt_thread(
    mut base_ctrl: BaseCtrl<SimHardware>,
    period_s: f64,
    running: Arc<AtomicBool>,
    tm_tx: Sender<RtTm>,
) {
    let period = Duration::from_secs_f64(period_s);
    let mut pose = Pose2::default();
    let mut num_overruns = 0u64;

    while running.load(Ordering::Acquire) {
        let cycle_start_instant = Instant::now();

        let (twist, report) = base_ctrl.update(&());

        base_ctrl.hw_mut().step(period_s);
        pose.integrate(&twist, period_s);

        // A closed channel only means the main thread is shutting down
        tm_tx.send(RtTm::Pose(pose)).ok();
        if let Some(state) = report.state {
            tm_tx.send(RtTm::State(state)).ok();
        }

        match period.checked_sub(Instant::now() - cycle_start_instant) {
            Some(d) => thread::sleep(d),
            None => num_overruns += 1,
        }
    }

    debug!("Real-time thread exiting after {} overruns", num_overruns);
}

/// Take everything the real-time thread has sent, keeping the newest pose and
/// archiving the state reports.
fn drain_tm(tm_rx: &Receiver<RtTm>, pose: &mut Pose2, mut archive: Option<&mut Archiver>) {
    for tm in tm_rx.try_iter() {
        match tm {
            RtTm::Pose(p) => *pose = p,
            RtTm::State(state) => {
                if let Some(arch) = archive.as_mut() {
                    if let Err(e) = archive_state(arch, &state) {
                        warn!("Could not archive BaseCtrl state: {}", e);
                    }
                }
            }
        }
    }
}

fn archive_state(
    arch: &mut Archiver,
    state: &BaseCtrlState,
) -> Result<(), util::archive::ArchiveError> {
    for joint in state.joints.iter() {
        arch.serialise(JointRecord {
            time_s: state.time_s,
            cmd_lin_x_ms: state.cmd.lin_x_ms,
            cmd_lin_y_ms: state.cmd.lin_y_ms,
            cmd_ang_z_rads: state.cmd.ang_z_rads,
            name: &joint.name,
            speed_rads: joint.speed_rads,
            speed_filtered_rads: joint.speed_filtered_rads,
            speed_error_rads: joint.speed_error_rads,
            stuck: joint.stuck,
            commanded_effort: joint.commanded_effort,
            applied_effort: joint.applied_effort,
        })?;
    }

    Ok(())
}
