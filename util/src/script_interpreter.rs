//! # Script interpreter module
//!
//! This module provides an interpreter for telecommand scripts, allowing
//! telecommands to be played back at fixed times.
//!
//! A script is a sequence of `<time_s>: <json>;` entries, one per line, for
//! example:
//!
//! ```text
//! 0.5: {"type": "base_twist", "lin_x_ms": 0.2, "lin_y_ms": 0.0, "ang_z_rads": 0.0};
//! 4.0: {"type": "stop"};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

// Internal
use crate::session::get_elapsed_seconds;
use comms_if::tc::{Tc, TcParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The Telecommand to run
    tc: Tc,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_tcs` to acquire a list of telecommands that need executing.
pub struct ScriptInterpreter {
    cmds: VecDeque<Command>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Could not build the script pattern: {0}")]
    PatternError(regex::Error),

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError),
}

/// Telecommands ready to execute.
#[derive(Debug)]
pub enum PendingTcs {
    None,
    Some(Vec<Tc>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref();

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path.display().to_string()));
        }

        let script = fs::read_to_string(path).map_err(ScriptError::ScriptLoadError)?;

        Self::from_script(&script)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_script(script: &str) -> Result<Self, ScriptError> {
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::PatternError)?;

        let mut tc_queue: VecDeque<Command> = VecDeque::new();

        for cap in re.captures_iter(script) {
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            // The payloads are JSON only.
            let payload = cap.get(3).map(|m| m.as_str()).unwrap_or("");
            let tc = Tc::from_json(payload).map_err(|e| ScriptError::InvalidTc(exec_time_s, e))?;

            tc_queue.push_back(Command { exec_time_s, tc });
        }

        if tc_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        // Commands are executed in time order regardless of the order they
        // were written in.
        tc_queue
            .make_contiguous()
            .sort_by(|a, b| a.exec_time_s.total_cmp(&b.exec_time_s));

        Ok(ScriptInterpreter { cmds: tc_queue })
    }

    /// Return the pending TCs at the current session time.
    pub fn get_pending_tcs(&mut self) -> PendingTcs {
        self.get_pending_tcs_at(get_elapsed_seconds())
    }

    /// Return the TCs whose execution time is before `current_time_s`.
    pub fn get_pending_tcs_at(&mut self, current_time_s: f64) -> PendingTcs {
        // If the queue is empty the script is over
        if self.cmds.is_empty() {
            return PendingTcs::EndOfScript;
        }

        let mut tc_vec: Vec<Tc> = vec![];

        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s >= current_time_s {
                break;
            }
            if let Some(cmd) = self.cmds.pop_front() {
                tc_vec.push(cmd.tc);
            }
        }

        if tc_vec.is_empty() {
            PendingTcs::None
        }
        else {
            PendingTcs::Some(tc_vec)
        }
    }

    /// Get the number of TCs remaining in the script
    pub fn get_num_tcs(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        self.cmds.back().map(|c| c.exec_time_s).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
        // Drive forwards then stop
        0.5: {"type": "base_twist", "lin_x_ms": 0.2, "lin_y_ms": 0.0, "ang_z_rads": 0.0};
        4.0: {"type": "stop"};
        1.0: {"type": "follow_path", "waypoints": [[1.0, 0.0, 0.0]]};
    "#;

    #[test]
    fn test_script_playback() {
        let mut si = ScriptInterpreter::from_script(SCRIPT).unwrap();
        assert_eq!(si.get_num_tcs(), 3);
        assert_eq!(si.get_duration(), 4.0);

        assert!(matches!(si.get_pending_tcs_at(0.1), PendingTcs::None));

        match si.get_pending_tcs_at(1.5) {
            PendingTcs::Some(tcs) => {
                assert_eq!(tcs.len(), 2);
                assert!(matches!(tcs[0], Tc::BaseTwist(_)));
                assert!(matches!(tcs[1], Tc::FollowPath(_)));
            }
            p => panic!("Expected pending TCs, got {:?}", p),
        }

        match si.get_pending_tcs_at(5.0) {
            PendingTcs::Some(tcs) => assert_eq!(tcs, vec![Tc::Stop]),
            p => panic!("Expected pending TCs, got {:?}", p),
        }

        assert!(matches!(si.get_pending_tcs_at(6.0), PendingTcs::EndOfScript));
    }

    #[test]
    fn test_empty_script() {
        assert!(matches!(
            ScriptInterpreter::from_script("// nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
    }

    #[test]
    fn test_invalid_tc() {
        assert!(matches!(
            ScriptInterpreter::from_script(r#"1.0: {"type": "jump"};"#),
            Err(ScriptError::InvalidTc(t, _)) if t == 1.0
        ));
    }
}
