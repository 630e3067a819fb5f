//! # Telecommand processor module
//!
//! The telecommand processor handles TCs coming from any source by handing
//! them to the controller that executes them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use base_lib::cmd_slot::CmdSlot;
use comms_if::tc::{base_ctrl::BodyTwist, traj_ctrl::PathCmd, Tc};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The command inputs of the controllers.
#[derive(Clone, Default)]
pub(crate) struct CmdSinks {
    /// Base control command slot
    pub base: CmdSlot<BodyTwist>,

    /// Trajectory control path slot
    pub path: CmdSlot<PathCmd>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
pub(crate) fn exec(sinks: &CmdSinks, tc: &Tc) {

    match tc {
        Tc::BaseTwist(t) => {
            debug!("Received BaseTwist command: {:?}", t);
            sinks.base.set(*t)
        },
        Tc::FollowPath(p) => {
            debug!("Received FollowPath command with {} waypoints", p.waypoints.len());
            sinks.path.set(p.clone())
        },
        Tc::Stop => {
            debug!("Received Stop command");
            sinks.base.set(BodyTwist::zero())
        }
    }

}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use base_lib::cmd_slot::TryTake;

    #[test]
    fn test_tcs_reach_their_controller() {
        let sinks = CmdSinks::default();

        exec(&sinks, &Tc::BaseTwist(BodyTwist::new(0.1, 0.0, 0.0)));
        exec(&sinks, &Tc::Stop);
        assert!(matches!(sinks.base.try_take(), TryTake::Taken(t) if t == BodyTwist::zero()));

        exec(&sinks, &Tc::FollowPath(PathCmd { waypoints: vec![vec![1.0, 0.0, 0.0]] }));
        assert!(matches!(sinks.path.try_take(), TryTake::Taken(p) if p.waypoints.len() == 1));
        assert!(matches!(sinks.base.try_take(), TryTake::Empty));
    }
}
