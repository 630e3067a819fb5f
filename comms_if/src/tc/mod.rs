//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications
//! interface.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod base_ctrl;
pub mod traj_ctrl;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use base_ctrl::BodyTwist;
use traj_ctrl::PathCmd;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the base by a command source.
///
/// Telecommands are serialised as JSON objects tagged by `type`, for example
/// `{"type": "base_twist", "lin_x_ms": 0.2, "lin_y_ms": 0.0, "ang_z_rads": 0.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tc {
    /// Command the base to move with the given body twist.
    BaseTwist(BodyTwist),

    /// Command the base to follow the given path.
    FollowPath(PathCmd),

    /// Command the base to stop, equivalent to a zero twist.
    Stop,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_twist() {
        let tc = Tc::from_json(
            r#"{"type": "base_twist", "lin_x_ms": 0.2, "lin_y_ms": -0.1, "ang_z_rads": 0.5}"#,
        )
        .unwrap();

        assert_eq!(tc, Tc::BaseTwist(BodyTwist::new(0.2, -0.1, 0.5)));
    }

    #[test]
    fn test_parse_path() {
        let tc = Tc::from_json(
            r#"{"type": "follow_path", "waypoints": [[1.0, 0.0, 0.0], [1.0, 1.0, 1.57]]}"#,
        )
        .unwrap();

        match tc {
            Tc::FollowPath(p) => assert_eq!(p.waypoints.len(), 2),
            t => panic!("Expected a path command, got {:?}", t),
        }
    }

    #[test]
    fn test_parse_stop() {
        assert_eq!(Tc::from_json(r#"{"type": "stop"}"#).unwrap(), Tc::Stop);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Tc::from_json(r#"{"type": "fly"}"#).is_err());
        assert!(Tc::from_json("not json").is_err());
    }
}
