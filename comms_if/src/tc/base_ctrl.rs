//! # Base control telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The commanded planar velocity of the base.
///
/// All quantities are expressed in the base body frame, which follows the
/// right hand rule with X+ forwards, Y+ to the left and Z+ upwards.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize, StructOpt)]
pub struct BodyTwist {
    /// Linear velocity along the body X axis.
    ///
    /// Units: meters/second
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    pub lin_x_ms: f64,

    /// Linear velocity along the body Y axis.
    ///
    /// Units: meters/second
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    pub lin_y_ms: f64,

    /// Angular velocity about the body Z axis.
    ///
    /// Units: radians/second
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    pub ang_z_rads: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BodyTwist {
    /// Create a new twist from its components.
    pub fn new(lin_x_ms: f64, lin_y_ms: f64, ang_z_rads: f64) -> Self {
        Self {
            lin_x_ms,
            lin_y_ms,
            ang_z_rads,
        }
    }

    /// The zero twist, i.e. stand still.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Magnitude of the translational part of the twist.
    ///
    /// Units: meters/second
    pub fn lin_speed_ms(&self) -> f64 {
        self.lin_x_ms.hypot(self.lin_y_ms)
    }

    /// The twist as an `[x, y, z]` array, used for per-axis processing.
    pub fn to_array(&self) -> [f64; 3] {
        [self.lin_x_ms, self.lin_y_ms, self.ang_z_rads]
    }

    /// Build a twist from an `[x, y, z]` array.
    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}
