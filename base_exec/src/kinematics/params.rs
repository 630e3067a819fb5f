//! Robot description used to build the kinematic model of the base

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Static description of the base geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseDescription {

    // ---- WHEELS ----

    /// Nominal radius of every wheel.
    ///
    /// Units: meters
    pub wheel_radius_m: f64,

    /// Calibration correction applied to the nominal wheel radius.
    pub wheel_radius_multiplier: f64,

    // ---- CASTERS ----

    /// Casters mounted on the base, each carrying one or more wheels.
    pub casters: Vec<CasterDescription>,
}

/// A caster pivot and the wheels it carries.
#[derive(Debug, Clone, Deserialize)]
pub struct CasterDescription {
    /// Short name of the caster, e.g. `fl_caster`
    pub name: String,

    /// Name of the caster's steering joint in the hardware abstraction.
    pub joint: String,

    /// Position of the caster pivot.
    ///
    /// Units: meters,
    /// Frame: Base body
    pub offset_m: [f64; 2],

    pub wheels: Vec<WheelDescription>,
}

/// A wheel mounted on a caster.
#[derive(Debug, Clone, Deserialize)]
pub struct WheelDescription {
    /// Name of the wheel's drive joint in the hardware abstraction.
    pub joint: String,

    /// Position of the wheel contact point relative to the caster pivot, at
    /// zero steering angle.
    ///
    /// Units: meters,
    /// Frame: Caster
    pub offset_m: [f64; 2],

    /// Per-wheel correction of the effective radius.
    #[serde(default = "default_scaler")]
    pub radius_scaler: f64,

    /// Mounting orientation of the wheel, `1.0` or `-1.0`.
    #[serde(default = "default_scaler")]
    pub direction_multiplier: f64,
}

fn default_scaler() -> f64 {
    1.0
}
