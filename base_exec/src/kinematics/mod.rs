//! # Base kinematics
//!
//! Geometry of the holonomic base together with the per-cycle state of each
//! caster and wheel. The model is built once from a [`BaseDescription`] and
//! is only ever mutated by the base controller's cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::base_ctrl::BodyTwist;
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;

use crate::hardware::{Hardware, JointId};

pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic model of the base.
#[derive(Debug, Clone, Serialize)]
pub struct BaseKinematics {
    pub casters: Vec<Caster>,

    pub wheels: Vec<Wheel>,

    /// Effective wheel radius, the nominal radius with the calibration
    /// multiplier applied.
    ///
    /// Units: meters
    pub wheel_radius_m: f64,
}

/// A caster and its per-cycle state.
#[derive(Debug, Clone, Serialize)]
pub struct Caster {
    pub name: String,

    /// Name of the steering joint.
    pub joint_name: String,

    pub joint: JointId,

    /// Position of the pivot.
    ///
    /// Units: meters,
    /// Frame: Base body
    pub offset_m: Vector2<f64>,

    /// Indexes into `BaseKinematics::wheels` of the wheels on this caster.
    pub wheels: Vec<usize>,

    /// Steering angle the caster is being driven to.
    ///
    /// Units: radians
    pub steer_angle_desired_rad: f64,

    /// Last steering angle computed from a non-zero command, reused while
    /// the base is commanded to stand still.
    ///
    /// Units: radians
    pub steer_angle_stored_rad: f64,

    /// Units: radians/second
    pub steer_velocity_desired_rads: f64,

    /// Units: radians
    pub steer_position_error_rad: f64,

    /// Units: radians/second
    pub speed_rads: f64,

    /// Units: radians/second
    pub speed_filtered_rads: f64,

    /// Units: radians/second
    pub speed_error_rads: f64,

    pub stuck: bool,
}

/// A wheel and its per-cycle state.
#[derive(Debug, Clone, Serialize)]
pub struct Wheel {
    pub joint_name: String,

    pub joint: JointId,

    /// Index into `BaseKinematics::casters` of the parent caster.
    pub caster: usize,

    /// Offset of the contact point from the caster pivot.
    ///
    /// Units: meters,
    /// Frame: Caster
    pub offset_m: Vector2<f64>,

    /// Current position of the contact point, updated each cycle from the
    /// measured caster angle.
    ///
    /// Units: meters,
    /// Frame: Base body
    pub position_m: Vector2<f64>,

    pub radius_scaler: f64,

    pub direction_multiplier: f64,

    /// Desired wheel speed, before the direction multiplier is applied.
    ///
    /// Units: radians/second
    pub speed_cmd_rads: f64,

    /// Units: radians/second
    pub speed_actual_rads: f64,

    /// Units: radians/second
    pub speed_filtered_rads: f64,

    /// Units: radians/second
    pub speed_error_rads: f64,

    pub stuck: bool,
}

/// Errors in the base description.
#[derive(Debug, thiserror::Error)]
pub enum KinematicsError {
    #[error("The base description contains no casters")]
    NoCasters,

    #[error("Caster {0} has no wheels")]
    NoWheels(String),

    #[error("Joint {0} was not found in the hardware abstraction")]
    UnknownJoint(String),

    #[error("The effective wheel radius must be positive and finite, got {0} m")]
    InvalidWheelRadius(f64),

    #[error("Wheel {0} has an invalid radius scaler or direction multiplier")]
    InvalidWheel(String),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Velocity of a point fixed to the base, given the base twist.
///
/// `v_point = v_body + w x r` where `r` is the point's offset from the body
/// origin.
pub fn point_velocity_2d(offset_m: &Vector2<f64>, twist: &BodyTwist) -> Vector2<f64> {
    Vector2::new(
        twist.lin_x_ms - offset_m.y * twist.ang_z_rads,
        twist.lin_y_ms + offset_m.x * twist.ang_z_rads,
    )
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BaseKinematics {
    /// Build the model, resolving every joint against the hardware.
    pub fn new<H: Hardware>(desc: &BaseDescription, hw: &H) -> Result<Self, KinematicsError> {
        let wheel_radius_m = desc.wheel_radius_m * desc.wheel_radius_multiplier;
        if !(wheel_radius_m.is_finite() && wheel_radius_m > 0.0) {
            return Err(KinematicsError::InvalidWheelRadius(wheel_radius_m));
        }

        if desc.casters.is_empty() {
            return Err(KinematicsError::NoCasters);
        }

        let find = |name: &str| {
            hw.find_joint(name)
                .ok_or_else(|| KinematicsError::UnknownJoint(name.to_string()))
        };

        let mut casters = Vec::with_capacity(desc.casters.len());
        let mut wheels = Vec::new();

        for (caster_idx, c) in desc.casters.iter().enumerate() {
            if c.wheels.is_empty() {
                return Err(KinematicsError::NoWheels(c.name.clone()));
            }

            let offset_m = Vector2::new(c.offset_m[0], c.offset_m[1]);
            let mut wheel_idxs = Vec::with_capacity(c.wheels.len());

            for w in c.wheels.iter() {
                let scaler_ok = w.radius_scaler.is_finite() && w.radius_scaler > 0.0;
                let dir_ok = w.direction_multiplier == 1.0 || w.direction_multiplier == -1.0;
                if !(scaler_ok && dir_ok) {
                    return Err(KinematicsError::InvalidWheel(w.joint.clone()));
                }

                let wheel_offset_m = Vector2::new(w.offset_m[0], w.offset_m[1]);

                wheel_idxs.push(wheels.len());
                wheels.push(Wheel {
                    joint_name: w.joint.clone(),
                    joint: find(&w.joint)?,
                    caster: caster_idx,
                    offset_m: wheel_offset_m,
                    position_m: offset_m + wheel_offset_m,
                    radius_scaler: w.radius_scaler,
                    direction_multiplier: w.direction_multiplier,
                    speed_cmd_rads: 0.0,
                    speed_actual_rads: 0.0,
                    speed_filtered_rads: 0.0,
                    speed_error_rads: 0.0,
                    stuck: false,
                });
            }

            casters.push(Caster {
                name: c.name.clone(),
                joint_name: c.joint.clone(),
                joint: find(&c.joint)?,
                offset_m,
                wheels: wheel_idxs,
                steer_angle_desired_rad: 0.0,
                steer_angle_stored_rad: 0.0,
                steer_velocity_desired_rads: 0.0,
                steer_position_error_rad: 0.0,
                speed_rads: 0.0,
                speed_filtered_rads: 0.0,
                speed_error_rads: 0.0,
                stuck: false,
            });
        }

        Ok(Self {
            casters,
            wheels,
            wheel_radius_m,
        })
    }

    /// Recompute the body frame position of every wheel from its caster's
    /// measured steering angle.
    pub fn update_wheel_positions<H: Hardware>(&mut self, hw: &H) {
        for wheel in self.wheels.iter_mut() {
            let caster = &self.casters[wheel.caster];
            let angle = hw.joint(caster.joint).position_rad;

            wheel.position_m = caster.offset_m + Rotation2::new(angle) * wheel.offset_m;
        }
    }

    /// Find a caster by its name.
    pub fn caster_by_name(&self, name: &str) -> Option<&Caster> {
        self.casters.iter().find(|c| c.name == name)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{SimHardware, SimJointParams};

    const SIM: SimJointParams = SimJointParams {
        inertia: 0.1,
        damping: 1.0,
        max_effort: 10.0,
    };

    fn desc() -> BaseDescription {
        util::params::parse(
            r#"
            wheel_radius_m = 0.08
            wheel_radius_multiplier = 0.5

            [[casters]]
            name = "fl_caster"
            joint = "fl_caster_joint"
            offset_m = [0.2, 0.3]

                [[casters.wheels]]
                joint = "fl_l_wheel_joint"
                offset_m = [0.0, 0.05]

                [[casters.wheels]]
                joint = "fl_r_wheel_joint"
                offset_m = [0.0, -0.05]
                direction_multiplier = -1.0
            "#,
        )
        .unwrap()
    }

    fn hw() -> SimHardware {
        let mut hw = SimHardware::new();
        for name in &["fl_caster_joint", "fl_l_wheel_joint", "fl_r_wheel_joint"] {
            hw.add_joint(name, SIM, true);
        }
        hw
    }

    #[test]
    fn test_point_velocity_2d() {
        let twist = BodyTwist::new(0.3, -0.2, 0.5);

        // Zero offset reduces to the linear part
        let v = point_velocity_2d(&Vector2::zeros(), &twist);
        assert_eq!(v, Vector2::new(0.3, -0.2));

        // Pure rotation gives only the tangential term
        let v = point_velocity_2d(&Vector2::new(1.0, 0.0), &BodyTwist::new(0.0, 0.0, 2.0));
        assert_eq!(v, Vector2::new(0.0, 2.0));
        let v = point_velocity_2d(&Vector2::new(0.0, 1.0), &BodyTwist::new(0.0, 0.0, 2.0));
        assert_eq!(v, Vector2::new(-2.0, 0.0));
    }

    #[test]
    fn test_build_and_wheel_positions() {
        let mut hw = hw();
        let mut kin = BaseKinematics::new(&desc(), &hw).unwrap();

        assert_eq!(kin.casters.len(), 1);
        assert_eq!(kin.wheels.len(), 2);
        assert!((kin.wheel_radius_m - 0.04).abs() < 1e-12);
        assert_eq!(kin.wheels[1].direction_multiplier, -1.0);
        assert_eq!(kin.caster_by_name("fl_caster").unwrap().wheels, vec![0, 1]);

        // Rotate the caster a quarter turn, the left wheel swings behind it
        hw.set_position(kin.casters[0].joint, std::f64::consts::FRAC_PI_2);
        kin.update_wheel_positions(&hw);
        let p = kin.wheels[0].position_m;
        assert!((p.x - 0.15).abs() < 1e-12);
        assert!((p.y - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_joint() {
        let mut hw = SimHardware::new();
        hw.add_joint("fl_caster_joint", SIM, true);

        match BaseKinematics::new(&desc(), &hw) {
            Err(KinematicsError::UnknownJoint(name)) => assert_eq!(name, "fl_l_wheel_joint"),
            r => panic!("Expected an unknown joint error, got {:?}", r),
        }
    }

    #[test]
    fn test_invalid_description() {
        let mut d = desc();
        d.wheel_radius_multiplier = 0.0;
        assert!(matches!(
            BaseKinematics::new(&d, &hw()),
            Err(KinematicsError::InvalidWheelRadius(_))
        ));

        let mut d = desc();
        d.casters[0].wheels[0].direction_multiplier = 0.5;
        assert!(matches!(
            BaseKinematics::new(&d, &hw()),
            Err(KinematicsError::InvalidWheel(_))
        ));

        let mut d = desc();
        d.casters.clear();
        assert!(matches!(BaseKinematics::new(&d, &hw()), Err(KinematicsError::NoCasters)));
    }
}
