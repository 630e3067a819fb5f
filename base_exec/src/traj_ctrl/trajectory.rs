//! # Trajectory
//!
//! A timed sequence of `[x, y, yaw]` waypoints. Segment durations are computed
//! from per-axis rate limits, so the slowest axis of each segment sets its
//! duration and all axes arrive together.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::{normalize_angle, shortest_angular_distance};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of axes in a trajectory point.
pub const NUM_AXES: usize = 3;

/// Index of the yaw axis, which wraps around at +/- pi.
pub const YAW_AXIS: usize = 2;

/// Peak velocity of a cubic segment relative to its mean velocity.
const CUBIC_PEAK_VEL_RATIO: f64 = 1.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Interpolation between two waypoints.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Constant velocity along each segment.
    Linear,

    /// Cubic with zero velocity at each waypoint.
    Cubic,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    interpolation: Interpolation,

    /// Waypoints
    points: Vec<[f64; NUM_AXES]>,

    /// Time at which each waypoint is reached, starting at zero.
    ///
    /// Units: seconds
    times_s: Vec<f64>,
}

/// Position and velocity sampled from a trajectory.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TrajSample {
    pub pose: [f64; NUM_AXES],

    pub vel: [f64; NUM_AXES],
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrajectoryError {
    #[error("A trajectory needs at least one waypoint")]
    NoWaypoints,

    #[error("Waypoint {0} is not finite")]
    NonFiniteWaypoint(usize),

    #[error("The rate limit of axis {0} must be finite and positive, got {1}")]
    InvalidRate(usize, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {

    /// Build a trajectory through `points`, timed so that no axis exceeds its
    /// rate in `max_rates`.
    pub fn new(
        points: Vec<[f64; NUM_AXES]>,
        max_rates: &[f64; NUM_AXES],
        interpolation: Interpolation,
    ) -> Result<Self, TrajectoryError> {
        if points.is_empty() {
            return Err(TrajectoryError::NoWaypoints);
        }

        for (i, &rate) in max_rates.iter().enumerate() {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(TrajectoryError::InvalidRate(i, rate));
            }
        }

        if let Some(i) = points.iter().position(|p| p.iter().any(|q| !q.is_finite())) {
            return Err(TrajectoryError::NonFiniteWaypoint(i));
        }

        let mut times_s = Vec::with_capacity(points.len());
        times_s.push(0.0);

        for pair in points.windows(2) {
            let diff = axis_diff(&pair[0], &pair[1]);

            let mut duration_s: f64 = 0.0;
            for i in 0..NUM_AXES {
                duration_s = duration_s.max(diff[i].abs() / max_rates[i]);
            }

            if interpolation == Interpolation::Cubic {
                duration_s *= CUBIC_PEAK_VEL_RATIO;
            }

            let last = times_s[times_s.len() - 1];
            times_s.push(last + duration_s);
        }

        Ok(Self {
            interpolation,
            points,
            times_s,
        })
    }

    /// Time taken to traverse the whole trajectory.
    ///
    /// Units: seconds
    pub fn total_time_s(&self) -> f64 {
        self.times_s[self.times_s.len() - 1]
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// The final waypoint.
    pub fn goal(&self) -> [f64; NUM_AXES] {
        self.points[self.points.len() - 1]
    }

    /// Sample the trajectory at `time_s` seconds from its start.
    ///
    /// Outside the trajectory's time range the first or last waypoint is
    /// returned with zero velocity.
    pub fn sample(&self, time_s: f64) -> TrajSample {
        if !(time_s >= 0.0) {
            return TrajSample {
                pose: self.points[0],
                vel: [0.0; NUM_AXES],
            };
        }

        let seg = match (0..self.points.len() - 1)
            .find(|&i| time_s >= self.times_s[i] && time_s < self.times_s[i + 1])
        {
            Some(s) => s,
            None => {
                return TrajSample {
                    pose: self.goal(),
                    vel: [0.0; NUM_AXES],
                }
            }
        };

        let start = &self.points[seg];
        let diff = axis_diff(start, &self.points[seg + 1]);
        let duration_s = self.times_s[seg + 1] - self.times_s[seg];
        let tau = (time_s - self.times_s[seg]) / duration_s;

        // Fraction of the segment covered, and its time derivative
        let (s, ds) = match self.interpolation {
            Interpolation::Linear => (tau, 1.0 / duration_s),
            Interpolation::Cubic => (
                3.0 * tau.powi(2) - 2.0 * tau.powi(3),
                (6.0 * tau - 6.0 * tau.powi(2)) / duration_s,
            ),
        };

        let mut sample = TrajSample {
            pose: [0.0; NUM_AXES],
            vel: [0.0; NUM_AXES],
        };
        for i in 0..NUM_AXES {
            sample.pose[i] = start[i] + diff[i] * s;
            sample.vel[i] = diff[i] * ds;
        }
        sample.pose[YAW_AXIS] = normalize_angle(sample.pose[YAW_AXIS]);

        sample
    }
}

/// Per-axis difference from `from` to `to`, taking the short way round on the
/// yaw axis.
fn axis_diff(from: &[f64; NUM_AXES], to: &[f64; NUM_AXES]) -> [f64; NUM_AXES] {
    let mut diff = [0.0; NUM_AXES];
    for i in 0..NUM_AXES {
        diff[i] = if i == YAW_AXIS {
            shortest_angular_distance(from[i], to[i])
        }
        else {
            to[i] - from[i]
        };
    }
    diff
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
