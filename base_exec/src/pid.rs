//! # PID controller
//!
//! A bounded PID controller used for every caster and wheel joint and for
//! each axis of the trajectory follower.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains and output bound of a PID controller.
///
/// There are no defaults, every field must be given in the parameter file.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Largest absolute output of the controller. The integral term is also
    /// held within this bound.
    pub output_limit: f64,
}

/// A PID controller with anti-windup clamping of the integral.
#[derive(Debug, Clone, Serialize)]
pub struct PidController {
    gains: PidGains,

    /// The integral accumulation
    integral: f64,

    /// Error passed into the last update
    last_error: f64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PidGainsError {
    #[error("All gains must be finite and non-negative: {0:?}")]
    InvalidGain(PidGains),

    #[error("The output limit must be finite and positive, got {0}")]
    InvalidOutputLimit(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidGains {
    pub fn validate(&self) -> Result<(), PidGainsError> {
        let gain_ok = |g: f64| g.is_finite() && g >= 0.0;

        if !(gain_ok(self.k_p) && gain_ok(self.k_i) && gain_ok(self.k_d)) {
            return Err(PidGainsError::InvalidGain(*self));
        }

        if !(self.output_limit.is_finite() && self.output_limit > 0.0) {
            return Err(PidGainsError::InvalidOutputLimit(self.output_limit));
        }

        Ok(())
    }
}

impl PidController {

    /// Create a new controller with the given gains.
    ///
    /// The gains should have been validated with `PidGains::validate`.
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            last_error: 0.0,
        }
    }

    /// Clear the integral and the remembered error.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }

    /// Get the output of the controller for the given error.
    ///
    /// If `dt_s` is not positive the integral does not accumulate and the
    /// derivative term is skipped, the error is still remembered for the
    /// next call.
    pub fn update(&mut self, error: f64, dt_s: f64) -> f64 {
        let limit = self.gains.output_limit;

        let mut deriv = 0.0;

        if dt_s > 0.0 {
            self.integral += error * dt_s;
            deriv = (error - self.last_error) / dt_s;
        }

        // Anti-windup, keep |k_i * integral| within the output limit
        if self.gains.k_i > 0.0 {
            let max_integral = limit / self.gains.k_i;
            self.integral = self.integral.max(-max_integral).min(max_integral);
        }
        else {
            self.integral = 0.0;
        }

        self.last_error = error;

        let out = self.gains.k_p * error
            + self.gains.k_i * self.integral
            + self.gains.k_d * deriv;

        out.max(-limit).min(limit)
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_error(&self) -> f64 {
        self.last_error
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gains(k_p: f64, k_i: f64, k_d: f64, output_limit: f64) -> PidGains {
        PidGains {
            k_p,
            k_i,
            k_d,
            output_limit,
        }
    }

    #[test]
    fn test_proportional_and_bound() {
        let mut pid = PidController::new(gains(2.0, 0.0, 0.0, 5.0));

        assert_eq!(pid.update(1.0, 0.01), 2.0);
        assert_eq!(pid.update(-1.5, 0.01), -3.0);
        assert_eq!(pid.update(10.0, 0.01), 5.0);
        assert_eq!(pid.update(-10.0, 0.01), -5.0);
    }

    #[test]
    fn test_integral_windup_is_bounded() {
        let g = gains(0.0, 4.0, 0.0, 2.0);
        let mut pid = PidController::new(g);

        // Saturate positively, then negatively, with varying steps
        for i in 0..1000 {
            pid.update(3.0, 0.001 * (i % 7) as f64);
            assert!((g.k_i * pid.integral()).abs() <= g.output_limit + 1e-12);
        }
        assert!((pid.integral() - 0.5).abs() < 1e-12);

        for _ in 0..1000 {
            pid.update(-100.0, 0.05);
            assert!((g.k_i * pid.integral()).abs() <= g.output_limit + 1e-12);
        }
        assert!((pid.integral() + 0.5).abs() < 1e-12);

        // Recovery is immediate since the integral never wound past the bound
        let out = pid.update(1.0, 0.25);
        assert!((out - (4.0 * (-0.5 + 0.25))).abs() < 1e-12);
    }

    #[test]
    fn test_derivative_and_degenerate_dt() {
        let mut pid = PidController::new(gains(0.0, 1.0, 0.5, 100.0));

        // First call differentiates against a zero error
        assert!((pid.update(1.0, 0.1) - (0.1 + 5.0)).abs() < 1e-12);

        // dt of zero: no integral, no derivative, error still remembered
        let out = pid.update(3.0, 0.0);
        assert!((out - 0.1).abs() < 1e-12);
        assert_eq!(pid.last_error(), 3.0);

        // Negative dt is treated the same way
        let out = pid.update(4.0, -0.1);
        assert!((out - 0.1).abs() < 1e-12);
        assert_eq!(pid.last_error(), 4.0);

        // Derivative is taken against the remembered error
        let out = pid.update(4.0, 0.1);
        assert!((out - 0.5).abs() < 1e-12);

        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.last_error(), 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(gains(1.0, 0.0, 0.0, 1.0).validate().is_ok());
        assert!(gains(-1.0, 0.0, 0.0, 1.0).validate().is_err());
        assert!(gains(1.0, f64::NAN, 0.0, 1.0).validate().is_err());
        assert_eq!(
            gains(1.0, 0.0, 0.0, 0.0).validate(),
            Err(PidGainsError::InvalidOutputLimit(0.0))
        );
    }
}
