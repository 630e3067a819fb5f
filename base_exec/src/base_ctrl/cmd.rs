//! Command intake and rate limiting

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::base_ctrl::BodyTwist;

use super::{AxisLimits, Params};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Limit a newly received command to the base's velocity envelope.
///
/// The translational part keeps its direction and is scaled down to at most
/// the mean of the x and y velocity limits. A translation no larger than
/// `eps` is zeroed. The angular rate is clamped to its own limit.
pub fn limit_cmd(cmd: &BodyTwist, params: &Params) -> BodyTwist {
    let max_lin_ms = 0.5 * (params.max_vel.lin_x + params.max_vel.lin_y);
    let lin_ms = cmd.lin_speed_ms();

    let (lin_x_ms, lin_y_ms) = if lin_ms > params.eps && lin_ms.is_finite() {
        let scale = lin_ms.min(max_lin_ms) / lin_ms;
        (cmd.lin_x_ms * scale, cmd.lin_y_ms * scale)
    }
    else {
        (0.0, 0.0)
    };

    let ang_z_rads = if cmd.ang_z_rads.is_finite() {
        cmd.ang_z_rads
            .max(-params.max_vel.ang_z)
            .min(params.max_vel.ang_z)
    }
    else {
        0.0
    };

    BodyTwist::new(lin_x_ms, lin_y_ms, ang_z_rads)
}

/// Step `current` towards `target` without exceeding `max_accel` on any axis.
///
/// All axes are moved by the same fraction of their remaining difference,
/// the smallest fraction any single axis allows, so the twist keeps its
/// direction while it ramps.
pub fn interpolate_cmd(
    current: &BodyTwist,
    target: &BodyTwist,
    max_accel: &AxisLimits,
    dt_s: f64,
) -> BodyTwist {
    let current = current.to_array();
    let target = target.to_array();
    let max_accel = max_accel.to_array();

    let mut alpha: f64 = 1.0;

    for i in 0..3 {
        let delta = (target[i] - current[i]).abs();
        let max_delta = (max_accel[i] * dt_s).max(0.0);

        if delta > max_delta {
            alpha = alpha.min(max_delta / delta);
        }
    }

    if alpha >= 1.0 {
        return BodyTwist::from_array(target);
    }

    let mut next = [0f64; 3];
    for i in 0..3 {
        next[i] = current[i] + alpha * (target[i] - current[i]);
    }

    BodyTwist::from_array(next)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_ctrl::tests::test_params;

    const LIMITS: AxisLimits = AxisLimits {
        lin_x: 0.5,
        lin_y: 0.25,
        ang_z: 2.0,
    };

    #[test]
    fn test_limit_cmd() {
        let mut params = test_params();
        params.max_vel = AxisLimits {
            lin_x: 0.4,
            lin_y: 0.2,
            ang_z: 1.0,
        };
        params.eps = 1e-3;

        // Within the envelope nothing changes
        let c = limit_cmd(&BodyTwist::new(0.1, -0.1, 0.5), &params);
        assert_eq!(c, BodyTwist::new(0.1, -0.1, 0.5));

        // Translation scaled to the mean limit, direction kept
        let c = limit_cmd(&BodyTwist::new(3.0, 4.0, -5.0), &params);
        assert!((c.lin_x_ms - 0.18).abs() < 1e-12);
        assert!((c.lin_y_ms - 0.24).abs() < 1e-12);
        assert_eq!(c.ang_z_rads, -1.0);

        // Tiny translations are zeroed
        let c = limit_cmd(&BodyTwist::new(1e-3, 0.0, 0.0), &params);
        assert_eq!(c, BodyTwist::zero());

        let c = limit_cmd(&BodyTwist::new(f64::NAN, 0.0, f64::INFINITY), &params);
        assert_eq!(c, BodyTwist::zero());
    }

    #[test]
    fn test_interpolate_reaches_target() {
        let current = BodyTwist::new(0.1, 0.0, 0.0);
        let target = BodyTwist::new(0.11, 0.0, -0.01);

        assert_eq!(interpolate_cmd(&current, &target, &LIMITS, 0.1), target);
    }

    #[test]
    fn test_interpolate_is_coordinated() {
        let current = BodyTwist::zero();
        let target = BodyTwist::new(1.0, 1.0, 0.0);

        // x may move 0.05 but y only 0.025, both move by 0.025
        let next = interpolate_cmd(&current, &target, &LIMITS, 0.1);
        assert!((next.lin_x_ms - 0.025).abs() < 1e-12);
        assert!((next.lin_y_ms - 0.025).abs() < 1e-12);
        assert_eq!(next.ang_z_rads, 0.0);
    }

    #[test]
    fn test_interpolate_degenerate_limits() {
        let current = BodyTwist::new(0.2, 0.0, 0.0);
        let target = BodyTwist::new(0.0, 0.1, 0.0);

        // No time has passed, nothing may change
        assert_eq!(interpolate_cmd(&current, &target, &LIMITS, 0.0), current);
        assert_eq!(interpolate_cmd(&current, &target, &LIMITS, -1.0), current);

        // A zero limit on an axis that needs no change does not stall the rest
        let limits = AxisLimits {
            lin_x: 1.0,
            lin_y: 1.0,
            ang_z: 0.0,
        };
        assert_eq!(interpolate_cmd(&current, &target, &limits, 1.0), target);
    }

    #[test]
    fn test_interpolate_bound_property() {
        // Sweep a grid of twists and steps: no axis may exceed its bound and
        // whenever limiting happens some axis sits exactly on its bound.
        let values = [-1.3, -0.4, 0.0, 0.05, 0.7];
        let steps = [0.001, 0.01, 0.2];

        for &a in values.iter() {
            for &b in values.iter() {
                for &c in values.iter() {
                    for &dt in steps.iter() {
                        let current = BodyTwist::new(a, b, c);
                        let target = BodyTwist::new(c, a, b);
                        let next = interpolate_cmd(&current, &target, &LIMITS, dt);

                        let cur = current.to_array();
                        let tgt = target.to_array();
                        let nxt = next.to_array();
                        let lim = LIMITS.to_array();

                        let mut limited = false;
                        let mut on_bound = false;
                        for i in 0..3 {
                            let max_delta = lim[i] * dt;
                            let step = (nxt[i] - cur[i]).abs();
                            assert!(step <= max_delta + 1e-12);
                            if (tgt[i] - cur[i]).abs() > max_delta {
                                limited = true;
                            }
                            if (step - max_delta).abs() < 1e-12 {
                                on_bound = true;
                            }
                        }
                        if limited {
                            assert!(on_bound);
                        }
                    }
                }
            }
        }
    }
}
