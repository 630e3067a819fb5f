//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Normalise an angle into the range `(-pi, pi]`.
pub fn normalize_angle<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let norm = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // rem_euclid gives [-pi, pi), fold the lower bound onto pi
    if norm <= -pi_t {
        pi_t
    }
    else {
        norm
    }
}

/// Get the signed shortest angular distance going from `from` to `to`.
///
/// The result is in `(-pi, pi]` and satisfies
/// `normalize_angle(from + result) == normalize_angle(to)`.
pub fn shortest_angular_distance<T>(from: T, to: T) -> T
where
    T: Float,
{
    normalize_angle(to - from)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    }
    else {
        r
    }
}
