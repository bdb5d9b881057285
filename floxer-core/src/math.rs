//! A couple of numeric helpers, ported from the original aligner's
//! `math.hpp`.

/// Error tolerance used when rounding a floating-point computation up
/// to the nearest integer. A multiplication like `query_len as f64 *
/// error_rate` can land a hair above its true integer value due to
/// floating-point representation error (`500.0 * 0.01` is
/// `5.000000000000001`, not `5.0`), which `f64::ceil` would then round
/// up one too far. Subtracting this epsilon before rounding recovers
/// the intended integer at those boundaries without affecting values
/// that aren't near one. Matches the epsilon already used for
/// interval-containment comparisons in `intervals.rs`.
pub(crate) const EPSILON: f64 = 0.000_000_001;

/// `ceil(x)`, tolerant of floating-point error right at an integer
/// boundary (see [`EPSILON`]).
pub(crate) fn epsilon_aware_ceil(x: f64) -> usize {
    (x - EPSILON).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_integer_stays_put() {
        assert_eq!(epsilon_aware_ceil(3.0), 3);
    }

    #[test]
    fn fp_boundary_values_round_to_the_intended_integer() {
        assert_eq!(epsilon_aware_ceil(500.0 * 0.01), 5);
        assert_eq!(epsilon_aware_ceil(100.0 * 0.07), 7);
    }

    #[test]
    fn non_boundary_values_still_round_up() {
        assert_eq!(epsilon_aware_ceil(123.456), 124);
    }
}
