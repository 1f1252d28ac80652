//! Small numeric helpers shared by sampling and tiling code.

/// Splits a continuous coordinate into its floor index and fractional part.
///
/// Callers rely on this being computed from the global coordinate so that a
/// tile buffer and a full image agree on every interpolation weight.
#[inline]
pub(crate) fn split_coord(c: f64) -> (isize, f64) {
    let f = c.floor();
    (f as isize, c - f)
}

/// Rounds `value / step` up, with `step >= 1`.
#[inline]
pub(crate) fn div_ceil(value: usize, step: usize) -> usize {
    value.div_ceil(step)
}

/// Returns the largest absolute value of the two components.
#[inline]
pub(crate) fn max_abs(v: [f64; 2]) -> f64 {
    v[0].abs().max(v[1].abs())
}

#[cfg(test)]
mod tests {
    use super::{div_ceil, max_abs, split_coord};

    #[test]
    fn split_coord_handles_negative_values() {
        let (i, f) = split_coord(-0.25);
        assert_eq!(i, -1);
        assert!((f - 0.75).abs() < 1e-12);

        let (i, f) = split_coord(3.0);
        assert_eq!(i, 3);
        assert_eq!(f, 0.0);
    }

    #[test]
    fn div_ceil_rounds_up() {
        assert_eq!(div_ceil(10, 3), 4);
        assert_eq!(div_ceil(9, 3), 3);
        assert_eq!(div_ceil(1, 1), 1);
    }

    #[test]
    fn max_abs_ignores_sign() {
        assert_eq!(max_abs([0.5, -2.0]), 2.0);
    }
}
