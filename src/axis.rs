// SPDX: CC0-1.0

use crate::Number;

/// Minimum canvas distance between labelled graduations, in pixels.
pub const MIN_SPACING: Number = 50.0;

/// Smallest unit is `2^MIN_EXPONENT`.
pub const MIN_EXPONENT: Number = -3.0;

/// Logical distance between labelled graduations at the given scale.
///
/// The unit is a power of two chosen so that `scale * unit` falls in
/// `MIN_SPACING..2 * MIN_SPACING`; every doubling of the scale halves the
/// unit.
///
/// | scale   | unit | scale * unit |
/// |---------|------|--------------|
/// | 25..50  | 2    | 50..100      |
/// | 50..100 | 1    | 50..100      |
/// | 100..200| 0.5  | 50..100      |
pub fn unit_from_scale(scale: Number) -> Number {
    let exp = -(scale / MIN_SPACING).log2().floor();
    Number::powf(2.0, exp.max(MIN_EXPONENT))
}

/// Non-zero multiples of `unit` within `min..=max`, in increasing order.
pub fn graduations(unit: Number, min: Number, max: Number) -> Vec<Number> {
    if !(unit > 0.0) || !(min <= max) || !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    let first = (min / unit).ceil() as i64;
    let last = (max / unit).floor() as i64;
    (first..=last)
        .filter(|&i| i != 0)
        .map(|i| i as Number * unit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_keeps_spacing_in_range() {
        assert_eq!(unit_from_scale(50.0), 1.0);
        assert_eq!(unit_from_scale(99.0), 1.0);
        assert_eq!(unit_from_scale(100.0), 0.5);
        assert_eq!(unit_from_scale(30.0), 2.0);
        assert_eq!(unit_from_scale(5.0), 16.0);
        for scale in [3.0, 17.5, 64.0, 150.0, 333.0] {
            let spacing = scale * unit_from_scale(scale);
            assert!((MIN_SPACING..2.0 * MIN_SPACING).contains(&spacing), "{scale}");
        }
    }

    #[test]
    fn unit_is_limited_when_zoomed_in() {
        assert_eq!(unit_from_scale(400.0), 0.125);
        assert_eq!(unit_from_scale(100_000.0), 0.125);
    }

    #[test]
    fn graduations_skip_origin() {
        assert_eq!(graduations(1.0, -2.5, 2.0), vec![-2.0, -1.0, 1.0, 2.0]);
        assert_eq!(graduations(0.5, 0.2, 1.2), vec![0.5, 1.0]);
        assert!(graduations(1.0, 0.1, 0.9).is_empty());
        assert!(graduations(0.0, -1.0, 1.0).is_empty());
        assert!(graduations(1.0, 1.0, -1.0).is_empty());
    }
}
