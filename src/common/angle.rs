//! Angle helpers
//!
//! Particle headings are accumulated without wrapping, so anything that
//! compares or averages headings goes through these functions instead of
//! raw subtraction.

use std::f64::consts::{PI, TAU};

/// Wrap an angle to (-pi, pi]
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

/// Signed shortest rotation from `b` to `a`, in (-pi, pi]
pub fn angle_diff(a: f64, b: f64) -> f64 {
    normalize_angle(a - b)
}

/// Weighted circular mean of `(angle, weight)` pairs, in (-pi, pi]
///
/// Returns 0 when the weighted unit vectors cancel out.
pub fn weighted_circular_mean<I>(samples: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (sin_sum, cos_sum) = samples
        .into_iter()
        .fold((0.0, 0.0), |(s, c), (angle, w)| (s + w * angle.sin(), c + w * angle.cos()));
    normalize_angle(sin_sum.atan2(cos_sum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_angle_range() {
        for k in -10..=10 {
            let a = normalize_angle(0.3 + k as f64 * TAU);
            assert_relative_eq!(a, 0.3, epsilon = 1e-9);
        }
        assert_relative_eq!(normalize_angle(PI), PI);
        assert_relative_eq!(normalize_angle(-PI), PI);
        assert!(normalize_angle(4.0) < 0.0);
    }

    #[test]
    fn test_angle_diff_across_wrap() {
        let d = angle_diff(-PI + 0.1, PI - 0.1);
        assert_relative_eq!(d, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_circular_mean_near_pi() {
        // naive averaging of these would give ~0
        let mean = weighted_circular_mean(vec![(PI - 0.1, 0.5), (-PI + 0.1, 0.5)]);
        assert_relative_eq!(mean.abs(), PI, epsilon = 1e-9);
    }

    #[test]
    fn test_circular_mean_weighted() {
        let mean = weighted_circular_mean(vec![(0.0, 1.0), (1.0, 0.0)]);
        assert_relative_eq!(mean, 0.0, epsilon = 1e-12);

        let mean = weighted_circular_mean(vec![(0.2, 0.5), (0.4, 0.5)]);
        assert_relative_eq!(mean, 0.3, epsilon = 1e-9);
    }
}
