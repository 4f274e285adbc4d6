//! Fixtures shared by the workspace's tests: scratch directories, synthetic
//! compressed segment artifacts, and a coarse test disk with known points.

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Assert two numbers differ by at most `epsilon`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: {} and {} differ by {} (epsilon {})",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality of an optional value, where `None` only equals `None`.
///
/// ```ignore
/// use test_utils::assert_value_approx_eq;
///
/// assert_value_approx_eq!(Some(26.85), Some(26.850001), 1e-4);
/// assert_value_approx_eq!(None::<f64>, None, 1e-4);
/// ```
#[macro_export]
macro_rules! assert_value_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        match ($left, $right) {
            (Some(l), Some(r)) => $crate::assert_approx_eq!(l, r, $epsilon),
            (None, None) => {}
            (l, r) => panic!(
                "assertion failed: values differ in presence\n  left: `{:?}`,\n right: `{:?}`",
                l, r
            ),
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(300.0001_f32, 300.0, 0.001);
        assert_approx_eq!(-26.85, -26.850001, 1e-4);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_value_approx_eq_passes() {
        assert_value_approx_eq!(Some(26.85), Some(26.850001), 1e-4);
        assert_value_approx_eq!(None::<f64>, None::<f64>, 1e-4);
    }

    #[test]
    #[should_panic(expected = "presence")]
    fn test_assert_value_approx_eq_presence() {
        assert_value_approx_eq!(Some(1.0), None::<f64>, 1e-4);
    }
}
