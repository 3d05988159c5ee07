//! Assertion utilities for testing.
//!
//! This module provides helper functions for making assertions in tests,
//! particularly for floating-point comparisons.

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Assert that two floating-point values are approximately equal.
///
/// # Panics
///
/// Panics if the absolute difference between `actual` and `expected` is greater than `epsilon`.
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Assert that two sequences of optional values match element-wise.
///
/// `None` must line up with `None`; present values are compared with `epsilon`.
pub fn assert_values_approx_eq(actual: &[Option<f64>], expected: &[Option<f64>], epsilon: Option<f64>) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Arrays have different lengths: actual = {}, expected = {}",
        actual.len(),
        expected.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        match (a, e) {
            (Some(a), Some(e)) => {
                let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
                let diff = (a - e).abs();
                assert!(
                    diff <= eps,
                    "Arrays differ at index {}: actual = {}, expected = {}, diff = {}, epsilon = {}",
                    i,
                    a,
                    e,
                    diff,
                    eps
                );
            }
            (None, None) => {}
            _ => panic!("Arrays differ at index {}: actual = {:?}, expected = {:?}", i, a, e),
        }
    }
}

/// Assert that a result is within expected bounds.
///
/// # Panics
///
/// Panics if `actual` is less than `min` or greater than `max`.
pub fn assert_in_range(actual: f64, min: f64, max: f64) {
    assert!(
        actual >= min && actual <= max,
        "Value not in range: actual = {}, min = {}, max = {}",
        actual,
        min,
        max
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0, None);
        assert_approx_eq(1.0, 1.0 + 1e-12, None);
        assert_approx_eq(1.0, 1.001, Some(0.01));
    }

    #[test]
    fn test_assert_values_approx_eq() {
        assert_values_approx_eq(&[Some(1.0), None], &[Some(1.0), None], None);
        assert_values_approx_eq(&[Some(1.0)], &[Some(1.001)], Some(0.01));
    }

    #[test]
    fn test_assert_in_range() {
        assert_in_range(5.0, 0.0, 10.0);
        assert_in_range(0.0, 0.0, 10.0);
        assert_in_range(10.0, 0.0, 10.0);
    }
}
