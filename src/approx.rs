//! Utilities to approximate equality of floating point values.
//!
//! Used by the test suites and by callers comparing training results.

/// `|a - b| <= eps`.
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Element-wise [`approx_eq`] over equal-length slices.
pub fn all_close(a: &[f64], b: &[f64], eps: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| approx_eq(x, y, eps))
}
