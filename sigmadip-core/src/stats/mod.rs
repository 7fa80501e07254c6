//! Volatility statistics over daily return series.
//!
//! Everything here is a pure function of a return slice: series in, numbers
//! out. Undefined results are `None` (single values) or `f64::NAN` (aligned
//! series), never a panic.

pub mod sigma;

pub use sigma::{SigmaEstimator, SigmaMode};

/// Sample standard deviation (divides by `n - 1`).
///
/// `None` for fewer than two values or when any value is non-finite.
/// A constant window is exactly `0.0`.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    if values.iter().all(|&v| v == values[0]) {
        return Some(0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum();
    let std = (ss / (n - 1) as f64).sqrt();
    std.is_finite().then_some(std)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for statistic tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
