//! Stateless numeric primitives used by the feature derivations.
//!
//! These are pure functions over slices of demand values and can be composed
//! with windowing strategies.

/// Arithmetic mean of the window, or `0.0` when the window is empty.
///
/// An empty window means no demand has been seen yet, which the feature set
/// treats as zero demand rather than a missing value.
pub fn mean_or_zero(window: &[f64]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

/// Clamps a model output to the non-negative demand domain.
///
/// NaN collapses to `0.0` as well.
pub fn clamp_demand(value: f64) -> f64 {
    value.max(0.0)
}

/// Mean absolute error between paired actual and predicted values.
///
/// Returns `f64::NAN` when there is nothing to compare.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }

    let total: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();
    total / n as f64
}
