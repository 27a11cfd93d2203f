//! Windowing strategies that supply trailing slices to primitives.
//!
//! Strategies implement `WindowStrategy` so callers can reason about warm-up
//! requirements without knowing the specific primitive.

/// Common behavior shared by every windowing strategy.
pub trait WindowStrategy {
    /// The number of prior data points required before the output is computed
    /// from a complete window.
    fn burn_in(&self) -> usize;
}

/// Fixed-size trailing window (e.g., 7-day or 28-day rolling mean).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindow {
    size: usize,
}

impl TrailingWindow {
    /// Creates a trailing window over the `size` most recent values
    /// (or fewer when the data is shorter than `size`).
    pub fn new(size: usize) -> Self {
        TrailingWindow { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the most recent `size` values of `data` (all of it when shorter).
    pub fn tail<'a>(&self, data: &'a [f64]) -> &'a [f64] {
        let start = data.len().saturating_sub(self.size);
        &data[start..]
    }

    /// Applies the primitive to the trailing window of `data`.
    pub fn apply<F>(&self, data: &[f64], primitive: F) -> f64
    where
        F: FnOnce(&[f64]) -> f64,
    {
        primitive(self.tail(data))
    }
}

impl WindowStrategy for TrailingWindow {
    fn burn_in(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::super::primitives::mean_or_zero;
    use super::{TrailingWindow, WindowStrategy};

    #[test]
    fn trailing_window_takes_most_recent_values() {
        let window = TrailingWindow::new(3);
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(window.tail(&data), &[2.0, 3.0, 4.0]);
        assert_eq!(window.apply(&data, |slice| slice.iter().sum()), 9.0);
        assert_eq!(window.burn_in(), 3);
    }

    #[test]
    fn trailing_window_shrinks_to_available_data() {
        let window = TrailingWindow::new(7);
        assert_eq!(window.apply(&[2.0, 4.0], mean_or_zero), 3.0);
        assert_eq!(window.apply(&[], mean_or_zero), 0.0);
    }

    #[test]
    fn zero_size_is_promoted_to_one() {
        assert_eq!(TrailingWindow::new(0).size(), 1);
    }
}
