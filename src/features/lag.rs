use super::calendar::CalendarFeatures;
use super::primitives::mean_or_zero;
use super::schema::{FeatureRow, FeatureSchema};
use super::windows::{TrailingWindow, WindowStrategy};
use crate::time_series::SeriesHistory;
use chrono::{Days, NaiveDate};

/// Exact-offset lag lookup (e.g., demand 7 days before the target).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lag {
    days: u32,
}

impl Lag {
    pub fn new(days: u32) -> Self {
        Lag { days }
    }

    /// Lag distance in days.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// The day this lag reads for `target`, or `None` when it falls before
    /// the first representable date.
    pub fn source_date(&self, target: NaiveDate) -> Option<NaiveDate> {
        target.checked_sub_days(Days::new(u64::from(self.days)))
    }

    /// Demand on the source day, or `0.0` when that day is not in the history.
    pub fn value(&self, history: &SeriesHistory, target: NaiveDate) -> f64 {
        self.source_date(target)
            .and_then(|date| history.demand_on(date))
            .unwrap_or(0.0)
    }
}

impl WindowStrategy for Lag {
    fn burn_in(&self) -> usize {
        self.days as usize
    }
}

/// Computes the lag and rolling-mean features of a target day.
///
/// Only rows dated strictly before the target are read: lags look up an exact
/// earlier day, and rolling means average the most recent rows before the
/// target. Missing lag days read as zero demand and short windows average
/// whatever is available.
#[derive(Debug, Clone)]
pub struct LagRollFeaturizer {
    lags: Vec<Lag>,
    windows: Vec<TrailingWindow>,
}

impl LagRollFeaturizer {
    pub fn new(schema: &FeatureSchema) -> Self {
        LagRollFeaturizer {
            lags: schema.lags.iter().map(|&days| Lag::new(days)).collect(),
            windows: schema
                .roll_windows
                .iter()
                .map(|&size| TrailingWindow::new(size as usize))
                .collect(),
        }
    }

    /// Builds the full feature row (calendar + lags + rolls) for `target`.
    pub fn compute(&self, history: &SeriesHistory, target: NaiveDate) -> FeatureRow {
        let lags = self
            .lags
            .iter()
            .map(|lag| (lag.days(), lag.value(history, target)))
            .collect();

        let past = history.before(target);
        let longest = self.windows.iter().map(|w| w.size()).max().unwrap_or(0);
        let recent: Vec<f64> = past[past.len().saturating_sub(longest)..]
            .iter()
            .map(|point| point.demand)
            .collect();

        let rolls = self
            .windows
            .iter()
            .map(|window| (window.size() as u32, window.apply(&recent, mean_or_zero)))
            .collect();

        FeatureRow {
            date: target,
            calendar: CalendarFeatures::derive(target),
            lags,
            rolls,
        }
    }

    /// Like [`compute`](Self::compute), but `None` unless every lag day is
    /// present and every window is full. Training rows are built this way so
    /// the model never learns from zero-filled warm-up rows.
    pub fn compute_complete(&self, history: &SeriesHistory, target: NaiveDate) -> Option<FeatureRow> {
        let lags_present = self
            .lags
            .iter()
            .all(|lag| lag.source_date(target).and_then(|date| history.demand_on(date)).is_some());
        let available = history.before(target).len();
        let windows_full = self.windows.iter().all(|window| available >= window.burn_in());

        if lags_present && windows_full {
            Some(self.compute(history, target))
        } else {
            None
        }
    }
}
