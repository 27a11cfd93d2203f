//! Recursive multi-step forecasting for a single series.
//!
//! The model only predicts one day ahead. To reach `horizon` days, each
//! prediction is appended to a simulation buffer seeded from the real history,
//! and the next day's lag and rolling features are computed from that buffer.
//! The buffer is threaded through [`RecursiveForecaster::step`] as an explicit
//! [`SimulationState`] value, so each step can be inspected on its own.

use crate::features::{clamp_demand, FeatureRow, FeatureSchema, LagRollFeaturizer};
use crate::model::{DemandModel, ModelError};
use crate::series_key::SeriesKey;
use crate::time_series::{DemandPoint, HistoryError, SeriesHistory};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Forecast for one (series, future day).
///
/// Field order is the column order of the forecast artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub forecast: f64,
    pub store_id: String,
    pub item_id: String,
}

impl ForecastRow {
    pub fn new(key: &SeriesKey, date: NaiveDate, forecast: f64) -> Self {
        ForecastRow {
            date,
            forecast,
            store_id: key.store_id.clone(),
            item_id: key.item_id.clone(),
        }
    }
}

/// Settings of a forecasting run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastConfig {
    /// Number of days to forecast past the last observation
    pub horizon: usize,
    /// Lags and windows the model was trained with
    pub schema: FeatureSchema,
}

impl ForecastConfig {
    /// Creates a config, rejecting non-positive horizons.
    pub fn new(horizon: i64, schema: FeatureSchema) -> Result<Self, ForecastError> {
        if horizon <= 0 {
            return Err(ForecastError::InvalidHorizon(horizon));
        }
        Ok(ForecastConfig {
            horizon: horizon as usize,
            schema,
        })
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            horizon: 28,
            schema: FeatureSchema::default(),
        }
    }
}

/// Simulation buffer of one series: real history followed by the days
/// simulated so far.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    history: SeriesHistory,
    next_date: NaiveDate,
}

impl SimulationState {
    /// Seeds the buffer with a copy of the real history.
    ///
    /// # Errors
    /// Returns `ForecastError::InsufficientHistory` if the history is empty.
    pub fn seed(history: &SeriesHistory) -> Result<Self, ForecastError> {
        let last = history
            .last_date()
            .ok_or_else(|| ForecastError::InsufficientHistory(history.key().clone()))?;

        Ok(SimulationState {
            history: history.clone(),
            next_date: last + Duration::days(1),
        })
    }

    /// The buffer so far (real and simulated days).
    pub fn history(&self) -> &SeriesHistory {
        &self.history
    }

    /// The day the next step will forecast.
    pub fn next_date(&self) -> NaiveDate {
        self.next_date
    }

    /// Features of the next day, computed from the buffer.
    pub fn features(&self, featurizer: &LagRollFeaturizer) -> FeatureRow {
        featurizer.compute(&self.history, self.next_date)
    }

    /// Records `demand` as the next day's value and moves to the following day.
    pub fn advance(mut self, demand: f64) -> Result<Self, ForecastError> {
        self.history
            .push(DemandPoint::new(self.next_date, demand))
            .map_err(ForecastError::History)?;
        self.next_date += Duration::days(1);
        Ok(self)
    }
}

/// Projects one series `horizon` days forward with a one-step model.
pub struct RecursiveForecaster<'m, M: DemandModel + ?Sized> {
    model: &'m M,
    featurizer: LagRollFeaturizer,
    horizon: usize,
}

impl<'m, M: DemandModel + ?Sized> RecursiveForecaster<'m, M> {
    pub fn new(model: &'m M, config: &ForecastConfig) -> Self {
        RecursiveForecaster {
            model,
            featurizer: LagRollFeaturizer::new(&config.schema),
            horizon: config.horizon,
        }
    }

    /// Runs one step: features for the next day, predict, clamp, record.
    ///
    /// Returns the advanced state and the emitted forecast row.
    pub fn step(
        &self,
        state: SimulationState,
    ) -> Result<(SimulationState, ForecastRow), ForecastError> {
        let target = state.next_date();
        let features = state.features(&self.featurizer);

        let raw = self
            .model
            .predict(&features.to_vector())
            .map_err(|source| ForecastError::Model {
                key: state.history().key().clone(),
                date: target,
                source,
            })?;
        let demand = clamp_demand(raw);
        trace!(date = %target, raw, demand, "simulated step");

        let row = ForecastRow::new(state.history().key(), target, demand);
        Ok((state.advance(demand)?, row))
    }

    /// Forecasts the `horizon` days after the last observation of `history`.
    ///
    /// The output always has exactly `horizon` rows in increasing date order.
    ///
    /// # Errors
    /// Fails with `InvalidHorizon` for a zero horizon, `InsufficientHistory`
    /// for an empty history, or `Model` when a prediction fails. No partial
    /// output is returned.
    pub fn forecast(&self, history: &SeriesHistory) -> Result<Vec<ForecastRow>, ForecastError> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidHorizon(0));
        }

        let seed = SimulationState::seed(history)?;
        debug!(
            series = %history.key(),
            observed = history.len(),
            start = %seed.next_date(),
            horizon = self.horizon,
            "forecasting series"
        );

        let mut rows = Vec::with_capacity(self.horizon);
        (0..self.horizon).try_fold(seed, |state, _| {
            let (next, row) = self.step(state)?;
            rows.push(row);
            Ok::<_, ForecastError>(next)
        })?;

        Ok(rows)
    }
}

/// Forecasts one series with the given model and config.
pub fn forecast_series<M: DemandModel + ?Sized>(
    model: &M,
    history: &SeriesHistory,
    config: &ForecastConfig,
) -> Result<Vec<ForecastRow>, ForecastError> {
    RecursiveForecaster::new(model, config).forecast(history)
}

/// Errors raised while forecasting.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Horizon was zero or negative
    InvalidHorizon(i64),
    /// The series has no observations to seed the simulation
    InsufficientHistory(SeriesKey),
    /// The model failed on one step of a series
    Model {
        key: SeriesKey,
        date: NaiveDate,
        source: ModelError,
    },
    /// The simulation buffer rejected a point
    History(HistoryError),
}

impl ForecastError {
    /// Series the error belongs to, when it is series specific.
    pub fn series_key(&self) -> Option<&SeriesKey> {
        match self {
            ForecastError::InvalidHorizon(_) => None,
            ForecastError::InsufficientHistory(key) => Some(key),
            ForecastError::Model { key, .. } => Some(key),
            ForecastError::History(HistoryError::DuplicateDate { key, .. })
            | ForecastError::History(HistoryError::OutOfOrder { key, .. }) => Some(key),
            ForecastError::History(HistoryError::InvalidKey(_)) => None,
        }
    }
}

impl std::fmt::Display for ForecastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastError::InvalidHorizon(horizon) => {
                write!(f, "Horizon must be positive, got {}", horizon)
            }
            ForecastError::InsufficientHistory(key) => {
                write!(f, "Series {} has no history to forecast from", key)
            }
            ForecastError::Model { key, date, source } => {
                write!(f, "Model failed for series {} on {}: {}", key, date, source)
            }
            ForecastError::History(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ForecastError {}

impl From<HistoryError> for ForecastError {
    fn from(err: HistoryError) -> Self {
        ForecastError::History(err)
    }
}
