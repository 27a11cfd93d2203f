//! Batch forecasting across every series of a processed dataset.
//!
//! Series are independent, so they are forecast on the rayon worker pool with
//! the model shared read-only. A failing series is reported on its own and
//! does not discard the forecasts of the others.

use crate::forecast::{ForecastConfig, ForecastError, ForecastRow, RecursiveForecaster};
use crate::model::DemandModel;
use crate::series_key::SeriesKey;
use crate::time_series::{group_by_series, DemandPoint, ObservationRow, SeriesHistory};
use rayon::prelude::*;
use tracing::{info, warn};

/// A series that could not be forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFailure {
    pub key: SeriesKey,
    pub error: ForecastError,
}

/// Result of a batch run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchForecast {
    /// Forecasts of every successful series, sorted by (store_id, item_id, date)
    pub rows: Vec<ForecastRow>,
    /// Series that failed, sorted by key
    pub failures: Vec<SeriesFailure>,
    /// Number of series in the input
    pub series_count: usize,
}

impl BatchForecast {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Partitions a dataset by series and forecasts each partition.
pub struct ForecastOrchestrator<'m, M: DemandModel + ?Sized> {
    model: &'m M,
    config: ForecastConfig,
    parallel: bool,
}

impl<'m, M: DemandModel + ?Sized> ForecastOrchestrator<'m, M> {
    /// Creates an orchestrator that runs series in parallel.
    pub fn new(model: &'m M, config: ForecastConfig) -> Self {
        ForecastOrchestrator {
            model,
            config,
            parallel: true,
        }
    }

    /// Switches between the rayon pool and a plain sequential loop.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecasts every (store_id, item_id) series found in `rows`.
    ///
    /// # Errors
    /// The whole run fails, with no partial output, on a zero horizon or a
    /// row whose store/item id is unusable. Failures of individual series are
    /// collected in [`BatchForecast::failures`] instead.
    pub fn run(&self, rows: &[ObservationRow]) -> Result<BatchForecast, ForecastError> {
        if self.config.horizon == 0 {
            return Err(ForecastError::InvalidHorizon(0));
        }

        let partitions: Vec<(SeriesKey, Vec<DemandPoint>)> =
            group_by_series(rows)?.into_iter().collect();
        let series_count = partitions.len();
        info!(
            series = series_count,
            rows = rows.len(),
            horizon = self.config.horizon,
            parallel = self.parallel,
            "Starting forecast run"
        );

        let forecaster = RecursiveForecaster::new(self.model, &self.config);
        let run_one = |(key, points): (SeriesKey, Vec<DemandPoint>)| {
            let outcome = SeriesHistory::new(key.clone(), points)
                .map_err(ForecastError::from)
                .and_then(|history| {
                    if !history.is_contiguous() {
                        warn!(
                            series = %key,
                            gaps = history.gaps().len(),
                            "Series history has missing days; missing lags read as zero"
                        );
                    }
                    forecaster.forecast(&history)
                });
            (key, outcome)
        };

        let outcomes: Vec<(SeriesKey, Result<Vec<ForecastRow>, ForecastError>)> = if self.parallel {
            partitions.into_par_iter().map(run_one).collect()
        } else {
            partitions.into_iter().map(run_one).collect()
        };

        let batch = collect_outcomes(outcomes, series_count);
        info!(
            series = batch.series_count,
            rows = batch.rows.len(),
            failed = batch.failures.len(),
            "Forecast run complete"
        );
        Ok(batch)
    }
}

fn collect_outcomes(
    outcomes: Vec<(SeriesKey, Result<Vec<ForecastRow>, ForecastError>)>,
    series_count: usize,
) -> BatchForecast {
    let mut batch = BatchForecast {
        series_count,
        ..BatchForecast::default()
    };

    for (key, outcome) in outcomes {
        match outcome {
            Ok(rows) => batch.rows.extend(rows),
            Err(error) => {
                warn!(series = %key, error = %error, "Series forecast failed");
                batch.failures.push(SeriesFailure { key, error });
            }
        }
    }

    batch.rows.sort_by(|a, b| {
        (&a.store_id, &a.item_id, a.date).cmp(&(&b.store_id, &b.item_id, b.date))
    });
    batch.failures.sort_by(|a, b| a.key.cmp(&b.key));
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{idx, FeatureSchema};
    use crate::forecast::forecast_series;
    use crate::model::ModelError;
    use chrono::{Duration, NaiveDate};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() + Duration::days(offset)
    }

    fn series_rows(store: &str, item: &str, values: &[f64]) -> Vec<ObservationRow> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| ObservationRow::new(day(i as i64), store, item, v))
            .collect()
    }

    fn config(horizon: i64) -> ForecastConfig {
        ForecastConfig::new(horizon, FeatureSchema::default()).unwrap()
    }

    #[test]
    fn run_forecasts_each_series() {
        let mut rows = series_rows("S1", "A", &[1.0, 2.0, 3.0]);
        rows.extend(series_rows("S2", "B", &[10.0, 20.0]));

        let model = |features: &[f64]| features[idx::LAG_1] + 1.0;
        let batch = ForecastOrchestrator::new(&model, config(2)).run(&rows).unwrap();

        assert!(batch.is_complete());
        assert_eq!(batch.series_count, 2);
        assert_eq!(batch.rows.len(), 4);
        assert_eq!(batch.rows[0].store_id, "S1");
        assert_eq!(batch.rows[0].forecast, 4.0);
        assert_eq!(batch.rows[1].forecast, 5.0);
        assert_eq!(batch.rows[2].store_id, "S2");
        assert_eq!(batch.rows[2].date, day(2));
        assert_eq!(batch.rows[2].forecast, 21.0);
    }

    #[test]
    fn output_is_independent_of_input_order_and_scheduling() {
        let mut rows = series_rows("S1", "A", &[1.0, 5.0, 2.0, 8.0]);
        rows.extend(series_rows("S1", "B", &[3.0, 3.0, 4.0]));
        rows.extend(series_rows("S2", "A", &[0.0, 1.0]));

        let model = |features: &[f64]| 0.5 * features[idx::LAG_1] + 0.5 * features[idx::ROLL_7];
        let parallel = ForecastOrchestrator::new(&model, config(5)).run(&rows).unwrap();

        rows.reverse();
        let sequential = ForecastOrchestrator::new(&model, config(5))
            .with_parallelism(false)
            .run(&rows)
            .unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn batch_equals_union_of_single_series_runs() {
        let a = series_rows("S1", "A", &[2.0, 4.0, 6.0]);
        let b = series_rows("S9", "Z", &[7.0, 1.0]);
        let rows: Vec<ObservationRow> = b.iter().chain(a.iter()).cloned().collect();

        let model = |features: &[f64]| features[idx::ROLL_28] + 0.5;
        let batch = ForecastOrchestrator::new(&model, config(3)).run(&rows).unwrap();

        let single = |rows: &[ObservationRow]| {
            let history = crate::time_series::partition_by_series(rows)
                .unwrap()
                .into_values()
                .next()
                .unwrap();
            forecast_series(&model, &history, &config(3)).unwrap()
        };
        let mut expected = single(&a);
        expected.extend(single(&b));

        assert_eq!(batch.rows, expected);
    }

    #[test]
    fn failing_series_do_not_discard_others() {
        struct FailsForLargeLag;
        impl DemandModel for FailsForLargeLag {
            fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
                if features[idx::LAG_1] > 100.0 {
                    Err(ModelError::Prediction("out of range".to_string()))
                } else {
                    Ok(1.0)
                }
            }
        }

        let mut rows = series_rows("S1", "A", &[1.0, 2.0]);
        rows.extend(series_rows("S2", "B", &[500.0]));

        let batch = ForecastOrchestrator::new(&FailsForLargeLag, config(3))
            .run(&rows)
            .unwrap();

        assert_eq!(batch.rows.len(), 3);
        assert!(batch.rows.iter().all(|r| r.store_id == "S1"));
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].key, SeriesKey::new("S2", "B").unwrap());
        assert!(matches!(batch.failures[0].error, ForecastError::Model { .. }));
    }

    #[test]
    fn duplicate_dates_fail_only_their_series() {
        let mut rows = series_rows("S1", "A", &[1.0, 2.0]);
        rows.push(ObservationRow::new(day(0), "S2", "B", 1.0));
        rows.push(ObservationRow::new(day(0), "S2", "B", 2.0));

        let model = |_: &[f64]| 1.0;
        let batch = ForecastOrchestrator::new(&model, config(1)).run(&rows).unwrap();

        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.failures.len(), 1);
        assert!(matches!(batch.failures[0].error, ForecastError::History(_)));
    }

    #[test]
    fn zero_horizon_fails_whole_run() {
        let rows = series_rows("S1", "A", &[1.0]);
        let model = |_: &[f64]| 1.0;
        let zero = ForecastConfig {
            horizon: 0,
            schema: FeatureSchema::default(),
        };
        assert_eq!(
            ForecastOrchestrator::new(&model, zero).run(&rows).unwrap_err(),
            ForecastError::InvalidHorizon(0)
        );
    }

    #[test]
    fn empty_dataset_yields_empty_batch() {
        let model = |_: &[f64]| 1.0;
        let batch = ForecastOrchestrator::new(&model, config(3)).run(&[]).unwrap();
        assert_eq!(batch, BatchForecast::default());
    }
}
