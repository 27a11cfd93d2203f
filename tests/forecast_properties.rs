use chrono::{Duration, NaiveDate};
use demand_forecast::features::idx;
use demand_forecast::{
    forecast_series, CalendarFeatures, DemandPoint, FeatureSchema, ForecastConfig, ForecastError,
    ForecastOrchestrator, LagRollFeaturizer, ObservationRow, SeriesHistory, SeriesKey,
};

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(offset)
}

fn history(key: &SeriesKey, values: &[f64]) -> SeriesHistory {
    let points = values
        .iter()
        .enumerate()
        .map(|(i, v)| DemandPoint::new(day(i as i64), *v))
        .collect();
    SeriesHistory::new(key.clone(), points).unwrap()
}

fn key() -> SeriesKey {
    SeriesKey::new("CA_1", "FOODS_3_090").unwrap()
}

fn config(horizon: i64) -> ForecastConfig {
    ForecastConfig::new(horizon, FeatureSchema::default()).unwrap()
}

/// A deterministic model that looks at every feature.
fn blended(features: &[f64]) -> f64 {
    0.5 * features[idx::LAG_1] + 0.3 * features[idx::ROLL_7] + 0.1 * features[idx::LAG_7]
        - 0.05 * features[idx::DOW]
}

#[test]
fn recursion_feeds_predictions_back_as_lags() {
    let model = |features: &[f64]| features[idx::LAG_1] + 1.0;
    let rows = forecast_series(&model, &history(&key(), &[5.0]), &config(3)).unwrap();

    let values: Vec<f64> = rows.iter().map(|r| r.forecast).collect();
    assert_eq!(values, vec![6.0, 7.0, 8.0]);
    assert_eq!(rows[0].date, day(1));
    assert_eq!(rows[2].date, day(3));
}

#[test]
fn output_length_equals_horizon() {
    let series = history(&key(), &[1.0, 2.0, 3.0]);
    for horizon in [1, 7, 28, 90] {
        let rows = forecast_series(&blended, &series, &config(horizon)).unwrap();
        assert_eq!(rows.len(), horizon as usize);
        assert!(rows.windows(2).all(|w| w[1].date == w[0].date + Duration::days(1)));
    }
}

#[test]
fn forecasts_are_never_negative() {
    let model = |_: &[f64]| -5.0;
    let rows = forecast_series(&model, &history(&key(), &[3.0, 4.0]), &config(10)).unwrap();
    assert!(rows.iter().all(|r| r.forecast == 0.0));
}

#[test]
fn forecasting_is_deterministic() {
    let values: Vec<f64> = (0..60).map(|i| ((i * 37) % 11) as f64).collect();
    let series = history(&key(), &values);

    let first = forecast_series(&blended, &series, &config(28)).unwrap();
    let second = forecast_series(&blended, &series, &config(28)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn features_ignore_rows_on_or_after_target() {
    let featurizer = LagRollFeaturizer::new(&FeatureSchema::default());
    let short = history(&key(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    let long = history(&key(), &[1.0, 2.0, 3.0, 4.0, 5.0, 100.0, 200.0, 300.0]);

    let target = day(5);
    assert_eq!(featurizer.compute(&short, target), featurizer.compute(&long, target));
}

#[test]
fn short_history_zero_fills_lags_and_shrinks_windows() {
    let featurizer = LagRollFeaturizer::new(&FeatureSchema::default());
    let series = history(&key(), &[2.0, 4.0, 6.0]);

    let row = featurizer.compute(&series, day(3));
    assert_eq!(row.lag(1), Some(6.0));
    assert_eq!(row.lag(7), Some(0.0));
    assert_eq!(row.lag(14), Some(0.0));
    assert_eq!(row.lag(28), Some(0.0));
    assert_eq!(row.roll(7), Some(4.0));
    assert_eq!(row.roll(28), Some(4.0));
}

#[test]
fn empty_history_is_rejected() {
    let result = forecast_series(&blended, &SeriesHistory::empty(key()), &config(5));
    assert_eq!(result.unwrap_err(), ForecastError::InsufficientHistory(key()));
}

#[test]
fn non_positive_horizon_is_rejected() {
    for horizon in [0, -1] {
        assert_eq!(
            ForecastConfig::new(horizon, FeatureSchema::default()).unwrap_err(),
            ForecastError::InvalidHorizon(horizon)
        );
    }
}

#[test]
fn series_are_forecast_independently() {
    let stores = ["CA_1", "TX_2", "WI_3"];
    let mut rows = Vec::new();
    for (s, store) in stores.iter().enumerate() {
        for i in 0..45 {
            let demand = ((i + s as i64 * 3) % 9) as f64;
            rows.push(ObservationRow::new(day(i), *store, "HOUSEHOLD_1_118", demand));
        }
    }

    let together = ForecastOrchestrator::new(&blended, config(14)).run(&rows).unwrap();
    assert_eq!(together.series_count, 3);

    let mut shuffled = rows.clone();
    shuffled.reverse();
    let sequential = ForecastOrchestrator::new(&blended, config(14))
        .with_parallelism(false)
        .run(&shuffled)
        .unwrap();
    assert_eq!(together, sequential);

    for store in stores {
        let own: Vec<ObservationRow> = rows.iter().filter(|r| r.store_id == store).cloned().collect();
        let alone = ForecastOrchestrator::new(&blended, config(14)).run(&own).unwrap();
        let part: Vec<_> = together.rows.iter().filter(|r| r.store_id == store).cloned().collect();
        assert_eq!(alone.rows, part);
    }
}

#[test]
fn calendar_uses_iso_week_and_calendar_year() {
    let features = CalendarFeatures::derive(NaiveDate::from_ymd_opt(2018, 12, 31).unwrap());
    assert_eq!(features.dow, 0);
    assert_eq!(features.week, 1);
    assert_eq!(features.month, 12);
    assert_eq!(features.year, 2018);
}
