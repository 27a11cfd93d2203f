//! Raw demand to processed training table.
//!
//! Steps: load the raw CSV, sum demand per (series, day), fill missing days
//! with zero demand, then derive features for every day whose lags and windows
//! are fully covered by earlier history.

use crate::dataset::{open_input, write_processed, DatasetError, HeaderIndex, TrainingRow};
use crate::features::{FeatureSchema, LagRollFeaturizer};
use crate::series_key::{SeriesKey, ALL};
use crate::time_series::{
    partition_by_series, DateRange, DemandPoint, ObservationRow, SeriesHistory,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Finds the raw input: the first `*.csv` in `dir` by file name.
pub fn find_raw_csv(dir: &Path) -> Result<PathBuf, DatasetError> {
    let entries = fs::read_dir(dir).map_err(|_| DatasetError::NoRawData(dir.to_path_buf()))?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| DatasetError::NoRawData(dir.to_path_buf()))
}

/// Reads a raw demand CSV.
///
/// Header names are trimmed and lower-cased. `date` and `demand` are required;
/// missing `store_id` / `item_id` columns default to `"ALL"`. Rows whose date
/// or demand cannot be parsed, or whose ids are blank, are dropped.
pub fn read_raw<R: Read>(input: R) -> Result<Vec<ObservationRow>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let header = HeaderIndex::new(reader.headers()?);

    let date_col = header.require("date")?;
    let demand_col = header.require("demand")?;
    let store_col = header.get("store_id");
    let item_col = header.get("item_id");

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        let date = record.get(date_col).and_then(crate::dataset::parse_date);
        let demand = record
            .get(demand_col)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| !value.is_nan());

        // Absent id columns mean one shared series; blank ids drop the row.
        let id = |col: Option<usize>| match col {
            None => Some(ALL.to_string()),
            Some(c) => record
                .get(c)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        };

        match (date, demand, id(store_col), id(item_col)) {
            (Some(date), Some(demand), Some(store_id), Some(item_id)) => {
                rows.push(ObservationRow::new(date, store_id, item_id, demand));
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, "Dropped raw rows with unparseable date, demand or id");
    }
    Ok(rows)
}

/// Sums demand per (store_id, item_id, date), sorted by series then date.
pub fn aggregate_daily(rows: &[ObservationRow]) -> Vec<ObservationRow> {
    let mut totals: BTreeMap<(String, String, NaiveDate), f64> = BTreeMap::new();
    for row in rows {
        *totals
            .entry((row.store_id.clone(), row.item_id.clone(), row.date))
            .or_insert(0.0) += row.demand;
    }

    totals
        .into_iter()
        .map(|((store_id, item_id, date), demand)| ObservationRow::new(date, store_id, item_id, demand))
        .collect()
}

/// Returns a history with one point per calendar day between the first and
/// last observation, absent days filled with zero demand.
pub fn fill_missing_days(history: &SeriesHistory) -> SeriesHistory {
    let (first, last) = match (history.first_date(), history.last_date()) {
        (Some(first), Some(last)) => (first, last),
        _ => return history.clone(),
    };

    let mut observed = history.points().iter().peekable();
    let points = DateRange::new(first, last)
        .days()
        .map(|day| match observed.next_if(|point| point.date == day) {
            Some(point) => *point,
            None => DemandPoint::new(day, 0.0),
        })
        .collect();

    SeriesHistory::from_sorted_unique(history.key().clone(), points)
}

/// Applies [`fill_missing_days`] to every series of a daily table.
pub fn ensure_date_continuity(
    rows: &[ObservationRow],
) -> Result<BTreeMap<SeriesKey, SeriesHistory>, DatasetError> {
    Ok(partition_by_series(rows)?
        .into_iter()
        .map(|(key, history)| (key, fill_missing_days(&history)))
        .collect())
}

/// Derives the training rows of one series, skipping warm-up days whose lags
/// or windows reach before the first observation.
pub fn training_rows(history: &SeriesHistory, featurizer: &LagRollFeaturizer) -> Vec<TrainingRow> {
    history
        .points()
        .iter()
        .filter_map(|point| {
            featurizer
                .compute_complete(history, point.date)
                .map(|features| TrainingRow {
                    key: history.key().clone(),
                    demand: point.demand,
                    features,
                })
        })
        .collect()
}

/// Counts reported by [`preprocess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub raw_rows: usize,
    pub series: usize,
    pub daily_rows: usize,
    pub processed_rows: usize,
    /// Series too short to produce any row past the feature warm-up
    pub short_series: usize,
}

/// Runs the full preprocessing stage from `raw_dir` to `processed_path`.
pub fn preprocess(
    raw_dir: &Path,
    processed_path: &Path,
    schema: &FeatureSchema,
) -> Result<PreprocessSummary, DatasetError> {
    schema.validate()?;
    let raw_path = find_raw_csv(raw_dir)?;
    info!(path = %raw_path.display(), "Loading raw demand");

    let raw = read_raw(open_input(&raw_path)?)?;
    let daily = aggregate_daily(&raw);
    let series = ensure_date_continuity(&daily)?;

    let warm_up = schema.warm_up();
    let short_series = series.values().filter(|history| history.len() <= warm_up).count();
    if short_series > 0 {
        warn!(short_series, warm_up, "Series with no days past the feature warm-up");
    }

    let featurizer = LagRollFeaturizer::new(schema);
    let daily_rows: usize = series.values().map(SeriesHistory::len).sum();
    let processed: Vec<TrainingRow> = series
        .values()
        .flat_map(|history| training_rows(history, &featurizer))
        .collect();

    write_processed(processed_path, &processed, schema)?;

    let summary = PreprocessSummary {
        raw_rows: raw.len(),
        series: series.len(),
        daily_rows,
        processed_rows: processed.len(),
        short_series,
    };
    info!(
        path = %processed_path.display(),
        raw_rows = summary.raw_rows,
        series = summary.series,
        daily_rows = summary.daily_rows,
        processed_rows = summary.processed_rows,
        short_series = summary.short_series,
        columns = schema.width() + 4,
        "Wrote processed dataset"
    );
    Ok(summary)
}
