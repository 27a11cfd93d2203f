//! The forecast artifact: a CSV of `date,forecast,store_id,item_id` rows, and
//! the filtered lookup served over HTTP.

use crate::dataset::prepare_output;
use crate::forecast::ForecastRow;
use crate::series_key::ALL;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest number of rows a single query may return.
pub const MAX_QUERY_LIMIT: i64 = 365;
/// Rows returned when the query does not say.
pub const DEFAULT_QUERY_LIMIT: i64 = 28;

/// Writes forecast rows in the artifact column order.
pub fn write_forecasts<P: AsRef<Path>>(path: P, rows: &[ForecastRow]) -> Result<(), QueryError> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(
        prepare_output(path).map_err(|e| QueryError::Io(e.to_string()))?,
    )?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the whole artifact.
///
/// # Errors
/// Returns `QueryError::ArtifactMissing` if the file does not exist.
pub fn read_forecasts<P: AsRef<Path>>(path: P) -> Result<Vec<ForecastRow>, QueryError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(QueryError::ArtifactMissing(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

fn default_id() -> String {
    ALL.to_string()
}

fn default_limit() -> i64 {
    DEFAULT_QUERY_LIMIT
}

/// Filter over the artifact. Absent fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForecastQuery {
    #[serde(default = "default_id")]
    pub store_id: String,
    #[serde(default = "default_id")]
    pub item_id: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for ForecastQuery {
    fn default() -> Self {
        ForecastQuery {
            store_id: default_id(),
            item_id: default_id(),
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl ForecastQuery {
    pub fn new(store_id: impl Into<String>, item_id: impl Into<String>, limit: i64) -> Self {
        ForecastQuery {
            store_id: store_id.into(),
            item_id: item_id.into(),
            limit,
        }
    }

    /// Checks that `limit` lies in `1..=365`.
    pub fn validate(&self) -> Result<usize, QueryError> {
        if (1..=MAX_QUERY_LIMIT).contains(&self.limit) {
            Ok(self.limit as usize)
        } else {
            Err(QueryError::InvalidLimit(self.limit))
        }
    }

    fn matches(&self, row: &ForecastRow) -> bool {
        row.store_id == self.store_id && row.item_id == self.item_id
    }
}

/// Returns the first `limit` rows of one series, ordered by date.
///
/// Ids are matched exactly; `"ALL"` only matches rows stored under `"ALL"`.
pub fn select_forecasts(rows: Vec<ForecastRow>, query: &ForecastQuery) -> Result<Vec<ForecastRow>, QueryError> {
    let limit = query.validate()?;

    let mut selected: Vec<ForecastRow> = rows.into_iter().filter(|row| query.matches(row)).collect();
    if selected.is_empty() {
        return Err(QueryError::NoMatch {
            store_id: query.store_id.clone(),
            item_id: query.item_id.clone(),
        });
    }

    selected.sort_by_key(|row| row.date);
    selected.truncate(limit);
    Ok(selected)
}

/// Reads the artifact at `path` and applies `query` to it.
pub fn query_forecasts<P: AsRef<Path>>(path: P, query: &ForecastQuery) -> Result<Vec<ForecastRow>, QueryError> {
    query.validate()?;
    select_forecasts(read_forecasts(path)?, query)
}

/// Errors raised while writing or querying the forecast artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// No artifact has been produced yet
    ArtifactMissing(PathBuf),
    /// The artifact has no rows for this series
    NoMatch { store_id: String, item_id: String },
    /// `limit` outside `1..=365`
    InvalidLimit(i64),
    Io(String),
    Csv(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::ArtifactMissing(path) => write!(
                f,
                "Forecast file missing at {}. Run: demand-pipeline predict",
                path.display()
            ),
            QueryError::NoMatch { .. } => write!(f, "No forecast found for that store_id/item_id"),
            QueryError::InvalidLimit(limit) => write!(
                f,
                "limit must be between 1 and {}, got {}",
                MAX_QUERY_LIMIT, limit
            ),
            QueryError::Io(msg) => write!(f, "IO error: {}", msg),
            QueryError::Csv(msg) => write!(f, "CSV error: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<csv::Error> for QueryError {
    fn from(err: csv::Error) -> Self {
        QueryError::Csv(err.to_string())
    }
}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        QueryError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series_key::SeriesKey;
    use chrono::{Duration, NaiveDate};

    fn rows() -> Vec<ForecastRow> {
        let start = NaiveDate::from_ymd_opt(2016, 4, 25).unwrap();
        let a = SeriesKey::new("CA_1", "FOODS_1").unwrap();
        let b = SeriesKey::new("TX_2", "FOODS_1").unwrap();
        // b first and a in reverse date order to exercise sorting
        let mut rows: Vec<ForecastRow> = (0..3)
            .map(|i| ForecastRow::new(&b, start + Duration::days(i), 10.0 + i as f64))
            .collect();
        rows.extend((0..30).rev().map(|i| ForecastRow::new(&a, start + Duration::days(i), i as f64)));
        rows
    }

    #[test]
    fn artifact_header_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("forecast.csv");
        let rows = rows();

        write_forecasts(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,forecast,store_id,item_id\n"));
        assert_eq!(read_forecasts(&path).unwrap(), rows);
    }

    #[test]
    fn query_defaults() {
        let query: ForecastQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query, ForecastQuery::default());
        assert_eq!(query.store_id, "ALL");
        assert_eq!(query.limit, 28);
    }

    #[test]
    fn select_filters_sorts_and_truncates() {
        let query = ForecastQuery::new("CA_1", "FOODS_1", 5);
        let selected = select_forecasts(rows(), &query).unwrap();

        assert_eq!(selected.len(), 5);
        assert!(selected.iter().all(|r| r.store_id == "CA_1"));
        assert!(selected.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(selected[0].forecast, 0.0);
    }

    #[test]
    fn select_returns_fewer_rows_than_limit() {
        let query = ForecastQuery::new("TX_2", "FOODS_1", 365);
        assert_eq!(select_forecasts(rows(), &query).unwrap().len(), 3);
    }

    #[test]
    fn all_matches_only_literal_all_rows() {
        let query = ForecastQuery::default();
        assert_eq!(
            select_forecasts(rows(), &query).unwrap_err(),
            QueryError::NoMatch {
                store_id: "ALL".to_string(),
                item_id: "ALL".to_string()
            }
        );
    }

    #[test]
    fn limit_bounds_are_enforced() {
        for limit in [0, -3, 366] {
            let query = ForecastQuery::new("CA_1", "FOODS_1", limit);
            assert_eq!(
                select_forecasts(rows(), &query).unwrap_err(),
                QueryError::InvalidLimit(limit)
            );
        }
        assert_eq!(ForecastQuery::new("CA_1", "FOODS_1", 365).validate(), Ok(365));
        assert_eq!(ForecastQuery::new("CA_1", "FOODS_1", 1).validate(), Ok(1));
    }

    #[test]
    fn query_on_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.csv");
        let result = query_forecasts(&path, &ForecastQuery::default());
        assert_eq!(result.unwrap_err(), QueryError::ArtifactMissing(path));
    }
}
