//! Feature layout shared by training and forecasting.
//!
//! The model is trained on vectors in the order given by
//! [`FeatureSchema::column_names`] and must receive the same order when
//! forecasting, so both sides build their vectors through [`FeatureRow`].

use super::calendar::CalendarFeatures;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lag offsets (in days) of the default feature set.
pub const DEFAULT_LAGS: [u32; 4] = [1, 7, 14, 28];

/// Rolling-mean windows (in rows) of the default feature set.
pub const DEFAULT_ROLL_WINDOWS: [u32; 2] = [7, 28];

/// Longest lag or rolling window a schema may ask for, about a century of days.
pub const MAX_FEATURE_DAYS: u32 = 366 * 100;

/// Calendar columns, always first in the vector.
pub const CALENDAR_COLUMNS: [&str; 4] = ["dow", "week", "month", "year"];

/// Named positions in the default feature vector.
pub mod idx {
    pub const DOW: usize = 0;
    pub const WEEK: usize = 1;
    pub const MONTH: usize = 2;
    pub const YEAR: usize = 3;
    pub const LAG_1: usize = 4;
    pub const LAG_7: usize = 5;
    pub const LAG_14: usize = 6;
    pub const LAG_28: usize = 7;
    pub const ROLL_7: usize = 8;
    pub const ROLL_28: usize = 9;

    /// Width of the default feature vector.
    pub const WIDTH: usize = 10;
}

/// Which lag and rolling-window features a model consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub lags: Vec<u32>,
    pub roll_windows: Vec<u32>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        FeatureSchema {
            lags: DEFAULT_LAGS.to_vec(),
            roll_windows: DEFAULT_ROLL_WINDOWS.to_vec(),
        }
    }
}

impl FeatureSchema {
    /// Creates a validated schema.
    ///
    /// # Errors
    /// Returns an error if any lag or window is zero, longer than
    /// [`MAX_FEATURE_DAYS`] or listed twice.
    pub fn new(lags: Vec<u32>, roll_windows: Vec<u32>) -> Result<Self, SchemaError> {
        let schema = FeatureSchema { lags, roll_windows };
        schema.validate()?;
        Ok(schema)
    }

    /// Checks the invariants of a schema built without [`FeatureSchema::new`]
    /// (e.g. deserialized from a config file).
    pub fn validate(&self) -> Result<(), SchemaError> {
        // A zero lag or window would read the target day itself.
        if self.lags.contains(&0) {
            return Err(SchemaError::ZeroLag);
        }
        if self.roll_windows.contains(&0) {
            return Err(SchemaError::ZeroWindow);
        }
        if let Some(&days) = self.lags.iter().find(|&&d| d > MAX_FEATURE_DAYS) {
            return Err(SchemaError::TooLong { kind: "lag".to_string(), days });
        }
        if let Some(&days) = self.roll_windows.iter().find(|&&d| d > MAX_FEATURE_DAYS) {
            return Err(SchemaError::TooLong { kind: "roll window".to_string(), days });
        }
        if has_duplicates(&self.lags) {
            return Err(SchemaError::Duplicate("lag".to_string()));
        }
        if has_duplicates(&self.roll_windows) {
            return Err(SchemaError::Duplicate("roll window".to_string()));
        }
        Ok(())
    }

    /// Column names in vector order, e.g. `dow, week, month, year, lag_1, ..., roll_28`.
    pub fn column_names(&self) -> Vec<String> {
        CALENDAR_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .chain(self.lags.iter().map(|lag| format!("lag_{}", lag)))
            .chain(self.roll_windows.iter().map(|w| format!("roll_{}", w)))
            .collect()
    }

    /// Number of values in a feature vector.
    pub fn width(&self) -> usize {
        CALENDAR_COLUMNS.len() + self.lags.len() + self.roll_windows.len()
    }

    /// Position of a named column in the vector.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.column_names().iter().position(|name| name == column)
    }

    /// Rows of prior history needed before every lag and window is complete.
    pub fn warm_up(&self) -> usize {
        let max_lag = self.lags.iter().copied().max().unwrap_or(0);
        let max_window = self.roll_windows.iter().copied().max().unwrap_or(0);
        max_lag.max(max_window) as usize
    }
}

fn has_duplicates(values: &[u32]) -> bool {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).any(|pair| pair[0] == pair[1])
}

/// Model inputs for one (series, day).
///
/// Derived on demand and never stored as ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub calendar: CalendarFeatures,
    /// `(lag_days, value)` in schema order
    pub lags: Vec<(u32, f64)>,
    /// `(window, mean)` in schema order
    pub rolls: Vec<(u32, f64)>,
}

impl FeatureRow {
    pub fn lag(&self, days: u32) -> Option<f64> {
        self.lags
            .iter()
            .find(|(lag, _)| *lag == days)
            .map(|(_, value)| *value)
    }

    pub fn roll(&self, window: u32) -> Option<f64> {
        self.rolls
            .iter()
            .find(|(size, _)| *size == window)
            .map(|(_, value)| *value)
    }

    /// Flattens the row into the model's input vector.
    pub fn to_vector(&self) -> Vec<f64> {
        let mut vector = Vec::with_capacity(CALENDAR_COLUMNS.len() + self.lags.len() + self.rolls.len());
        vector.extend_from_slice(&self.calendar.values());
        vector.extend(self.lags.iter().map(|(_, value)| *value));
        vector.extend(self.rolls.iter().map(|(_, value)| *value));
        vector
    }
}

/// Errors from an invalid feature schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    ZeroLag,
    ZeroWindow,
    /// The named feature kind lists the same value twice
    Duplicate(String),
    TooLong { kind: String, days: u32 },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::ZeroLag => write!(f, "Lags must be at least one day"),
            SchemaError::ZeroWindow => write!(f, "Rolling windows must span at least one row"),
            SchemaError::Duplicate(kind) => write!(f, "Duplicate {} in feature schema", kind),
            SchemaError::TooLong { kind, days } => write!(
                f,
                "A {} of {} days exceeds the limit of {} days",
                kind, days, MAX_FEATURE_DAYS
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_matches_named_indices() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.width(), idx::WIDTH);
        assert_eq!(schema.index_of("dow"), Some(idx::DOW));
        assert_eq!(schema.index_of("lag_1"), Some(idx::LAG_1));
        assert_eq!(schema.index_of("lag_28"), Some(idx::LAG_28));
        assert_eq!(schema.index_of("roll_7"), Some(idx::ROLL_7));
        assert_eq!(schema.index_of("roll_28"), Some(idx::ROLL_28));
        assert_eq!(schema.index_of("price"), None);
    }

    #[test]
    fn default_column_order() {
        assert_eq!(
            FeatureSchema::default().column_names(),
            vec![
                "dow", "week", "month", "year", "lag_1", "lag_7", "lag_14", "lag_28", "roll_7",
                "roll_28"
            ]
        );
    }

    #[test]
    fn warm_up_is_largest_lag_or_window() {
        assert_eq!(FeatureSchema::default().warm_up(), 28);
        let schema = FeatureSchema::new(vec![1, 2], vec![5]).unwrap();
        assert_eq!(schema.warm_up(), 5);
    }

    #[test]
    fn invalid_schemas_are_rejected() {
        assert_eq!(FeatureSchema::new(vec![0], vec![7]).unwrap_err(), SchemaError::ZeroLag);
        assert_eq!(FeatureSchema::new(vec![1], vec![0]).unwrap_err(), SchemaError::ZeroWindow);
        assert!(matches!(
            FeatureSchema::new(vec![7, 7], vec![7]),
            Err(SchemaError::Duplicate(_))
        ));
    }

    #[test]
    fn oversized_lags_and_windows_are_rejected() {
        assert_eq!(
            FeatureSchema::new(vec![u32::MAX], vec![7]).unwrap_err(),
            SchemaError::TooLong { kind: "lag".to_string(), days: u32::MAX }
        );
        assert_eq!(
            FeatureSchema::new(vec![1], vec![MAX_FEATURE_DAYS + 1]).unwrap_err(),
            SchemaError::TooLong { kind: "roll window".to_string(), days: MAX_FEATURE_DAYS + 1 }
        );
        assert!(FeatureSchema::new(vec![MAX_FEATURE_DAYS], vec![7]).is_ok());
    }

    #[test]
    fn feature_row_vector_order() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let row = FeatureRow {
            date,
            calendar: CalendarFeatures::derive(date),
            lags: vec![(1, 3.0), (7, 4.0)],
            rolls: vec![(7, 2.5)],
        };

        assert_eq!(row.to_vector(), vec![0.0, 3.0, 1.0, 2024.0, 3.0, 4.0, 2.5]);
        assert_eq!(row.lag(7), Some(4.0));
        assert_eq!(row.lag(14), None);
        assert_eq!(row.roll(7), Some(2.5));
    }
}
