//! CSV reading and writing for the long and processed demand tables.

use crate::features::{FeatureRow, FeatureSchema, SchemaError};
use crate::series_key::SeriesKey;
use crate::time_series::{HistoryError, ObservationRow};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Date formats accepted in raw input, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses a calendar date, dropping any time-of-day component.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|datetime| datetime.date())
        })
}

/// One processed row: the observed demand of a day and the features derived
/// from the days before it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub key: SeriesKey,
    pub demand: f64,
    pub features: FeatureRow,
}

/// Column positions of a CSV header, looked up by lower-cased name.
pub(crate) struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub(crate) fn new(headers: &StringRecord) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_lowercase(), i))
            .collect();
        HeaderIndex { positions }
    }

    pub(crate) fn get(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub(crate) fn require(&self, column: &str) -> Result<usize, DatasetError> {
        self.get(column)
            .ok_or_else(|| DatasetError::MissingColumn(column.to_string()))
    }
}

/// Reads `date, store_id, item_id, demand` rows; any other columns are ignored.
pub fn read_observations<P: AsRef<Path>>(path: P) -> Result<Vec<ObservationRow>, DatasetError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

/// Writes the processed table: identity columns, demand, then every feature
/// column of `schema`.
pub fn write_processed<P: AsRef<Path>>(
    path: P,
    rows: &[TrainingRow],
    schema: &FeatureSchema,
) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_path(prepare_output(path.as_ref())?)?;

    let mut header = vec![
        "date".to_string(),
        "store_id".to_string(),
        "item_id".to_string(),
        "demand".to_string(),
    ];
    header.extend(schema.column_names());
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.features.date.to_string(),
            row.key.store_id.clone(),
            row.key.item_id.clone(),
            row.demand.to_string(),
        ];
        record.extend(row.features.to_vector().iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the processed table back as training rows for `schema`.
///
/// # Errors
/// Returns `MissingColumn` if a feature of the schema is not in the file and
/// `InvalidValue` for unparseable cells.
pub fn read_training_rows<P: AsRef<Path>>(
    path: P,
    schema: &FeatureSchema,
) -> Result<Vec<TrainingRow>, DatasetError> {
    schema.validate()?;
    let mut reader = csv::Reader::from_path(path)?;
    let header = HeaderIndex::new(reader.headers()?);

    let date_col = header.require("date")?;
    let store_col = header.require("store_id")?;
    let item_col = header.require("item_id")?;
    let demand_col = header.require("demand")?;
    let lag_cols = schema
        .lags
        .iter()
        .map(|lag| header.require(&format!("lag_{}", lag)).map(|col| (*lag, col)))
        .collect::<Result<Vec<_>, _>>()?;
    let roll_cols = schema
        .roll_windows
        .iter()
        .map(|w| header.require(&format!("roll_{}", w)).map(|col| (*w, col)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let line = line as u64 + 2;

        let date_text = field(&record, date_col);
        let date = parse_date(date_text).ok_or_else(|| DatasetError::InvalidValue {
            line,
            column: "date".to_string(),
            value: date_text.to_string(),
        })?;
        let key = SeriesKey::new(field(&record, store_col), field(&record, item_col))
            .map_err(|e| DatasetError::History(e.into()))?;

        let lags = lag_cols
            .iter()
            .map(|(lag, col)| parse_number(&record, *col, line, &format!("lag_{}", lag)).map(|v| (*lag, v)))
            .collect::<Result<Vec<_>, _>>()?;
        let rolls = roll_cols
            .iter()
            .map(|(w, col)| parse_number(&record, *col, line, &format!("roll_{}", w)).map(|v| (*w, v)))
            .collect::<Result<Vec<_>, _>>()?;

        rows.push(TrainingRow {
            key,
            demand: parse_number(&record, demand_col, line, "demand")?,
            features: FeatureRow {
                date,
                calendar: crate::features::CalendarFeatures::derive(date),
                lags,
                rolls,
            },
        });
    }

    Ok(rows)
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

fn parse_number(
    record: &StringRecord,
    index: usize,
    line: u64,
    column: &str,
) -> Result<f64, DatasetError> {
    let text = field(record, index);
    text.parse::<f64>().map_err(|_| DatasetError::InvalidValue {
        line,
        column: column.to_string(),
        value: text.to_string(),
    })
}

/// Creates the parent directory of an output file and returns the path.
pub(crate) fn prepare_output(path: &Path) -> Result<&Path, DatasetError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(path)
}

/// Opens a file for reading, mapping absence to `NotFound`.
pub(crate) fn open_input(path: &Path) -> Result<File, DatasetError> {
    File::open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => DatasetError::NotFound(path.to_path_buf()),
        _ => DatasetError::Io(err.to_string()),
    })
}

/// Errors raised while reading or writing demand tables.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetError {
    /// Input file does not exist
    NotFound(PathBuf),
    /// No CSV file in the raw data directory
    NoRawData(PathBuf),
    /// A required column is missing from the header
    MissingColumn(String),
    /// A cell could not be parsed
    InvalidValue {
        line: u64,
        column: String,
        value: String,
    },
    /// Rows violate series history invariants
    History(HistoryError),
    /// Feature schema is invalid
    Schema(SchemaError),
    Io(String),
    Csv(String),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::NotFound(path) => write!(f, "File not found: {}", path.display()),
            DatasetError::NoRawData(dir) => {
                write!(f, "No CSV found in {}. Add a raw dataset first.", dir.display())
            }
            DatasetError::MissingColumn(column) => write!(f, "Missing required column: {}", column),
            DatasetError::InvalidValue { line, column, value } => write!(
                f,
                "Invalid value '{}' in column {} at line {}",
                value, column, line
            ),
            DatasetError::History(err) => write!(f, "{}", err),
            DatasetError::Schema(err) => write!(f, "{}", err),
            DatasetError::Io(msg) => write!(f, "IO error: {}", msg),
            DatasetError::Csv(msg) => write!(f, "CSV error: {}", msg),
        }
    }
}

impl std::error::Error for DatasetError {}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        DatasetError::Io(err.to_string())
    }
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        DatasetError::Csv(err.to_string())
    }
}

impl From<HistoryError> for DatasetError {
    fn from(err: HistoryError) -> Self {
        DatasetError::History(err)
    }
}

impl From<SchemaError> for DatasetError {
    fn from(err: SchemaError) -> Self {
        DatasetError::Schema(err)
    }
}
