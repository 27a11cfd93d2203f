//! Wide-to-long normalization of M5-style sales tables.
//!
//! The wide layout has one row per (store, item) and one `d_<n>` column per
//! day. The long layout has one row per (store, item, day), with day `n`
//! mapped to `start + (n - 1)` days.

use crate::dataset::{open_input, prepare_output, DatasetError, HeaderIndex};
use chrono::{Days, NaiveDate};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// First calendar day of the M5 competition data (`d_1`).
pub fn m5_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2011, 1, 29).unwrap_or_default()
}

/// Day number of a `d_<n>` column name.
fn day_number(column: &str) -> Option<u64> {
    column
        .trim()
        .strip_prefix("d_")
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n >= 1)
}

/// Streams a wide table into the long table `date,demand,store_id,item_id`.
///
/// Returns the number of long rows written.
///
/// # Errors
/// Returns `MissingColumn` when `store_id`, `item_id` or every `d_` column is
/// absent, and `InvalidValue` for non-numeric day cells or a day column that
/// maps past the last representable date.
pub fn melt_wide<R: Read, W: Write>(
    input: R,
    output: W,
    start: NaiveDate,
) -> Result<usize, DatasetError> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let header = HeaderIndex::new(&headers);

    let store_col = header.require("store_id")?;
    let item_col = header.require("item_id")?;
    let mut day_cols: Vec<(usize, String, NaiveDate)> = Vec::new();
    for (i, name) in headers.iter().enumerate() {
        let n = match day_number(name) {
            Some(n) => n,
            None => continue,
        };
        let name = name.trim().to_string();
        match start.checked_add_days(Days::new(n - 1)) {
            Some(date) => day_cols.push((i, name, date)),
            None => {
                return Err(DatasetError::InvalidValue {
                    line: 1,
                    value: name.clone(),
                    column: name,
                });
            }
        }
    }
    if day_cols.is_empty() {
        return Err(DatasetError::MissingColumn("d_1".to_string()));
    }

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(["date", "demand", "store_id", "item_id"])?;

    let mut written = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let store_id = record.get(store_col).unwrap_or("").trim();
        let item_id = record.get(item_col).unwrap_or("").trim();

        for (col, name, date) in &day_cols {
            let cell = record.get(*col).unwrap_or("").trim();
            let demand = cell.parse::<f64>().map_err(|_| DatasetError::InvalidValue {
                line: line as u64 + 2,
                column: name.clone(),
                value: cell.to_string(),
            })?;
            writer.write_record([
                date.to_string().as_str(),
                demand.to_string().as_str(),
                store_id,
                item_id,
            ])?;
            written += 1;
        }
    }

    writer.flush()?;
    Ok(written)
}

/// Melts the wide file at `input` into the long file at `output`.
pub fn melt_file(input: &Path, output: &Path, start: NaiveDate) -> Result<usize, DatasetError> {
    let source = open_input(input)?;
    let sink = std::fs::File::create(prepare_output(output)?)?;
    let written = melt_wide(source, std::io::BufWriter::new(sink), start)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rows = written,
        "Wrote long demand table"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::read_observations;
    use crate::time_series::ObservationRow;

    const WIDE: &str = "id,item_id,dept_id,cat_id,store_id,state_id,d_1,d_2,d_3\n\
HOBBIES_1_001_CA_1,HOBBIES_1_001,HOBBIES_1,HOBBIES,CA_1,CA,0,2,1\n\
FOODS_3_090_TX_2,FOODS_3_090,FOODS_3,FOODS,TX_2,TX,5,0,3\n";

    #[test]
    fn day_number_parses_only_day_columns() {
        assert_eq!(day_number("d_1"), Some(1));
        assert_eq!(day_number("d_1913"), Some(1913));
        assert_eq!(day_number("d_0"), None);
        assert_eq!(day_number("dept_id"), None);
    }

    #[test]
    fn melt_maps_day_numbers_to_dates() {
        let mut out = Vec::new();
        let written = melt_wide(WIDE.as_bytes(), &mut out, m5_start_date()).unwrap();
        assert_eq!(written, 6);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,demand,store_id,item_id");
        assert_eq!(lines[1], "2011-01-29,0,CA_1,HOBBIES_1_001");
        assert_eq!(lines[3], "2011-01-31,1,CA_1,HOBBIES_1_001");
        assert_eq!(lines[4], "2011-01-29,5,TX_2,FOODS_3_090");
    }

    #[test]
    fn melt_requires_day_columns() {
        let wide = "store_id,item_id,total\nCA_1,A,3\n";
        let result = melt_wide(wide.as_bytes(), Vec::new(), m5_start_date());
        assert_eq!(result.unwrap_err(), DatasetError::MissingColumn("d_1".to_string()));
    }

    #[test]
    fn melt_rejects_non_numeric_cells() {
        let wide = "store_id,item_id,d_1\nCA_1,A,x\n";
        let result = melt_wide(wide.as_bytes(), Vec::new(), m5_start_date());
        assert!(matches!(
            result,
            Err(DatasetError::InvalidValue { line: 2, .. })
        ));
    }

    #[test]
    fn melt_rejects_out_of_range_day_columns() {
        let wide = "store_id,item_id,d_99999999999\nS,I,1\n";
        let result = melt_wide(wide.as_bytes(), Vec::new(), m5_start_date());
        assert_eq!(
            result.unwrap_err(),
            DatasetError::InvalidValue {
                line: 1,
                column: "d_99999999999".to_string(),
                value: "d_99999999999".to_string(),
            }
        );
    }

    #[test]
    fn melt_file_output_reads_as_observations() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sales_train_validation.csv");
        let output = dir.path().join("raw").join("m5_demand.csv");
        std::fs::write(&input, WIDE).unwrap();

        melt_file(&input, &output, m5_start_date()).unwrap();
        let rows = read_observations(&output).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(
            rows[5],
            ObservationRow::new(
                NaiveDate::from_ymd_opt(2011, 1, 31).unwrap(),
                "TX_2",
                "FOODS_3_090",
                3.0
            )
        );
    }
}
