use crate::series_key::{SeriesKey, SeriesKeyError};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the long demand table: a single day of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub date: NaiveDate,
    pub store_id: String,
    pub item_id: String,
    pub demand: f64,
}

impl ObservationRow {
    /// Creates a new observation row.
    pub fn new(
        date: NaiveDate,
        store_id: impl Into<String>,
        item_id: impl Into<String>,
        demand: f64,
    ) -> Self {
        ObservationRow {
            date,
            store_id: store_id.into(),
            item_id: item_id.into(),
            demand,
        }
    }
}

/// A single day of demand inside a series history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    /// Calendar day of the observation
    pub date: NaiveDate,
    /// Demand on that day (observed or simulated)
    pub demand: f64,
}

impl DemandPoint {
    /// Creates a new DemandPoint.
    pub fn new(date: NaiveDate, demand: f64) -> Self {
        DemandPoint { date, demand }
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    /// Start date (inclusive)
    pub start: NaiveDate,
    /// End date (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new DateRange.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Number of calendar days covered, zero when `start > end`.
    pub fn num_days(&self) -> usize {
        let span = (self.end - self.start).num_days();
        if span < 0 {
            0
        } else {
            span as usize + 1
        }
    }

    /// Iterates every day from `start` to `end`, both inclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.num_days()).map(move |offset| self.start + Duration::days(offset as i64))
    }
}

/// Ordered demand history of one series.
///
/// Dates are strictly increasing with no duplicates. The history can only grow
/// at the end, so simulated days never overwrite observed ones.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesHistory {
    key: SeriesKey,
    points: Vec<DemandPoint>,
}

impl SeriesHistory {
    /// Builds a history from unordered points.
    ///
    /// # Errors
    /// Returns `HistoryError::DuplicateDate` if two points share a date.
    pub fn new(key: SeriesKey, mut points: Vec<DemandPoint>) -> Result<Self, HistoryError> {
        points.sort_by_key(|point| point.date);

        if let Some(pair) = points.windows(2).find(|pair| pair[0].date == pair[1].date) {
            return Err(HistoryError::DuplicateDate {
                key,
                date: pair[0].date,
            });
        }

        Ok(SeriesHistory { key, points })
    }

    /// Wraps points whose dates already strictly increase.
    pub(crate) fn from_sorted_unique(key: SeriesKey, points: Vec<DemandPoint>) -> Self {
        debug_assert!(points.windows(2).all(|pair| pair[0].date < pair[1].date));
        SeriesHistory { key, points }
    }

    /// Creates a history with no observations.
    pub fn empty(key: SeriesKey) -> Self {
        SeriesHistory {
            key,
            points: Vec::new(),
        }
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn points(&self) -> &[DemandPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|point| point.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|point| point.date)
    }

    /// Demand recorded on exactly `date`, if any.
    pub fn demand_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |point| point.date)
            .ok()
            .map(|index| self.points[index].demand)
    }

    /// All points dated strictly before `date`, oldest first.
    pub fn before(&self, date: NaiveDate) -> &[DemandPoint] {
        let end = self.points.partition_point(|point| point.date < date);
        &self.points[..end]
    }

    /// Appends a point after the current last date.
    ///
    /// # Errors
    /// Returns `HistoryError::OutOfOrder` if `point` is not strictly later
    /// than every existing point.
    pub fn push(&mut self, point: DemandPoint) -> Result<(), HistoryError> {
        if let Some(last) = self.last_date() {
            if point.date <= last {
                return Err(HistoryError::OutOfOrder {
                    key: self.key.clone(),
                    date: point.date,
                });
            }
        }
        self.points.push(point);
        Ok(())
    }

    /// Returns every run of missing calendar days between observations.
    pub fn gaps(&self) -> Vec<DateRange> {
        self.points
            .windows(2)
            .filter(|pair| (pair[1].date - pair[0].date).num_days() > 1)
            .map(|pair| {
                DateRange::new(
                    pair[0].date + Duration::days(1),
                    pair[1].date - Duration::days(1),
                )
            })
            .collect()
    }

    /// True when every calendar day between the first and last point is present.
    pub fn is_contiguous(&self) -> bool {
        self.gaps().is_empty()
    }
}

/// Groups flat observation rows into unsorted per-series point lists.
///
/// # Errors
/// Returns an error if a row carries an invalid store/item id.
pub fn group_by_series(
    rows: &[ObservationRow],
) -> Result<BTreeMap<SeriesKey, Vec<DemandPoint>>, HistoryError> {
    let mut grouped: BTreeMap<SeriesKey, Vec<DemandPoint>> = BTreeMap::new();

    for row in rows {
        let key = SeriesKey::new(row.store_id.as_str(), row.item_id.as_str())?;
        grouped
            .entry(key)
            .or_default()
            .push(DemandPoint::new(row.date, row.demand));
    }

    Ok(grouped)
}

/// Groups flat observation rows into per-series histories.
///
/// # Errors
/// Returns an error if a row carries an invalid store/item id or if a series
/// contains the same date twice.
pub fn partition_by_series(
    rows: &[ObservationRow],
) -> Result<BTreeMap<SeriesKey, SeriesHistory>, HistoryError> {
    group_by_series(rows)?
        .into_iter()
        .map(|(key, points)| SeriesHistory::new(key.clone(), points).map(|history| (key, history)))
        .collect()
}

/// Errors raised while building or extending a series history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Two observations of one series share a date
    DuplicateDate { key: SeriesKey, date: NaiveDate },
    /// Appended point is not after the last point
    OutOfOrder { key: SeriesKey, date: NaiveDate },
    /// Row carries an unusable store or item id
    InvalidKey(SeriesKeyError),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::DuplicateDate { key, date } => {
                write!(f, "Series {} has more than one row for {}", key, date)
            }
            HistoryError::OutOfOrder { key, date } => {
                write!(f, "Series {} cannot append {} out of order", key, date)
            }
            HistoryError::InvalidKey(err) => write!(f, "Invalid series key: {}", err),
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<SeriesKeyError> for HistoryError {
    fn from(err: SeriesKeyError) -> Self {
        HistoryError::InvalidKey(err)
    }
}
