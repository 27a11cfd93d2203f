//! Calendar features derived from a single date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar attributes of one day, in model input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// Day of week, Monday = 0 through Sunday = 6
    pub dow: u32,
    /// ISO-8601 week number (1..=53)
    pub week: u32,
    /// Month (1..=12)
    pub month: u32,
    /// Calendar year. Not the ISO week-year, so Dec 31 2018 keeps year 2018
    /// while its ISO week is 1.
    pub year: i32,
}

impl CalendarFeatures {
    /// Derives the calendar features of `date`.
    pub fn derive(date: NaiveDate) -> Self {
        CalendarFeatures {
            dow: date.weekday().num_days_from_monday(),
            week: date.iso_week().week(),
            month: date.month(),
            year: date.year(),
        }
    }

    /// Values as model inputs: `[dow, week, month, year]`.
    pub fn values(&self) -> [f64; 4] {
        [
            self.dow as f64,
            self.week as f64,
            self.month as f64,
            self.year as f64,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monday_is_day_zero() {
        // 2024-01-15 was a Monday
        assert_eq!(CalendarFeatures::derive(date(2024, 1, 15)).dow, 0);
        assert_eq!(CalendarFeatures::derive(date(2024, 1, 21)).dow, 6);
    }

    #[test]
    fn iso_week_rolls_over_at_year_end() {
        let features = CalendarFeatures::derive(date(2018, 12, 31));
        assert_eq!(features.week, 1);
        assert_eq!(features.month, 12);
        assert_eq!(features.year, 2018);
    }

    #[test]
    fn early_january_can_belong_to_week_53() {
        // 2021-01-01 falls in ISO week 53 of 2020
        let features = CalendarFeatures::derive(date(2021, 1, 1));
        assert_eq!(features.week, 53);
        assert_eq!(features.year, 2021);
    }

    #[test]
    fn values_follow_model_order() {
        let features = CalendarFeatures::derive(date(2011, 1, 29));
        assert_eq!(features.values(), [5.0, 4.0, 1.0, 2011.0]);
    }
}
