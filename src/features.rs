//! Daily feature derivation shared by preprocessing and forecasting.
//!
//! - [`calendar`]: day-of-week, ISO week, month and year of a date
//! - [`lag`]: exact-offset lags and trailing rolling means over a series history
//! - [`schema`]: the feature vector layout a model is trained on
//! - [`windows`] / [`primitives`]: building blocks for the rolling statistics

pub mod calendar;
pub mod lag;
pub mod primitives;
pub mod schema;
pub mod windows;

pub use calendar::CalendarFeatures;
pub use lag::{Lag, LagRollFeaturizer};
pub use primitives::{clamp_demand, mean_absolute_error, mean_or_zero};
pub use schema::{idx, FeatureRow, FeatureSchema, SchemaError};
pub use windows::{TrailingWindow, WindowStrategy};
