use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier shared by every series when a dimension is absent from the raw data.
pub const ALL: &str = "ALL";

/// Key uniquely identifying one demand series.
///
/// A series is the daily demand of one item at one store. Keys order by
/// `store_id` first and `item_id` second, which is the order forecasts are
/// written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub store_id: String,
    pub item_id: String,
}

impl SeriesKey {
    /// Creates a new series key.
    ///
    /// # Errors
    /// Returns an error if either identifier is empty (after trimming) or
    /// contains control characters.
    pub fn new(
        store_id: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Result<Self, SeriesKeyError> {
        let store_id = store_id.into();
        let item_id = item_id.into();
        Self::validate_id(&store_id)?;
        Self::validate_id(&item_id)?;
        Ok(SeriesKey { store_id, item_id })
    }

    /// Key used when the raw data carries neither a store nor an item column.
    pub fn all() -> Self {
        SeriesKey {
            store_id: ALL.to_string(),
            item_id: ALL.to_string(),
        }
    }

    fn validate_id(id: &str) -> Result<(), SeriesKeyError> {
        if id.trim().is_empty() {
            return Err(SeriesKeyError::EmptyId);
        }

        if id.chars().any(|c| c.is_control()) {
            return Err(SeriesKeyError::InvalidCharacters);
        }

        Ok(())
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store_id, self.item_id)
    }
}

/// Errors that can occur when creating a series key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesKeyError {
    /// The store or item id is empty
    EmptyId,
    /// The store or item id contains invalid characters
    InvalidCharacters,
}

impl fmt::Display for SeriesKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKeyError::EmptyId => write!(f, "Store and item ids cannot be empty"),
            SeriesKeyError::InvalidCharacters => {
                write!(f, "Store or item id contains invalid characters")
            }
        }
    }
}

impl std::error::Error for SeriesKeyError {}
