//! Shared application state for the API server

use std::path::{Path, PathBuf};

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Forecast artifact served by `/forecast`, re-read on every request
    forecast_path: PathBuf,
}

impl AppState {
    /// Creates a new application state
    pub fn new(forecast_path: impl Into<PathBuf>) -> Self {
        AppState {
            forecast_path: forecast_path.into(),
        }
    }

    pub fn forecast_path(&self) -> &Path {
        &self.forecast_path
    }
}
