//! Pipeline configuration: file locations and forecasting settings shared by
//! the `demand-pipeline` stages.

use crate::features::{FeatureSchema, SchemaError};
use crate::forecast::{ForecastConfig, ForecastError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Locations and settings of one pipeline checkout.
///
/// Every field has a default, so a JSON file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned for the raw demand CSV
    pub raw_dir: PathBuf,
    /// Output of the melt stage
    pub long_path: PathBuf,
    pub processed_path: PathBuf,
    pub model_path: PathBuf,
    pub forecast_path: PathBuf,
    /// Days to forecast past the last observation
    pub horizon: i64,
    /// Days held out at the end of the processed table when training
    pub test_days: u32,
    pub schema: FeatureSchema,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            raw_dir: PathBuf::from("data/raw"),
            long_path: PathBuf::from("data/raw/m5_demand.csv"),
            processed_path: PathBuf::from("data/processed/processed.csv"),
            model_path: PathBuf::from("models/model.json"),
            forecast_path: PathBuf::from("reports/forecast.csv"),
            horizon: 28,
            test_days: 28,
            schema: FeatureSchema::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads a config from a JSON file and validates it.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config: PipelineConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schema.validate()?;
        self.forecast_config()?;
        Ok(())
    }

    /// Forecast settings for the predict stage.
    pub fn forecast_config(&self) -> Result<ForecastConfig, ConfigError> {
        ForecastConfig::new(self.horizon, self.schema.clone()).map_err(ConfigError::from)
    }
}

/// Errors raised while loading a pipeline config.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Schema(SchemaError),
    Forecast(ForecastError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Cannot read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Invalid config: {}", msg),
            ConfigError::Schema(err) => write!(f, "Invalid feature schema: {}", err),
            ConfigError::Forecast(err) => write!(f, "Invalid forecast settings: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<SchemaError> for ConfigError {
    fn from(err: SchemaError) -> Self {
        ConfigError::Schema(err)
    }
}

impl From<ForecastError> for ConfigError {
    fn from(err: ForecastError) -> Self {
        ConfigError::Forecast(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.raw_dir, PathBuf::from("data/raw"));
        assert_eq!(config.forecast_path, PathBuf::from("reports/forecast.csv"));
        assert_eq!(config.horizon, 28);
        assert_eq!(config.forecast_config().unwrap().horizon, 28);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"horizon": 7, "schema": {"lags": [1, 7], "roll_windows": [7]}}"#)
            .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.horizon, 7);
        assert_eq!(config.schema.lags, vec![1, 7]);
        assert_eq!(config.test_days, 28);
        assert_eq!(config.model_path, PathBuf::from("models/model.json"));
    }

    #[test]
    fn test_invalid_horizon_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"horizon": 0}"#).unwrap();

        assert_eq!(
            PipelineConfig::from_json_file(&path).unwrap_err(),
            ConfigError::Forecast(ForecastError::InvalidHorizon(0))
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = PipelineConfig::from_json_file("does/not/exist.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
