pub mod series_key;
pub mod time_series;
pub mod features;
pub mod dataset;
pub mod melt;
pub mod preprocess;
pub mod model;
pub mod train;
pub mod forecast;
pub mod orchestrator;
pub mod artifact;
pub mod config;
pub mod server;


pub use series_key::{SeriesKey, SeriesKeyError, ALL};
pub use time_series::{
    group_by_series, partition_by_series, DateRange, DemandPoint, HistoryError, ObservationRow,
    SeriesHistory,
};
pub use features::{CalendarFeatures, FeatureRow, FeatureSchema, LagRollFeaturizer, SchemaError};
pub use dataset::{read_observations, read_training_rows, DatasetError, TrainingRow};
pub use preprocess::{ensure_date_continuity, fill_missing_days, preprocess, PreprocessSummary};
pub use model::{DemandModel, FitOptions, LinearDemandModel, ModelError};
pub use train::{time_split, train, TrainError, TrainSummary};
pub use forecast::{
    forecast_series, ForecastConfig, ForecastError, ForecastRow, RecursiveForecaster,
    SimulationState,
};
pub use orchestrator::{BatchForecast, ForecastOrchestrator, SeriesFailure};
pub use artifact::{query_forecasts, read_forecasts, write_forecasts, ForecastQuery, QueryError};
pub use config::{ConfigError, PipelineConfig};
pub use server::{run_server, ApiError, AppState, ServerConfig};
