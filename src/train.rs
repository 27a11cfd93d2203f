//! Model training with a time-based holdout.

use crate::dataset::{read_training_rows, DatasetError, TrainingRow};
use crate::features::{mean_absolute_error, FeatureSchema};
use crate::model::{DemandModel, FitOptions, LinearDemandModel, ModelError};
use chrono::Days;
use std::path::Path;
use tracing::info;

/// Splits rows at `max(date) - test_days`: rows on or before the cutoff train,
/// later rows test. Order within each side is preserved.
pub fn time_split(rows: &[TrainingRow], test_days: u32) -> (Vec<TrainingRow>, Vec<TrainingRow>) {
    let last = match rows.iter().map(|row| row.features.date).max() {
        Some(last) => last,
        None => return (Vec::new(), Vec::new()),
    };
    let cutoff = match last.checked_sub_days(Days::new(u64::from(test_days))) {
        Some(cutoff) => cutoff,
        None => return (Vec::new(), rows.to_vec()),
    };

    rows.iter()
        .cloned()
        .partition(|row| row.features.date <= cutoff)
}

/// Outcome of [`train`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Holdout mean absolute error, `None` when the holdout is empty
    pub mae: Option<f64>,
    pub model: LinearDemandModel,
}

/// Fits a model on the training side of a time split and scores the holdout.
pub fn fit_and_evaluate(
    rows: &[TrainingRow],
    schema: &FeatureSchema,
    test_days: u32,
    options: FitOptions,
) -> Result<TrainSummary, TrainError> {
    let (train, test) = time_split(rows, test_days);

    let features: Vec<Vec<f64>> = train.iter().map(|row| row.features.to_vector()).collect();
    let targets: Vec<f64> = train.iter().map(|row| row.demand).collect();
    let model = LinearDemandModel::fit(&features, &targets, schema.column_names(), options)?;

    let mae = if test.is_empty() {
        None
    } else {
        let actual: Vec<f64> = test.iter().map(|row| row.demand).collect();
        let predicted = test
            .iter()
            .map(|row| model.predict(&row.features.to_vector()))
            .collect::<Result<Vec<_>, _>>()?;
        Some(mean_absolute_error(&actual, &predicted))
    };

    Ok(TrainSummary {
        train_rows: train.len(),
        test_rows: test.len(),
        mae,
        model,
    })
}

/// Trains on the processed table and writes the model to `model_path`.
pub fn train(
    processed_path: &Path,
    model_path: &Path,
    schema: &FeatureSchema,
    test_days: u32,
    options: FitOptions,
) -> Result<TrainSummary, TrainError> {
    let rows = read_training_rows(processed_path, schema)?;
    info!(path = %processed_path.display(), rows = rows.len(), "Loaded processed dataset");

    let summary = fit_and_evaluate(&rows, schema, test_days, options)?;
    summary.model.save(model_path)?;

    info!(
        train_rows = summary.train_rows,
        test_rows = summary.test_rows,
        mae = ?summary.mae,
        path = %model_path.display(),
        "Saved model"
    );
    Ok(summary)
}

/// Errors raised by the training stage.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainError {
    Dataset(DatasetError),
    Model(ModelError),
}

impl std::fmt::Display for TrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainError::Dataset(err) => write!(f, "Dataset error: {}", err),
            TrainError::Model(err) => write!(f, "Model error: {}", err),
        }
    }
}

impl std::error::Error for TrainError {}

impl From<DatasetError> for TrainError {
    fn from(err: DatasetError) -> Self {
        TrainError::Dataset(err)
    }
}

impl From<ModelError> for TrainError {
    fn from(err: ModelError) -> Self {
        TrainError::Model(err)
    }
}
