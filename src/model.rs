//! Point-prediction models.
//!
//! The forecasting core only needs one capability from a model: turn one
//! feature vector into one demand prediction. Anything implementing
//! [`DemandModel`] can be plugged in, including plain closures for tests.

use crate::features::FeatureSchema;
use linfa::dataset::Dataset;
use linfa::traits::Fit;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One-step-ahead point predictor.
///
/// `features` follows the column order of the schema the model was trained on.
/// Implementations must not hold visible mutable state: the same input always
/// yields the same output, and one model is shared read-only across series.
pub trait DemandModel: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;
}

impl<F> DemandModel for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        Ok(self(features))
    }
}

/// Options for fitting a [`LinearDemandModel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Ridge penalty. Keeps the fit solvable when a column is constant
    /// (e.g. `year` within a single calendar year).
    pub ridge_lambda: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions { ridge_lambda: 1.0 }
    }
}

/// Linear regression over the feature vector: `intercept + Σ βᵢ·xᵢ`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearDemandModel {
    /// Column names the coefficients belong to, in vector order
    pub feature_names: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearDemandModel {
    /// Fits the model by least squares.
    ///
    /// # Arguments
    /// * `features` - One feature vector per training row
    /// * `targets` - Observed demand for each row
    /// * `feature_names` - Column names, one per vector element
    ///
    /// # Errors
    /// Returns an error if there are no rows, if row widths disagree with
    /// `feature_names`, or if the solver fails.
    pub fn fit(
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: Vec<String>,
        options: FitOptions,
    ) -> Result<Self, ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if features.len() != targets.len() {
            return Err(ModelError::ShapeMismatch {
                expected: features.len(),
                actual: targets.len(),
            });
        }

        let width = feature_names.len();
        if let Some(row) = features.iter().find(|row| row.len() != width) {
            return Err(ModelError::ShapeMismatch {
                expected: width,
                actual: row.len(),
            });
        }

        let n = features.len();
        let flat: Vec<f64> = features.iter().flatten().copied().collect();
        let x = Array2::from_shape_vec((n, width), flat)
            .map_err(|e| ModelError::Fit(e.to_string()))?;
        let y = Array1::from(targets.to_vec());

        let (x, y) = augment_for_ridge(x, y, options.ridge_lambda);

        let dataset = Dataset::new(x, y);
        let fitted = LinearRegression::new()
            .with_intercept(true)
            .fit(&dataset)
            .map_err(|e| ModelError::Fit(format!("{:?}", e)))?;

        Ok(LinearDemandModel {
            feature_names,
            intercept: fitted.intercept(),
            coefficients: fitted.params().to_vec(),
        })
    }

    /// Loads a model previously written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Checks that `schema` produces the columns this model was fitted on,
    /// in the same order.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureMismatch` naming the columns only one side has.
    pub fn check_schema(&self, schema: &FeatureSchema) -> Result<(), ModelError> {
        let columns = schema.column_names();
        if columns == self.feature_names {
            return Ok(());
        }

        Err(ModelError::FeatureMismatch {
            model_only: self
                .feature_names
                .iter()
                .filter(|name| !columns.contains(name))
                .cloned()
                .collect(),
            schema_only: columns
                .iter()
                .filter(|name| !self.feature_names.contains(name))
                .cloned()
                .collect(),
        })
    }

    /// Writes the model as pretty JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl DemandModel for LinearDemandModel {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.coefficients.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }

        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features.iter())
            .map(|(beta, x)| beta * x)
            .sum();
        Ok(self.intercept + dot)
    }
}

/// Appends `sqrt(λ)·I` rows to the design matrix and zeros to the target,
/// which turns ordinary least squares into ridge regression.
fn augment_for_ridge(x: Array2<f64>, y: Array1<f64>, lambda: f64) -> (Array2<f64>, Array1<f64>) {
    if lambda <= 0.0 {
        return (x, y);
    }

    let (n, p) = x.dim();
    let sqrt_l = lambda.sqrt();

    let mut x_aug = Array2::<f64>::zeros((n + p, p));
    x_aug.slice_mut(ndarray::s![0..n, ..]).assign(&x);
    for j in 0..p {
        x_aug[[n + j, j]] = sqrt_l;
    }

    let mut y_aug = Array1::<f64>::zeros(n + p);
    y_aug.slice_mut(ndarray::s![0..n]).assign(&y);

    (x_aug, y_aug)
}

/// Errors raised by model fitting, persistence or prediction.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Feature vector width does not match what the model expects
    ShapeMismatch { expected: usize, actual: usize },
    /// Feature columns of the model and of the forecast schema differ.
    /// Both lists are empty when only the column order differs.
    FeatureMismatch {
        model_only: Vec<String>,
        schema_only: Vec<String>,
    },
    /// No training rows were supplied
    EmptyTrainingSet,
    /// The solver failed
    Fit(String),
    /// Reading or writing the model file failed
    Io(String),
    /// The model file is not valid JSON for this model
    Serde(String),
    /// Prediction failed for a model-specific reason
    Prediction(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::ShapeMismatch { expected, actual } => write!(
                f,
                "Feature vector has {} values, model expects {}",
                actual, expected
            ),
            ModelError::FeatureMismatch { model_only, schema_only } => {
                if model_only.is_empty() && schema_only.is_empty() {
                    write!(f, "Model and feature schema list their columns in a different order")
                } else {
                    write!(
                        f,
                        "Model was trained on [{}] but the feature schema has [{}]",
                        model_only.join(", "),
                        schema_only.join(", ")
                    )
                }
            }
            ModelError::EmptyTrainingSet => write!(f, "No training rows"),
            ModelError::Fit(msg) => write!(f, "Model fit failed: {}", msg),
            ModelError::Io(msg) => write!(f, "Model IO error: {}", msg),
            ModelError::Serde(msg) => write!(f, "Model format error: {}", msg),
            ModelError::Prediction(msg) => write!(f, "Prediction failed: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serde(err.to_string())
    }
}
