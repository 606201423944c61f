//! Error types for the forecast_pipeline crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the forecast_pipeline crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Invalid pipeline configuration: bad lag orders, missing required columns,
    /// wrong time column, or not enough history for the configured lags
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Every training row was removed by the missing-value filter
    #[error("Training data is empty after dropping {rows_before} row(s) with missing values")]
    EmptyTrainingDataError { rows_before: usize },

    /// Every prediction row was removed by the missing-value filter
    #[error("Prediction data is empty after dropping {rows_before} row(s) with missing values")]
    NonEmptyPredictionRequiredError { rows_before: usize },

    /// Columns that cannot be fed to a regression estimator
    #[error("Found non-numeric columns {0:?}; drop them prior to modeling")]
    NonNumericColumnError(Vec<String>),

    /// Prediction-time feature columns differ from the fitted ones
    #[error("Input columns {found:?} do not match expected columns {expected:?}")]
    ColumnMismatchError {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A transform, estimator or forecaster was used before `fit`
    #[error("Not fitted: {0}")]
    NotFittedError(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error raised by the underlying regression model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from (de)serializing configuration or pipeline state
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
