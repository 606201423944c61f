//! Error types for the many_models crate

use forecast_pipeline::ForecastError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManyModelsError {
    /// Error raised while loading, fitting or forecasting a pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] ForecastError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error writing forecast or summary CSV output
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No pipeline has been stored under the requested tags
    #[error("No model stored for tags {0}")]
    ModelNotFound(String),

    /// Run settings that cannot be applied to the input data
    #[error("Settings error: {0}")]
    SettingsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ManyModelsError>;
