//! # Forecast Pipeline
//!
//! Small per-series forecasting pipelines: a chain of frame transforms feeding a
//! one-step-ahead regression estimator, applied recursively to forecast any
//! horizon.
//!
//! ## Features
//!
//! - Time-indexed frames loaded from CSV through polars
//! - Transforms: column dropping, calendar features, target lags that stay
//!   continuous across a train/test split
//! - Linear and ridge regression behind a [`Regressor`] trait
//! - In-sample and recursive out-of-sample forecasts
//! - MSE / RMSE / MAE / MAPE accuracy metrics
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_pipeline::{compute_metrics, DataLoader, ForecastSeries, PipelineConfig};
//! use forecast_pipeline::utils::train_test_split;
//!
//! # fn main() -> forecast_pipeline::Result<()> {
//! let data = DataLoader::from_csv("store1_brand1.csv", "WeekStarting")?;
//! let (train, test) = train_test_split(&data, 8)?;
//!
//! let config = PipelineConfig::new("Quantity", "WeekStarting");
//! let mut forecaster = config.build_forecaster()?;
//! forecaster.fit(&train)?;
//!
//! let forecasts = forecaster.forecast(&test)?;
//! let actuals = ForecastSeries::from_frame_column(&test, "Quantity")?;
//! println!("{}", compute_metrics(&actuals, &forecasts)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod estimators;
pub mod forecaster;
pub mod metrics;
pub mod series;
pub mod transforms;
pub mod utils;

// Re-export commonly used types
pub use crate::config::{EstimatorConfig, PipelineConfig};
pub use crate::data::{Column, ColumnData, DataLoader, TimeSeriesFrame};
pub use crate::error::{ForecastError, Result};
pub use crate::estimators::{AnyRegressor, LinearRegression, Regressor, RegressorWrapper, RidgeRegression};
pub use crate::forecaster::SimpleForecaster;
pub use crate::metrics::{compute_metrics, AccuracyMetrics, MetricsSink, RecordingSink, TracingSink};
pub use crate::series::ForecastSeries;
pub use crate::transforms::{
    CalendarFeature, ColumnDropper, FrameTransform, NamedStep, SimpleCalendarFeaturizer,
    SimpleLagger, TransformStep,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
