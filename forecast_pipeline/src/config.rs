//! Pipeline configuration
//!
//! ```json
//! {
//!   "target_column": "Quantity",
//!   "time_column": "WeekStarting",
//!   "drop_columns": ["Revenue", "Store", "Brand"],
//!   "lag_orders": [1, 2, 3, 4],
//!   "calendar_feature": "week_of_year",
//!   "estimator": { "kind": "linear_regression", "fit_intercept": true }
//! }
//! ```

use crate::error::{ForecastError, Result};
use crate::estimators::{AnyRegressor, LinearRegression, RidgeRegression};
use crate::forecaster::SimpleForecaster;
use crate::transforms::{
    validate_lag_orders, CalendarFeature, ColumnDropper, NamedStep, SimpleCalendarFeaturizer,
    SimpleLagger,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which regression estimator to train
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorConfig {
    LinearRegression {
        #[serde(default = "default_true")]
        fit_intercept: bool,
    },
    Ridge {
        alpha: f64,
        #[serde(default = "default_true")]
        fit_intercept: bool,
    },
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig::LinearRegression {
            fit_intercept: true,
        }
    }
}

impl EstimatorConfig {
    pub fn build(&self) -> Result<AnyRegressor> {
        match *self {
            EstimatorConfig::LinearRegression { fit_intercept } => Ok(
                AnyRegressor::LinearRegression(LinearRegression::with_intercept(fit_intercept)),
            ),
            EstimatorConfig::Ridge {
                alpha,
                fit_intercept,
            } => Ok(AnyRegressor::Ridge(
                RidgeRegression::new(alpha)?.with_intercept(fit_intercept),
            )),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_lag_orders() -> Vec<usize> {
    vec![1, 2, 3, 4]
}

/// Everything needed to build a forecasting pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub target_column: String,
    pub time_column: String,
    #[serde(default)]
    pub drop_columns: Vec<String>,
    #[serde(default = "default_lag_orders")]
    pub lag_orders: Vec<usize>,
    #[serde(default)]
    pub calendar_feature: CalendarFeature,
    #[serde(default)]
    pub estimator: EstimatorConfig,
}

impl PipelineConfig {
    /// Configuration with default lags, calendar feature and estimator
    pub fn new(target_column: impl Into<String>, time_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            time_column: time_column.into(),
            drop_columns: Vec::new(),
            lag_orders: default_lag_orders(),
            calendar_feature: CalendarFeature::default(),
            estimator: EstimatorConfig::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_column.trim().is_empty() {
            return Err(ForecastError::ConfigurationError(
                "Target column name is empty".to_string(),
            ));
        }
        if self.time_column.trim().is_empty() {
            return Err(ForecastError::ConfigurationError(
                "Time column name is empty".to_string(),
            ));
        }
        if self.target_column == self.time_column {
            return Err(ForecastError::ConfigurationError(format!(
                "Target and time column are both '{}'",
                self.target_column
            )));
        }
        if self.drop_columns.contains(&self.target_column) {
            return Err(ForecastError::ConfigurationError(format!(
                "Target column '{}' cannot be dropped",
                self.target_column
            )));
        }
        validate_lag_orders(&self.lag_orders)?;
        self.estimator.build()?;
        Ok(())
    }

    /// Build the standard `column_dropper -> calendar_featurizer -> lagger` chain
    pub fn build_forecaster(&self) -> Result<SimpleForecaster<AnyRegressor>> {
        self.validate()?;
        let steps = vec![
            NamedStep::new("column_dropper", ColumnDropper::new(self.drop_columns.clone())),
            NamedStep::new(
                "calendar_featurizer",
                SimpleCalendarFeaturizer::new(self.calendar_feature),
            ),
            NamedStep::new(
                "lagger",
                SimpleLagger::new(
                    self.target_column.clone(),
                    self.time_column.clone(),
                    self.lag_orders.clone(),
                )?,
            ),
        ];

        Ok(SimpleForecaster::new(
            steps,
            self.estimator.build()?,
            self.target_column.clone(),
            self.time_column.clone(),
        ))
    }
}
