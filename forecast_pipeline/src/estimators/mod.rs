//! Regression estimators and their adapter onto time-indexed frames

use crate::data::TimeSeriesFrame;
use crate::error::{ForecastError, Result};
use crate::series::ForecastSeries;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod linear;

pub use linear::{LinearRegression, RidgeRegression};

/// A tabular regression estimator.
///
/// Rows of `features` are observations and line up by position with `target`
/// at fit time and with the returned predictions at predict time.
pub trait Regressor {
    /// Fit the estimator
    fn fit(&mut self, features: &DMatrix<f64>, target: &DVector<f64>) -> Result<()>;

    /// Predict one value per feature row
    fn predict(&self, features: &DMatrix<f64>) -> Result<DVector<f64>>;

    /// Name of the estimator
    fn name(&self) -> &str;
}

/// Estimators selectable from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyRegressor {
    LinearRegression(LinearRegression),
    Ridge(RidgeRegression),
}

impl Regressor for AnyRegressor {
    fn fit(&mut self, features: &DMatrix<f64>, target: &DVector<f64>) -> Result<()> {
        match self {
            AnyRegressor::LinearRegression(model) => model.fit(features, target),
            AnyRegressor::Ridge(model) => model.fit(features, target),
        }
    }

    fn predict(&self, features: &DMatrix<f64>) -> Result<DVector<f64>> {
        match self {
            AnyRegressor::LinearRegression(model) => model.predict(features),
            AnyRegressor::Ridge(model) => model.predict(features),
        }
    }

    fn name(&self) -> &str {
        match self {
            AnyRegressor::LinearRegression(model) => model.name(),
            AnyRegressor::Ridge(model) => model.name(),
        }
    }
}

/// Runs a [`Regressor`] directly on a frame holding the target as a column.
///
/// Rows with any missing value are dropped before fitting and before
/// predicting; nothing is imputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressorWrapper<R> {
    regressor: R,
    target_column: String,
    /// Feature column order seen at fit time
    feature_columns: Option<Vec<String>>,
}

impl<R: Regressor> RegressorWrapper<R> {
    pub fn new(regressor: R, target_column: impl Into<String>) -> Self {
        Self {
            regressor,
            target_column: target_column.into(),
            feature_columns: None,
        }
    }

    pub fn regressor(&self) -> &R {
        &self.regressor
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Fitted feature column order
    pub fn feature_columns(&self) -> Option<&[String]> {
        self.feature_columns.as_deref()
    }

    /// Fit on every complete row of `frame`
    pub fn fit(&mut self, frame: &TimeSeriesFrame) -> Result<()> {
        if !frame.has_column(&self.target_column) {
            return Err(ForecastError::ConfigurationError(format!(
                "Target column '{}' is missing from the input frame",
                self.target_column
            )));
        }

        let rows_before = frame.len();
        let complete = frame.drop_missing_rows()?;
        debug!(
            rows_before,
            rows_after = complete.len(),
            "Dropped training rows with missing values"
        );
        if complete.is_empty() {
            return Err(ForecastError::EmptyTrainingDataError { rows_before });
        }

        let non_numeric = complete.non_numeric_columns();
        if !non_numeric.is_empty() {
            return Err(ForecastError::NonNumericColumnError(non_numeric));
        }

        let target_values = complete.numeric(&self.target_column)?;
        let target = DVector::from_iterator(
            complete.len(),
            target_values.iter().map(|v| v.unwrap_or(f64::NAN)),
        );
        let feature_columns: Vec<String> = complete
            .column_names()
            .into_iter()
            .filter(|c| *c != self.target_column)
            .collect();
        let features = feature_matrix(&complete, &feature_columns)?;

        self.regressor.fit(&features, &target)?;
        debug!(
            estimator = self.regressor.name(),
            rows = complete.len(),
            features = feature_columns.len(),
            "Fitted estimator"
        );
        self.feature_columns = Some(feature_columns);
        Ok(())
    }

    /// Predict for every complete row of `frame`.
    ///
    /// The target column is ignored if present. The returned series is indexed by
    /// the rows that survived the missing-value drop.
    pub fn predict(&self, frame: &TimeSeriesFrame) -> Result<ForecastSeries> {
        let expected = self.feature_columns.as_ref().ok_or_else(|| {
            ForecastError::NotFittedError("RegressorWrapper::predict called before fit".to_string())
        })?;

        let found: Vec<String> = frame
            .column_names()
            .into_iter()
            .filter(|c| *c != self.target_column)
            .collect();
        let same_set = found.len() == expected.len() && found.iter().all(|c| expected.contains(c));
        if !same_set {
            return Err(ForecastError::ColumnMismatchError {
                expected: expected.clone(),
                found,
            });
        }

        let selected = frame.select(&expected[..])?;
        let rows_before = selected.len();
        let complete = selected.drop_missing_rows()?;
        debug!(
            rows_before,
            rows_after = complete.len(),
            "Dropped prediction rows with missing values"
        );
        if complete.is_empty() {
            return Err(ForecastError::NonEmptyPredictionRequiredError { rows_before });
        }

        let features = feature_matrix(&complete, expected)?;
        let predictions = self.regressor.predict(&features)?;
        if predictions.len() != complete.len() {
            return Err(ForecastError::ModelError(format!(
                "{} returned {} predictions for {} rows",
                self.regressor.name(),
                predictions.len(),
                complete.len()
            )));
        }

        ForecastSeries::new(
            complete.index().to_vec(),
            predictions
                .iter()
                .map(|&v| if v.is_nan() { None } else { Some(v) })
                .collect(),
        )
    }
}

/// Column-major feature matrix of the named numeric columns
fn feature_matrix(frame: &TimeSeriesFrame, columns: &[String]) -> Result<DMatrix<f64>> {
    let mut data = Vec::with_capacity(frame.len() * columns.len());
    for name in columns {
        data.extend(frame.numeric(name)?.into_iter().map(|v| v.unwrap_or(f64::NAN)));
    }
    Ok(DMatrix::from_vec(frame.len(), columns.len(), data))
}
