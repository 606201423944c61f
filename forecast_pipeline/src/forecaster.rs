//! One-step-ahead forecaster with recursive multi-step forecasts
//!
//! The estimator is trained to predict the target one step ahead from lag
//! features. Forecasting a frame splits its index at the latest training
//! timestamp:
//!
//! - rows at or before it already carry actual target values, so the whole
//!   pipeline runs once over them;
//! - rows after it are forecast one timestamp at a time, each prediction being
//!   written back as the target so the next step's lags can see it.

use crate::data::{Column, ColumnData, TimeSeriesFrame};
use crate::error::{ForecastError, Result};
use crate::estimators::{Regressor, RegressorWrapper};
use crate::series::ForecastSeries;
use crate::transforms::{FrameTransform, NamedStep};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Transform chain plus wrapped estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleForecaster<R> {
    steps: Vec<NamedStep>,
    estimator: RegressorWrapper<R>,
    target_column: String,
    time_column: String,
    /// Latest index value seen by `fit`; `None` while unfit
    latest_training_date: Option<NaiveDateTime>,
}

impl<R: Regressor> SimpleForecaster<R> {
    pub fn new(
        steps: Vec<NamedStep>,
        regressor: R,
        target_column: impl Into<String>,
        time_column: impl Into<String>,
    ) -> Self {
        let target_column = target_column.into();
        Self {
            steps,
            estimator: RegressorWrapper::new(regressor, target_column.clone()),
            target_column,
            time_column: time_column.into(),
            latest_training_date: None,
        }
    }

    pub fn steps(&self) -> &[NamedStep] {
        &self.steps
    }

    pub fn estimator(&self) -> &RegressorWrapper<R> {
        &self.estimator
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn latest_training_date(&self) -> Option<NaiveDateTime> {
        self.latest_training_date
    }

    pub fn is_fitted(&self) -> bool {
        self.latest_training_date.is_some()
    }

    /// Fit every transform and the estimator on `frame`.
    ///
    /// Refitting replaces all previous state. If fitting fails the forecaster is
    /// left unfit.
    pub fn fit(&mut self, frame: &TimeSeriesFrame) -> Result<()> {
        self.check_time_column(frame)?;
        self.latest_training_date = None;
        let latest = frame
            .last_timestamp()
            .ok_or(ForecastError::EmptyTrainingDataError { rows_before: 0 })?;

        let mut transformed = frame.clone();
        for named in &mut self.steps {
            transformed = named.step.fit_transform(&transformed)?;
            debug!(
                step = %named.name,
                columns = transformed.width(),
                "Fitted transform step"
            );
        }
        self.estimator.fit(&transformed)?;

        self.latest_training_date = Some(latest);
        info!(
            rows = frame.len(),
            latest_training_date = %latest,
            "Fitted forecasting pipeline"
        );
        Ok(())
    }

    /// Run `frame` through the fitted transform chain
    pub fn transform(&self, frame: &TimeSeriesFrame) -> Result<TimeSeriesFrame> {
        self.check_fitted()?;
        self.check_time_column(frame)?;
        self.apply_steps(frame)
    }

    /// Forecast the target over `frame`.
    ///
    /// The result has exactly `frame`'s index; timestamps without a forecast hold
    /// missing values.
    pub fn forecast(&self, frame: &TimeSeriesFrame) -> Result<ForecastSeries> {
        let latest = self.check_fitted()?;
        self.check_time_column(frame)?;

        let (in_sample, out_of_sample) = frame.split_at_timestamp(latest);
        debug!(
            in_sample = in_sample.len(),
            out_of_sample = out_of_sample.len(),
            "Partitioned forecast frame"
        );

        let mut forecasts = ForecastSeries::default();
        if !in_sample.is_empty() {
            forecasts = tolerate_empty_prediction(self.predict(&in_sample))?;
        }
        if !out_of_sample.is_empty() {
            let recursive = self.recursive_forecast(&out_of_sample)?;
            forecasts = forecasts.merge(&recursive)?;
        }

        let forecasts = forecasts.reindex(frame.index());
        info!(
            requested = frame.len(),
            produced = forecasts.observed_count(),
            "Produced forecasts"
        );
        Ok(forecasts)
    }

    /// Apply the one-step model one timestamp at a time over `frame`.
    fn recursive_forecast(&self, frame: &TimeSeriesFrame) -> Result<ForecastSeries> {
        let mut working = if frame.has_column(&self.target_column) {
            frame.clone()
        } else {
            frame.with_column(Column::new(
                self.target_column.clone(),
                ColumnData::missing_numeric(frame.len()),
            ))?
        };

        let mut values = Vec::with_capacity(working.len());
        for (row, &timestamp) in frame.index().iter().enumerate() {
            let window = working.head(row + 1);
            let prediction = tolerate_empty_prediction(self.predict(&window))?.get(timestamp);
            debug!(%timestamp, ?prediction, "Recursive forecast step");

            values.push(prediction);
            working.set_numeric(&self.target_column, row, prediction)?;
        }

        ForecastSeries::new(frame.index().to_vec(), values)
    }

    fn predict(&self, frame: &TimeSeriesFrame) -> Result<ForecastSeries> {
        let transformed = self.apply_steps(frame)?;
        self.estimator.predict(&transformed)
    }

    fn apply_steps(&self, frame: &TimeSeriesFrame) -> Result<TimeSeriesFrame> {
        let mut transformed = frame.clone();
        for named in &self.steps {
            transformed = named.step.transform(&transformed)?;
        }
        Ok(transformed)
    }

    fn check_fitted(&self) -> Result<NaiveDateTime> {
        self.latest_training_date.ok_or_else(|| {
            ForecastError::NotFittedError("SimpleForecaster has not been fitted".to_string())
        })
    }

    fn check_time_column(&self, frame: &TimeSeriesFrame) -> Result<()> {
        if frame.time_column() != self.time_column {
            return Err(ForecastError::ConfigurationError(format!(
                "Expected time column '{}' to comprise the frame index, found '{}'",
                self.time_column,
                frame.time_column()
            )));
        }
        Ok(())
    }
}

impl<R> SimpleForecaster<R>
where
    R: Regressor + Serialize + DeserializeOwned,
{
    /// Serialize the full pipeline state
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Restore a pipeline written by [`SimpleForecaster::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Treat "no rows left to predict" as an empty forecast rather than a failure
fn tolerate_empty_prediction(result: Result<ForecastSeries>) -> Result<ForecastSeries> {
    match result {
        Err(ForecastError::NonEmptyPredictionRequiredError { rows_before }) => {
            debug!(rows_before, "No complete rows to predict; leaving forecasts missing");
            Ok(ForecastSeries::default())
        }
        other => other,
    }
}
