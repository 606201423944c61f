//! Lag features of the target with continuity across train/test splits
//!
//! At fit time the lagger keeps the last `max(lag_orders)` training rows. When
//! it is later asked to transform a frame that starts strictly after those rows,
//! it prepends them before shifting so that the first rows of the new frame get
//! the same lag values they would have had in the unsplit series.

use super::FrameTransform;
use crate::data::{Column, ColumnData, TimeSeriesFrame};
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// State captured by [`SimpleLagger::fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaggerState {
    /// Last `max(lag_orders)` rows of the fitted frame
    train_tail: TimeSeriesFrame,
    /// Column order of the fitted frame
    column_order: Vec<String>,
}

impl LaggerState {
    pub fn train_tail(&self) -> &TimeSeriesFrame {
        &self.train_tail
    }

    pub fn column_order(&self) -> &[String] {
        &self.column_order
    }
}

/// Check that lag orders are non-empty, positive and distinct
pub fn validate_lag_orders(lag_orders: &[usize]) -> Result<()> {
    if lag_orders.is_empty() {
        return Err(ForecastError::ConfigurationError(
            "Expected at least one lag order".to_string(),
        ));
    }
    if lag_orders.contains(&0) {
        return Err(ForecastError::ConfigurationError(format!(
            "Expected lag orders all greater than zero, got {:?}",
            lag_orders
        )));
    }
    for (i, order) in lag_orders.iter().enumerate() {
        if lag_orders[..i].contains(order) {
            return Err(ForecastError::ConfigurationError(format!(
                "Duplicate lag order {} in {:?}",
                order, lag_orders
            )));
        }
    }
    Ok(())
}

/// Creates `lag_<k>` columns of the target column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleLagger {
    target_column: String,
    time_column: String,
    lag_orders: Vec<usize>,
    #[serde(default)]
    state: Option<LaggerState>,
}

impl SimpleLagger {
    pub fn new(
        target_column: impl Into<String>,
        time_column: impl Into<String>,
        lag_orders: Vec<usize>,
    ) -> Result<Self> {
        validate_lag_orders(&lag_orders)?;
        Ok(Self {
            target_column: target_column.into(),
            time_column: time_column.into(),
            lag_orders,
            state: None,
        })
    }

    /// Name of the column holding lag `order`
    pub fn lag_column_name(order: usize) -> String {
        format!("lag_{}", order)
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn lag_orders(&self) -> &[usize] {
        &self.lag_orders
    }

    pub fn max_lag_order(&self) -> usize {
        self.lag_orders.iter().copied().max().unwrap_or(0)
    }

    /// Fitted state, if `fit` has been called
    pub fn state(&self) -> Option<&LaggerState> {
        self.state.as_ref()
    }

    /// Fit with the target supplied separately from the frame
    pub fn fit_with_target(&mut self, frame: &TimeSeriesFrame, target: &[Option<f64>]) -> Result<()> {
        let with_target =
            frame.with_column(Column::numeric(self.target_column.clone(), target.to_vec()))?;
        self.fit(&with_target)
    }

    fn check_time_column(&self, frame: &TimeSeriesFrame) -> Result<()> {
        if frame.time_column() != self.time_column {
            return Err(ForecastError::ConfigurationError(format!(
                "Expected time column '{}' to be the sole index, found '{}'",
                self.time_column,
                frame.time_column()
            )));
        }
        Ok(())
    }

    fn check_history(&self, rows: usize) -> Result<()> {
        let max_lag = self.max_lag_order();
        if rows <= max_lag {
            return Err(ForecastError::ConfigurationError(format!(
                "Lag order {} needs more than {} row(s) of history",
                max_lag, rows
            )));
        }
        Ok(())
    }
}

impl FrameTransform for SimpleLagger {
    fn fit(&mut self, frame: &TimeSeriesFrame) -> Result<()> {
        validate_lag_orders(&self.lag_orders)?;
        self.check_time_column(frame)?;
        if !frame.has_column(&self.target_column) {
            return Err(ForecastError::ConfigurationError(format!(
                "Target column '{}' is missing from the input frame",
                self.target_column
            )));
        }
        frame.numeric_series(&self.target_column)?;
        self.check_history(frame.len())?;

        let train_tail = frame.tail(self.max_lag_order());
        debug!(
            tail_rows = train_tail.len(),
            tail_end = ?train_tail.last_timestamp(),
            "Cached lagger training tail"
        );
        self.state = Some(LaggerState {
            column_order: frame.column_names(),
            train_tail,
        });
        Ok(())
    }

    fn transform(&self, frame: &TimeSeriesFrame) -> Result<TimeSeriesFrame> {
        let state = self.state.as_ref().ok_or_else(|| {
            ForecastError::NotFittedError("SimpleLagger::transform called before fit".to_string())
        })?;
        self.check_time_column(frame)?;

        let added_target = !frame.has_column(&self.target_column);
        let working = if added_target {
            frame.with_column(Column::new(
                self.target_column.clone(),
                ColumnData::missing_numeric(frame.len()),
            ))?
        } else {
            frame.clone()
        };

        let continues_training = matches!(
            (state.train_tail.last_timestamp(), working.first_timestamp()),
            (Some(train_latest), Some(earliest)) if train_latest < earliest
        );
        let history = if continues_training {
            debug!(
                tail_rows = state.train_tail.len(),
                "Prepending training tail for lag continuity"
            );
            state
                .train_tail
                .concat(&working.select(&state.column_order[..])?)?
        } else {
            working
        };
        if !history.is_empty() {
            self.check_history(history.len())?;
        }

        let target = history.numeric_series(&self.target_column)?;
        let mut lagged = history.clone();
        for &order in &self.lag_orders {
            let mut lag = target.shift(order as i64);
            lag.rename(&Self::lag_column_name(order));
            lagged = lagged.with_series(lag)?;
        }

        let mut output = match frame.first_timestamp() {
            Some(earliest) => lagged.rows_from(earliest),
            None => lagged,
        };
        if added_target {
            output = output.drop_columns(&[self.target_column.as_str()]);
        }
        Ok(output)
    }
}
