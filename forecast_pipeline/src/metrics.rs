//! Metrics for evaluating forecast accuracy

use crate::error::{ForecastError, Result};
use crate::series::ForecastSeries;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{info, warn};

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
    /// Number of paired observations
    pub n_obs: usize,
    /// Number of pairs with a non-zero actual, used for MAPE
    pub n_mape_obs: usize,
}

/// Compare an actual series with a forecast series.
///
/// Only timestamps present in both with a value on both sides are used.
pub fn compute_metrics(actual: &ForecastSeries, predicted: &ForecastSeries) -> Result<AccuracyMetrics> {
    let (actual_values, predicted_values): (Vec<f64>, Vec<f64>) = actual
        .iter()
        .filter_map(|(timestamp, value)| Some((value?, predicted.get(timestamp)?)))
        .unzip();

    accuracy_from_pairs(&actual_values, &predicted_values)
}

/// Calculate accuracy metrics for position-aligned actual and forecast values.
///
/// Pairs whose actual value is exactly zero are left out of the MAPE average
/// (and only of it). MAPE is NaN when no such pair remains.
pub fn accuracy_from_pairs(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted.iter())
        .map(|(&a, &p)| a - p)
        .collect();

    let mse = errors.iter().map(|e| e.powi(2)).mean();
    let mae = errors.iter().map(|e| e.abs()).mean();

    let percentage_errors: Vec<f64> = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e / a).abs() * 100.0)
        .collect();
    let excluded = actual.len() - percentage_errors.len();
    if excluded > 0 {
        warn!(excluded, "Excluded zero actual values from MAPE");
    }
    let mape = if percentage_errors.is_empty() {
        f64::NAN
    } else {
        percentage_errors.iter().mean()
    };

    Ok(AccuracyMetrics {
        mse,
        rmse: mse.sqrt(),
        mae,
        mape,
        n_obs: actual.len(),
        n_mape_obs: percentage_errors.len(),
    })
}

impl AccuracyMetrics {
    /// Log each metric as `<prefix>_<metric>`
    pub fn log_to(&self, sink: &mut dyn MetricsSink, prefix: &str) {
        sink.log_metric(&format!("{}_mse", prefix), self.mse);
        sink.log_metric(&format!("{}_rmse", prefix), self.rmse);
        sink.log_metric(&format!("{}_mae", prefix), self.mae);
        sink.log_metric(&format!("{}_mape", prefix), self.mape);
    }
}

impl std::fmt::Display for AccuracyMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics ({} obs):", self.n_obs)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        Ok(())
    }
}

/// Destination for named metric values
pub trait MetricsSink {
    fn log_metric(&mut self, name: &str, value: f64);
}

/// Keeps every logged metric in order
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    metrics: Vec<(String, f64)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &[(String, f64)] {
        &self.metrics
    }

    /// Most recent value logged under `name`
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

impl MetricsSink for RecordingSink {
    fn log_metric(&mut self, name: &str, value: f64) {
        self.metrics.push((name.to_string(), value));
    }
}

/// Emits each metric as an `info` event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn log_metric(&mut self, name: &str, value: f64) {
        info!(metric = name, value, "Logged metric");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_actual_excluded_from_mape_only() {
        let metrics = accuracy_from_pairs(&[0.0, 10.0], &[1.0, 11.0]).unwrap();

        assert_eq!(metrics.n_obs, 2);
        assert_eq!(metrics.n_mape_obs, 1);
        assert_abs_diff_eq!(metrics.mae, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(metrics.mape, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_all_zero_actuals_give_nan_mape() {
        let metrics = accuracy_from_pairs(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert!(metrics.mape.is_nan());
        assert_abs_diff_eq!(metrics.mse, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_to_names() {
        let metrics = accuracy_from_pairs(&[10.0], &[12.0]).unwrap();
        let mut sink = RecordingSink::new();
        metrics.log_to(&mut sink, "lr_store1");

        let names: Vec<&str> = sink.metrics().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["lr_store1_mse", "lr_store1_rmse", "lr_store1_mae", "lr_store1_mape"]);
        assert_eq!(sink.get("lr_store1_mae"), Some(2.0));
    }
}
