use approx::assert_abs_diff_eq;
use chrono::{NaiveDate, NaiveDateTime};
use forecast_pipeline::metrics::accuracy_from_pairs;
use forecast_pipeline::{
    compute_metrics, AccuracyMetrics, ForecastError, ForecastSeries, MetricsSink, RecordingSink,
    TracingSink,
};

fn ts(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 6, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn series(days: &[u32], values: &[Option<f64>]) -> ForecastSeries {
    ForecastSeries::new(days.iter().map(|&d| ts(d)).collect(), values.to_vec()).unwrap()
}

#[test]
fn test_regression_metrics() {
    let metrics = accuracy_from_pairs(&[10.0, 20.0, 30.0], &[12.0, 18.0, 33.0]).unwrap();

    assert_abs_diff_eq!(metrics.mse, 17.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(metrics.rmse, (17.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    assert_abs_diff_eq!(metrics.mae, 7.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(metrics.mape, 40.0 / 3.0, epsilon = 1e-9);
    assert_eq!(metrics.n_obs, 3);
    assert_eq!(metrics.n_mape_obs, 3);
}

#[test]
fn test_perfect_forecast() {
    let metrics = accuracy_from_pairs(&[5.0, 6.0, 7.0], &[5.0, 6.0, 7.0]).unwrap();

    assert_eq!(metrics.mse, 0.0);
    assert_eq!(metrics.rmse, 0.0);
    assert_eq!(metrics.mae, 0.0);
    assert_eq!(metrics.mape, 0.0);
}

#[test]
fn test_length_mismatch_and_empty_input() {
    assert!(matches!(
        accuracy_from_pairs(&[1.0, 2.0], &[1.0]),
        Err(ForecastError::ValidationError(_))
    ));
    assert!(matches!(
        accuracy_from_pairs(&[], &[]),
        Err(ForecastError::ValidationError(_))
    ));
}

#[test]
fn test_series_are_joined_on_timestamp() {
    let actual = series(&[1, 2, 3, 4], &[Some(10.0), Some(20.0), Some(30.0), None]);
    let predicted = series(&[2, 3, 4, 5], &[Some(18.0), None, Some(1.0), Some(9.0)]);

    let metrics = compute_metrics(&actual, &predicted).unwrap();

    // Only day 2 has a value on both sides
    assert_eq!(metrics.n_obs, 1);
    assert_abs_diff_eq!(metrics.mae, 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(metrics.mape, 10.0, epsilon = 1e-12);
}

#[test]
fn test_no_overlap_is_an_error() {
    let actual = series(&[1, 2], &[Some(1.0), Some(2.0)]);
    let predicted = series(&[3, 4], &[Some(1.0), Some(2.0)]);

    assert!(compute_metrics(&actual, &predicted).is_err());
}

#[test]
fn test_metric_names_and_sinks() {
    let metrics = accuracy_from_pairs(&[10.0, 20.0], &[11.0, 18.0]).unwrap();

    let mut sink = RecordingSink::new();
    metrics.log_to(&mut sink, "lr_1000_dominicks");
    assert_eq!(sink.metrics().len(), 4);
    assert_eq!(sink.get("lr_1000_dominicks_mae"), Some(1.5));
    assert_eq!(sink.get("lr_1000_dominicks_mse"), Some(2.5));
    assert!(sink.get("mae").is_none());

    let mut tracing_sink = TracingSink;
    let sink: &mut dyn MetricsSink = &mut tracing_sink;
    metrics.log_to(sink, "lr_1000_dominicks");
}

#[test]
fn test_display_and_serialization() {
    let metrics = accuracy_from_pairs(&[10.0, 20.0, 30.0], &[12.0, 18.0, 33.0]).unwrap();

    let text = metrics.to_string();
    assert!(text.contains("(3 obs)"));
    assert!(text.contains("MAE:   2.3333"));
    assert!(text.contains("MAPE:  13.3333%"));

    let json = serde_json::to_string(&metrics).unwrap();
    let restored: AccuracyMetrics = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, metrics);
}
