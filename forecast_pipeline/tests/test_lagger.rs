use chrono::{Duration, NaiveDate, NaiveDateTime};
use forecast_pipeline::data::Column;
use forecast_pipeline::{ForecastError, FrameTransform, SimpleLagger, TimeSeriesFrame};
use polars::prelude::DataType;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rstest::rstest;

fn weekly_index(n: usize) -> Vec<NaiveDateTime> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 6)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n).map(|i| start + Duration::weeks(i as i64)).collect()
}

fn sales_frame(quantity: Vec<f64>) -> TimeSeriesFrame {
    let price: Vec<f64> = (0..quantity.len()).map(|i| 2.0 + i as f64 * 0.1).collect();
    TimeSeriesFrame::from_numeric(
        "WeekStarting",
        weekly_index(quantity.len()),
        vec![("Quantity", quantity), ("Price", price)],
    )
    .unwrap()
}

fn lag_columns(frame: &TimeSeriesFrame, orders: &[usize]) -> Vec<Vec<Option<f64>>> {
    orders
        .iter()
        .map(|&k| frame.numeric(&SimpleLagger::lag_column_name(k)).unwrap())
        .collect()
}

/// Lags after fit(train) + transform(test) equal lags of the unsplit series.
fn assert_continuity(full: &TimeSeriesFrame, split: usize, lag_orders: &[usize]) {
    let train = full.head(split);
    let test = full.tail(full.len() - split);

    let mut split_lagger = SimpleLagger::new("Quantity", "WeekStarting", lag_orders.to_vec()).unwrap();
    split_lagger.fit(&train).unwrap();
    let from_split = split_lagger.transform(&test).unwrap();

    let mut full_lagger = SimpleLagger::new("Quantity", "WeekStarting", lag_orders.to_vec()).unwrap();
    full_lagger.fit(full).unwrap();
    let from_full = full_lagger
        .transform(full)
        .unwrap()
        .rows_from(test.first_timestamp().unwrap());

    assert_eq!(from_split.index(), test.index());
    assert_eq!(
        lag_columns(&from_split, lag_orders),
        lag_columns(&from_full, lag_orders),
        "split at {} with lags {:?}",
        split,
        lag_orders
    );
}

#[rstest]
#[case(vec![1], 5)]
#[case(vec![1, 2, 3, 4], 10)]
#[case(vec![3, 1], 4)]
#[case(vec![2, 5], 12)]
#[case(vec![4], 19)]
fn test_lag_continuity_across_split(#[case] lag_orders: Vec<usize>, #[case] split: usize) {
    let quantity: Vec<f64> = (0..20).map(|i| ((i * i) % 17 + i) as f64).collect();
    assert_continuity(&sales_frame(quantity), split, &lag_orders);
}

#[test]
fn test_lag_continuity_every_split_of_noisy_series() {
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 25.0).unwrap();
    let quantity: Vec<f64> = (0..40)
        .map(|i| 500.0 + 3.0 * i as f64 + noise.sample(&mut rng))
        .collect();
    let full = sales_frame(quantity);
    let lag_orders = [1, 2, 3, 4];

    for split in 5..full.len() {
        assert_continuity(&full, split, &lag_orders);
    }
}

#[test]
fn test_test_window_without_target() {
    let full = sales_frame(vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
    let train = full.head(4);
    let test = full.tail(2).drop_columns(&["Quantity"]);

    let mut lagger = SimpleLagger::new("Quantity", "WeekStarting", vec![1, 2]).unwrap();
    lagger.fit(&train).unwrap();
    let out = lagger.transform(&test).unwrap();

    assert!(!out.has_column("Quantity"));
    assert_eq!(out.column_names(), vec!["Price", "lag_1", "lag_2"]);
    assert_eq!(out.numeric("lag_1").unwrap(), &[Some(13.0), None]);
    assert_eq!(out.numeric("lag_2").unwrap(), &[Some(12.0), Some(13.0)]);
}

#[test]
fn test_lag_columns_are_nullable_floats() {
    let frame = sales_frame(vec![10.0, 11.0, 12.0, 13.0]);
    let mut lagger = SimpleLagger::new("Quantity", "WeekStarting", vec![3]).unwrap();
    let out = lagger.fit_transform(&frame).unwrap();

    let lag = out.dataframe().column("lag_3").unwrap();
    assert_eq!(lag.dtype(), &DataType::Float64);
    assert_eq!(lag.null_count(), 3);
    assert_eq!(out.numeric("lag_3").unwrap(), &[None, None, None, Some(10.0)]);
    assert!(out.non_numeric_columns().is_empty());
}

#[test]
fn test_extra_test_columns_follow_fitted_order() {
    let full = sales_frame(vec![1.0, 2.0, 3.0, 4.0]);
    let train = full.head(3);
    let test = full
        .tail(1)
        .with_column(Column::numeric("Promo", vec![Some(1.0)]))
        .unwrap();

    let mut lagger = SimpleLagger::new("Quantity", "WeekStarting", vec![1]).unwrap();
    lagger.fit(&train).unwrap();
    let out = lagger.transform(&test).unwrap();

    assert_eq!(out.column_names(), vec!["Quantity", "Price", "lag_1"]);
}

#[test]
fn test_fit_requires_target() {
    let frame = sales_frame(vec![1.0, 2.0, 3.0]).drop_columns(&["Quantity"]);
    let mut lagger = SimpleLagger::new("Quantity", "WeekStarting", vec![1]).unwrap();

    assert!(matches!(
        lagger.fit(&frame),
        Err(ForecastError::ConfigurationError(_))
    ));
}

#[test]
fn test_fit_with_separate_target() {
    let frame = sales_frame(vec![0.0, 0.0, 0.0]).drop_columns(&["Quantity"]);
    let mut lagger = SimpleLagger::new("Quantity", "WeekStarting", vec![1]).unwrap();
    lagger
        .fit_with_target(&frame, &[Some(5.0), Some(6.0), Some(7.0)])
        .unwrap();

    let tail = lagger.state().unwrap().train_tail();
    assert_eq!(tail.numeric("Quantity").unwrap(), &[Some(7.0)]);
}

#[rstest]
#[case(vec![3], 3)]
#[case(vec![1, 5], 4)]
fn test_lag_order_needs_history(#[case] lag_orders: Vec<usize>, #[case] rows: usize) {
    let frame = sales_frame((0..rows).map(|i| i as f64).collect());
    let mut lagger = SimpleLagger::new("Quantity", "WeekStarting", lag_orders).unwrap();

    assert!(matches!(
        lagger.fit(&frame),
        Err(ForecastError::ConfigurationError(_))
    ));
}

#[test]
fn test_in_sample_window_too_short_for_lags() {
    let full = sales_frame((0..10).map(|i| i as f64).collect());
    let mut lagger = SimpleLagger::new("Quantity", "WeekStarting", vec![4]).unwrap();
    lagger.fit(&full).unwrap();

    assert!(matches!(
        lagger.transform(&full.head(3)),
        Err(ForecastError::ConfigurationError(_))
    ));
}

#[test]
fn test_rejects_other_time_column() {
    let frame = sales_frame(vec![1.0, 2.0, 3.0]);
    let mut lagger = SimpleLagger::new("Quantity", "Date", vec![1]).unwrap();

    assert!(matches!(
        lagger.fit(&frame),
        Err(ForecastError::ConfigurationError(_))
    ));
}

#[test]
fn test_fitted_state_round_trips() {
    let mut lagger = SimpleLagger::new("Quantity", "WeekStarting", vec![1, 2]).unwrap();
    lagger.fit(&sales_frame(vec![1.5, 2.25, 3.125, 4.0625])).unwrap();

    let json = serde_json::to_string(&lagger).unwrap();
    let restored: SimpleLagger = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, lagger);
}
