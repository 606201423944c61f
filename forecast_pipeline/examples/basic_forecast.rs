use chrono::{Duration, NaiveDate};
use forecast_pipeline::utils::{future_timestamps, train_test_split};
use forecast_pipeline::{compute_metrics, Column, ForecastSeries, PipelineConfig, TimeSeriesFrame};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Forecast Pipeline: Basic Forecasting Example");
    println!("============================================\n");

    // Create sample data
    println!("Creating sample data...");
    let data = create_sample_weekly_data()?;
    println!("Sample data created: {} weekly points\n", data.len());

    // Hold out the last 8 weeks
    let (train, test) = train_test_split(&data, 8)?;

    // Standard pipeline: drop id columns, add week of year, lag the target
    let mut config = PipelineConfig::new("Quantity", "WeekStarting");
    config.drop_columns = vec!["Store".to_string(), "Brand".to_string()];
    let mut forecaster = config.build_forecaster()?;

    println!("Training pipeline...");
    forecaster.fit(&train)?;
    println!("Featurized training data columns: {:?}\n", forecaster.transform(&train)?.column_names());

    // Recursive forecast over the held-out weeks
    let forecasts = forecaster.forecast(&test)?;
    let actuals = ForecastSeries::from_frame_column(&test, "Quantity")?;
    println!("Held-out forecasts:");
    for ((timestamp, forecast), (_, actual)) in forecasts.iter().zip(actuals.iter()) {
        println!(
            "  {}: forecast {:>9.1}  actual {:>9.1}",
            timestamp.format("%Y-%m-%d"),
            forecast.unwrap_or(f64::NAN),
            actual.unwrap_or(f64::NAN)
        );
    }
    println!("\n{}", compute_metrics(&actuals, &forecasts)?);

    // Refit on everything and forecast 4 weeks past the data
    forecaster.fit(&data)?;
    let last = data.last_timestamp().ok_or("empty data")?;
    let horizon = TimeSeriesFrame::new(
        "WeekStarting",
        future_timestamps(last, 4, "weekly")?,
        vec![],
    )?;
    let future = forecaster.forecast(&horizon)?;
    println!("Future forecasts: {:?}", future.values());

    Ok(())
}

fn create_sample_weekly_data() -> Result<TimeSeriesFrame, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(1990, 6, 14)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or("invalid start date")?;
    let n = 60;

    let index = (0..n).map(|i| start + Duration::weeks(i as i64)).collect();
    let quantity = (0..n)
        .map(|i| {
            let seasonal = [0.0, 700.0, -250.0, 400.0][i % 4];
            Some(11000.0 + 20.0 * i as f64 + seasonal)
        })
        .collect();
    let price = (0..n).map(|i| Some(2.0 + 0.1 * (i % 3) as f64)).collect();

    Ok(TimeSeriesFrame::new(
        "WeekStarting",
        index,
        vec![
            Column::text("Store", vec![Some("1000".to_string()); n]),
            Column::text("Brand", vec![Some("dominicks".to_string()); n]),
            Column::numeric("Quantity", quantity),
            Column::numeric("Price", price),
        ],
    )?)
}
