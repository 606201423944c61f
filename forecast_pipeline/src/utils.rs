//! Utility functions for the forecast_pipeline crate

use crate::data::TimeSeriesFrame;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a timestamp written as a date or a date-time
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ForecastError::DataError(format!("Unparseable timestamp '{}'", value)))
}

/// Split a frame into training rows and the last `test_size` rows
pub fn train_test_split(
    frame: &TimeSeriesFrame,
    test_size: usize,
) -> Result<(TimeSeriesFrame, TimeSeriesFrame)> {
    if test_size == 0 || test_size >= frame.len() {
        return Err(ForecastError::ValidationError(format!(
            "Test size must be between 1 and {} for a frame with {} rows, got {}",
            frame.len().saturating_sub(1),
            frame.len(),
            test_size
        )));
    }

    let train_size = frame.len() - test_size;
    Ok((frame.head(train_size), frame.tail(test_size)))
}

/// Create future timestamps for forecasting
pub fn future_timestamps(
    last_timestamp: NaiveDateTime,
    horizon: usize,
    frequency: &str,
) -> Result<Vec<NaiveDateTime>> {
    let duration = match frequency {
        "daily" | "d" | "1d" => Duration::days(1),
        "weekly" | "w" | "1w" => Duration::weeks(1),
        "hourly" | "h" | "1h" => Duration::hours(1),
        "minute" | "min" | "1min" => Duration::minutes(1),
        _ => {
            return Err(ForecastError::ValidationError(format!(
                "Unsupported frequency: {}",
                frequency
            )))
        }
    };

    let mut timestamps = Vec::with_capacity(horizon);
    let mut current = last_timestamp;
    for _ in 0..horizon {
        current = current.checked_add_signed(duration).ok_or_else(|| {
            ForecastError::ValidationError(format!("Timestamp overflow after {}", current))
        })?;
        timestamps.push(current);
    }

    Ok(timestamps)
}
