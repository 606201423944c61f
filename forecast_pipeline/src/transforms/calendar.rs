//! Calendar features derived from the time index

use super::FrameTransform;
use crate::data::{Column, TimeSeriesFrame};
use crate::error::Result;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Which calendar attribute of the timestamp to expose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarFeature {
    /// ISO 8601 week number, 1-53
    #[default]
    WeekOfYear,
    /// Monday = 0 through Sunday = 6
    DayOfWeek,
    /// 1-12
    Month,
}

impl CalendarFeature {
    pub fn default_column_name(self) -> &'static str {
        match self {
            CalendarFeature::WeekOfYear => "Week_Year",
            CalendarFeature::DayOfWeek => "Week_Day",
            CalendarFeature::Month => "Month",
        }
    }

    pub fn value(self, timestamp: NaiveDateTime) -> f64 {
        let value = match self {
            CalendarFeature::WeekOfYear => timestamp.iso_week().week(),
            CalendarFeature::DayOfWeek => timestamp.weekday().num_days_from_monday(),
            CalendarFeature::Month => timestamp.month(),
        };
        f64::from(value)
    }
}

/// Adds one numeric calendar column computed from the index.
///
/// Re-applying the transform overwrites the column with identical values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleCalendarFeaturizer {
    feature: CalendarFeature,
    column_name: String,
}

impl SimpleCalendarFeaturizer {
    pub fn new(feature: CalendarFeature) -> Self {
        Self {
            feature,
            column_name: feature.default_column_name().to_string(),
        }
    }

    pub fn with_column_name(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = column_name.into();
        self
    }

    pub fn feature(&self) -> CalendarFeature {
        self.feature
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }
}

impl Default for SimpleCalendarFeaturizer {
    fn default() -> Self {
        Self::new(CalendarFeature::default())
    }
}

impl FrameTransform for SimpleCalendarFeaturizer {
    fn transform(&self, frame: &TimeSeriesFrame) -> Result<TimeSeriesFrame> {
        let values = frame
            .index()
            .iter()
            .map(|&t| Some(self.feature.value(t)))
            .collect();
        frame.with_column(Column::numeric(self.column_name.clone(), values))
    }
}
