//! Forecast value series aligned to a time index

use crate::data::{Column, TimeSeriesFrame};
use crate::error::{ForecastError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A value series indexed by timestamp.
///
/// Positions for which no value could be produced hold `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    index: Vec<NaiveDateTime>,
    values: Vec<Option<f64>>,
}

impl ForecastSeries {
    /// Create a series, sorting by timestamp. `NaN` values are stored as missing.
    pub fn new(index: Vec<NaiveDateTime>, values: Vec<Option<f64>>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Index length ({}) doesn't match values length ({})",
                index.len(),
                values.len()
            )));
        }

        let frame = TimeSeriesFrame::new("timestamp", index, vec![Column::numeric("value", values)])?;
        Self::from_frame_column(&frame, "value")
    }

    /// Take a numeric column of `frame` as a series
    pub fn from_frame_column(frame: &TimeSeriesFrame, name: &str) -> Result<Self> {
        let values = frame.numeric(name)?;
        Ok(Self {
            index: frame.index().to_vec(),
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value at `timestamp`; `None` when absent or missing
    pub fn get(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.index
            .binary_search(&timestamp)
            .ok()
            .and_then(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, Option<f64>)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Number of non-missing values
    pub fn observed_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Union of two series with disjoint timestamps
    pub fn merge(&self, other: &ForecastSeries) -> Result<Self> {
        let mut index = self.index.clone();
        index.extend_from_slice(&other.index);
        let mut values = self.values.clone();
        values.extend_from_slice(&other.values);
        Self::new(index, values)
    }

    /// Series over exactly `index`; timestamps not present here become missing.
    pub fn reindex(&self, index: &[NaiveDateTime]) -> Self {
        Self {
            index: index.to_vec(),
            values: index.iter().map(|&t| self.get(t)).collect(),
        }
    }
}
