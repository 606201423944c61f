//! Column removal

use super::FrameTransform;
use crate::data::TimeSeriesFrame;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Drops a configured set of columns. Columns that are not present are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDropper {
    drop_columns: Vec<String>,
}

impl ColumnDropper {
    pub fn new<I, S>(drop_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            drop_columns: drop_columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn drop_columns(&self) -> &[String] {
        &self.drop_columns
    }
}

impl FrameTransform for ColumnDropper {
    fn transform(&self, frame: &TimeSeriesFrame) -> Result<TimeSeriesFrame> {
        Ok(frame.drop_columns(&self.drop_columns[..]))
    }
}
