//! Frame transforms applied ahead of the estimator
//!
//! A forecasting pipeline is an ordered list of [`NamedStep`]s. Each step is fit
//! on the output of the step before it, then transforms that output for the
//! next one.

use crate::data::TimeSeriesFrame;
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod calendar;
pub mod column_dropper;
pub mod lagger;

pub use calendar::{CalendarFeature, SimpleCalendarFeaturizer};
pub use column_dropper::ColumnDropper;
pub use lagger::{validate_lag_orders, LaggerState, SimpleLagger};

/// Common interface for frame transforms
pub trait FrameTransform {
    /// Learn whatever state the transform needs. Stateless transforms keep the default.
    fn fit(&mut self, _frame: &TimeSeriesFrame) -> Result<()> {
        Ok(())
    }

    /// Transform a frame using the fitted state
    fn transform(&self, frame: &TimeSeriesFrame) -> Result<TimeSeriesFrame>;

    fn fit_transform(&mut self, frame: &TimeSeriesFrame) -> Result<TimeSeriesFrame> {
        self.fit(frame)?;
        self.transform(frame)
    }
}

/// One of the transforms a pipeline can hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformStep {
    ColumnDropper(ColumnDropper),
    CalendarFeaturizer(SimpleCalendarFeaturizer),
    Lagger(SimpleLagger),
}

impl FrameTransform for TransformStep {
    fn fit(&mut self, frame: &TimeSeriesFrame) -> Result<()> {
        match self {
            TransformStep::ColumnDropper(step) => step.fit(frame),
            TransformStep::CalendarFeaturizer(step) => step.fit(frame),
            TransformStep::Lagger(step) => step.fit(frame),
        }
    }

    fn transform(&self, frame: &TimeSeriesFrame) -> Result<TimeSeriesFrame> {
        match self {
            TransformStep::ColumnDropper(step) => step.transform(frame),
            TransformStep::CalendarFeaturizer(step) => step.transform(frame),
            TransformStep::Lagger(step) => step.transform(frame),
        }
    }
}

impl From<ColumnDropper> for TransformStep {
    fn from(step: ColumnDropper) -> Self {
        TransformStep::ColumnDropper(step)
    }
}

impl From<SimpleCalendarFeaturizer> for TransformStep {
    fn from(step: SimpleCalendarFeaturizer) -> Self {
        TransformStep::CalendarFeaturizer(step)
    }
}

impl From<SimpleLagger> for TransformStep {
    fn from(step: SimpleLagger) -> Self {
        TransformStep::Lagger(step)
    }
}

/// A pipeline step with its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedStep {
    pub name: String,
    pub step: TransformStep,
}

impl NamedStep {
    pub fn new(name: impl Into<String>, step: impl Into<TransformStep>) -> Self {
        Self {
            name: name.into(),
            step: step.into(),
        }
    }
}
