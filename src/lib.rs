//! # many_models
//!
//! Train and serve one small forecasting pipeline per time series. Each input
//! CSV file holds a single entity (for example one store/brand pair); the
//! values of the configured id columns in its first row become the tags the
//! fitted pipeline is stored and looked up under.
//!
//! ## Example
//!
//! ```no_run
//! use many_models::{entity_files, train_entities, DirectoryModelStore, RunSettings};
//! use forecast_pipeline::TracingSink;
//!
//! # fn main() -> many_models::Result<()> {
//! let settings = RunSettings::from_json_file("settings.json")?;
//! let mut store = DirectoryModelStore::new("models")?;
//! let files = entity_files("data/train")?;
//!
//! let outcomes = train_entities(&files, &settings, &mut TracingSink, &mut store);
//! println!("trained {} models", outcomes.len());
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod runner;
pub mod store;

pub use crate::entity::{entity_files, EntityTags, MODEL_TYPE_TAG};
pub use crate::error::{ManyModelsError, Result};
pub use crate::runner::{
    forecast_entities, forecast_entity, train_entities, train_entity, write_forecasts_csv,
    write_training_summary, EntityForecast, RunSettings, RunStatus, TrainedEntity,
    TrainingOutcome,
};
pub use crate::store::{DirectoryModelStore, InMemoryModelStore, ModelStore};
