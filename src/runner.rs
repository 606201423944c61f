//! Train and forecast one model per entity file

use crate::entity::EntityTags;
use crate::error::{ManyModelsError, Result};
use crate::store::ModelStore;
use chrono::{DateTime, NaiveDateTime, Utc};
use forecast_pipeline::utils::train_test_split;
use forecast_pipeline::{
    compute_metrics, AccuracyMetrics, AnyRegressor, DataLoader, ForecastSeries, MetricsSink,
    PipelineConfig, SimpleForecaster, TimeSeriesFrame,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn default_model_type() -> String {
    "lr".to_string()
}

fn default_test_size() -> usize {
    20
}

/// Settings shared by every entity of a training or forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub pipeline: PipelineConfig,
    /// Columns whose first-row values identify an entity
    pub timeseries_id_columns: Vec<String>,
    #[serde(default = "default_model_type")]
    pub model_type: String,
    /// Trailing rows held out to score the model
    #[serde(default = "default_test_size")]
    pub test_size: usize,
}

impl RunSettings {
    pub fn new(pipeline: PipelineConfig, timeseries_id_columns: Vec<String>) -> Self {
        Self {
            pipeline,
            timeseries_id_columns,
            model_type: default_model_type(),
            test_size: default_test_size(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        if self.timeseries_id_columns.is_empty() {
            return Err(ManyModelsError::SettingsError(
                "At least one timeseries id column is required".to_string(),
            ));
        }
        if let Some(column) = self.timeseries_id_columns.iter().find(|c| {
            **c == self.pipeline.target_column || **c == self.pipeline.time_column
        }) {
            return Err(ManyModelsError::SettingsError(format!(
                "Column '{}' cannot identify the timeseries",
                column
            )));
        }
        if self.model_type.trim().is_empty() {
            return Err(ManyModelsError::SettingsError(
                "Model type is empty".to_string(),
            ));
        }
        if self.test_size == 0 {
            return Err(ManyModelsError::SettingsError(
                "Test size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// What training one entity produced
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedEntity {
    pub tags: EntityTags,
    pub model_name: String,
    /// Accuracy on the held-out rows
    pub metrics: AccuracyMetrics,
}

/// Score a fresh pipeline on the last `test_size` rows, then refit it on the
/// whole frame and store it under the entity's tags plus the model type.
pub fn train_entity(
    frame: &TimeSeriesFrame,
    settings: &RunSettings,
    sink: &mut dyn MetricsSink,
    store: &mut dyn ModelStore,
) -> Result<TrainedEntity> {
    let tags = EntityTags::from_first_row(frame, &settings.timeseries_id_columns)?;
    let model_name = tags.model_name(&settings.model_type);
    let (train, test) = train_test_split(frame, settings.test_size)?;

    let mut forecaster = settings.pipeline.build_forecaster()?;
    forecaster.fit(&train)?;
    let featurized = forecaster.transform(&train)?;
    debug!(
        model = %model_name,
        columns = ?featurized.column_names(),
        "Featurized training data"
    );

    let forecasts = forecaster.forecast(&test)?;
    let actuals = ForecastSeries::from_frame_column(&test, &settings.pipeline.target_column)?;
    let metrics = compute_metrics(&actuals, &forecasts)?;
    metrics.log_to(sink, &model_name);

    forecaster.fit(frame)?;
    store.put(&tags.with_model_type(&settings.model_type), &forecaster.to_bytes()?)?;
    info!(
        model = %model_name,
        train_rows = train.len(),
        test_rows = test.len(),
        mape = metrics.mape,
        "Trained entity model"
    );

    Ok(TrainedEntity {
        tags,
        model_name,
        metrics,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    Failed,
}

/// One row of a training run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingOutcome {
    pub index: usize,
    pub num_models: usize,
    pub file_name: String,
    pub model_name: String,
    pub model_type: String,
    pub tags: EntityTags,
    pub metrics: Option<AccuracyMetrics>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TrainingOutcome {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Train every entity file.
///
/// A file that fails is recorded as [`RunStatus::Failed`] and the batch moves
/// on to the next one.
pub fn train_entities<P: AsRef<Path>>(
    paths: &[P],
    settings: &RunSettings,
    sink: &mut dyn MetricsSink,
    store: &mut dyn ModelStore,
) -> Vec<TrainingOutcome> {
    let num_models = paths.len();
    let mut outcomes = Vec::with_capacity(num_models);

    for (index, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let file_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let started_at = Utc::now();

        let result = DataLoader::from_csv(path, &settings.pipeline.time_column)
            .map_err(ManyModelsError::from)
            .and_then(|frame| train_entity(&frame, settings, sink, store));

        let outcome = match result {
            Ok(trained) => TrainingOutcome {
                index,
                num_models,
                file_name,
                model_name: trained.model_name,
                model_type: settings.model_type.clone(),
                tags: trained.tags,
                metrics: Some(trained.metrics),
                status: RunStatus::Completed,
                error: None,
                started_at,
                finished_at: Utc::now(),
            },
            Err(err) => {
                warn!(file = %path.display(), error = %err, "Failed to train entity");
                TrainingOutcome {
                    index,
                    num_models,
                    model_name: format!("{}_{}", settings.model_type, file_name),
                    file_name,
                    model_type: settings.model_type.clone(),
                    tags: EntityTags::new(),
                    metrics: None,
                    status: RunStatus::Failed,
                    error: Some(err.to_string()),
                    started_at,
                    finished_at: Utc::now(),
                }
            }
        };
        outcomes.push(outcome);
    }

    let failed = outcomes
        .iter()
        .filter(|o| o.status == RunStatus::Failed)
        .count();
    info!(total = num_models, failed, "Finished training run");
    outcomes
}

/// Write one CSV row per outcome.
///
/// Every id column seen in any outcome gets its own column after `model_type`;
/// failed entities leave them empty.
pub fn write_training_summary<W: Write>(outcomes: &[TrainingOutcome], out: W) -> Result<()> {
    let id_columns: BTreeSet<&str> = outcomes
        .iter()
        .flat_map(|o| o.tags.iter().map(|(k, _)| k))
        .collect();

    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec!["index", "num_models", "file_name", "model_name", "model_type"];
    header.extend(id_columns.iter().copied());
    header.extend([
        "status",
        "mse",
        "rmse",
        "mae",
        "mape",
        "start_date",
        "end_date",
        "duration_ms",
        "error",
    ]);
    writer.write_record(&header)?;

    for outcome in outcomes {
        let metric = |f: fn(&AccuracyMetrics) -> f64| {
            outcome
                .metrics
                .as_ref()
                .map(|m| f(m).to_string())
                .unwrap_or_default()
        };
        let status = match outcome.status {
            RunStatus::Completed => "Completed",
            RunStatus::Failed => "Failed",
        };
        let mut record = vec![
            outcome.index.to_string(),
            outcome.num_models.to_string(),
            outcome.file_name.clone(),
            outcome.model_name.clone(),
            outcome.model_type.clone(),
        ];
        record.extend(
            id_columns
                .iter()
                .map(|k| outcome.tags.get(k).unwrap_or_default().to_string()),
        );
        record.extend([
            status.to_string(),
            metric(|m| m.mse),
            metric(|m| m.rmse),
            metric(|m| m.mae),
            metric(|m| m.mape),
            outcome.started_at.to_rfc3339(),
            outcome.finished_at.to_rfc3339(),
            outcome.duration_ms().to_string(),
            outcome.error.clone().unwrap_or_default(),
        ]);
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Forecasts for one entity, with actuals when the input carried the target
#[derive(Debug, Clone, PartialEq)]
pub struct EntityForecast {
    pub tags: EntityTags,
    /// Name of the forecast column, used as the actuals header
    pub target_column: String,
    pub forecasts: ForecastSeries,
    pub actuals: Option<Vec<Option<f64>>>,
}

impl EntityForecast {
    /// `timestamp,prediction,<target column>,<id columns>`
    pub fn csv_header(&self) -> Vec<String> {
        let mut header = vec![
            "timestamp".to_string(),
            "prediction".to_string(),
            self.target_column.clone(),
        ];
        header.extend(self.tags.iter().map(|(k, _)| k.to_string()));
        header
    }

    /// Write the rows without a header
    pub fn write_rows<W: Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        let format_value = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();

        for (row, (timestamp, prediction)) in self.forecasts.iter().enumerate() {
            let actual = self
                .actuals
                .as_ref()
                .and_then(|values| values.get(row).copied().flatten());
            let mut record = vec![
                format_timestamp(timestamp),
                format_value(prediction),
                format_value(actual),
            ];
            record.extend(self.tags.iter().map(|(_, v)| v.to_string()));
            writer.write_record(&record)?;
        }
        Ok(())
    }

    /// Write a header and every row
    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        write_forecasts_csv(std::slice::from_ref(self), out)
    }
}

fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Write several entities' forecasts under a single header
pub fn write_forecasts_csv<W: Write>(forecasts: &[EntityForecast], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    if let Some(first) = forecasts.first() {
        writer.write_record(first.csv_header())?;
    }
    for forecast in forecasts {
        forecast.write_rows(&mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load the entity's stored pipeline and forecast over `frame`
pub fn forecast_entity(
    frame: &TimeSeriesFrame,
    settings: &RunSettings,
    store: &dyn ModelStore,
) -> Result<EntityForecast> {
    let tags = EntityTags::from_first_row(frame, &settings.timeseries_id_columns)?;
    let bytes = store.get(&tags.with_model_type(&settings.model_type))?;
    let forecaster = SimpleForecaster::<AnyRegressor>::from_bytes(&bytes)?;

    let forecasts = forecaster.forecast(frame)?;
    let actuals = if frame.has_column(forecaster.target_column()) {
        Some(frame.numeric(forecaster.target_column())?.to_vec())
    } else {
        None
    };
    info!(
        entity = %tags,
        rows = frame.len(),
        produced = forecasts.observed_count(),
        "Forecast entity"
    );

    Ok(EntityForecast {
        tags,
        target_column: forecaster.target_column().to_string(),
        forecasts,
        actuals,
    })
}

/// Forecast every entity file, stopping at the first failure
pub fn forecast_entities<P: AsRef<Path>>(
    paths: &[P],
    settings: &RunSettings,
    store: &dyn ModelStore,
) -> Result<Vec<EntityForecast>> {
    paths
        .iter()
        .map(|path| {
            let frame = DataLoader::from_csv(path, &settings.pipeline.time_column)?;
            forecast_entity(&frame, settings, store)
        })
        .collect()
}
