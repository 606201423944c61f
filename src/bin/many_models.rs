//! Command line runner: train or forecast every entity file in a directory

use clap::{Parser, Subcommand};
use forecast_pipeline::TracingSink;
use many_models::{
    entity_files, forecast_entities, train_entities, write_forecasts_csv, write_training_summary,
    DirectoryModelStore, RunSettings, RunStatus,
};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "many_models")]
#[command(about = "Train and forecast one model per time series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit, score and store a pipeline for every entity file
    Train {
        /// Run settings (JSON)
        #[arg(short, long)]
        settings: PathBuf,

        /// Directory of per-entity CSV files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Directory the fitted pipelines are written to
        #[arg(short, long)]
        model_dir: PathBuf,

        /// Training summary CSV (stdout when omitted)
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Forecast every entity file with its stored pipeline
    Forecast {
        /// Run settings (JSON)
        #[arg(short, long)]
        settings: PathBuf,

        /// Directory of per-entity CSV files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Directory holding the fitted pipelines
        #[arg(short, long)]
        model_dir: PathBuf,

        /// Forecast CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "many_models=info,forecast_pipeline=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            settings,
            input_dir,
            model_dir,
            summary,
        } => {
            let settings = RunSettings::from_json_file(settings)?;
            let mut store = DirectoryModelStore::new(model_dir)?;
            let files = entity_files(&input_dir)?;
            info!(files = files.len(), input_dir = %input_dir.display(), "Starting training run");

            let outcomes = train_entities(&files, &settings, &mut TracingSink, &mut store);
            match summary {
                Some(path) => write_training_summary(&outcomes, File::create(path)?)?,
                None => write_training_summary(&outcomes, io::stdout())?,
            }

            let failed = outcomes
                .iter()
                .filter(|o| o.status == RunStatus::Failed)
                .count();
            if failed > 0 {
                warn!(failed, total = outcomes.len(), "Some entities failed to train");
            }
        }
        Commands::Forecast {
            settings,
            input_dir,
            model_dir,
            output,
        } => {
            let settings = RunSettings::from_json_file(settings)?;
            let store = DirectoryModelStore::new(model_dir)?;
            let files = entity_files(&input_dir)?;
            info!(files = files.len(), input_dir = %input_dir.display(), "Starting forecasting run");

            let forecasts = forecast_entities(&files, &settings, &store)?;
            match output {
                Some(path) => write_forecasts_csv(&forecasts, File::create(path)?)?,
                None => write_forecasts_csv(&forecasts, io::stdout())?,
            }
        }
    }

    Ok(())
}
