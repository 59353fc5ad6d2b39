use crate::analysis::{compute, AnalysisError, ComputeResult};
use crate::config::{Config, ConfigError};
use crate::report::{format_table, Summary};
use crate::storage::{DuckDbArchive, SourceError};
use chrono::Utc;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("archive error: {0}")]
    Source(#[from] SourceError),

    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Run one computation with the config `main` already loaded.
///
/// `loaded` is `None` when no config file was found at all.
pub async fn run(
    loaded: Option<Result<Config, ConfigError>>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(loaded) = loaded else {
        eprintln!("Error: config not found");
        eprintln!("Searched locations:");
        eprintln!("  ~/.config/powerband/config.yml");
        eprintln!("  /etc/powerband/config.yml");
        eprintln!("\nUse --config <path> to specify a config file, or run 'powerband config init' to generate one.");
        std::process::exit(1);
    };

    let config = loaded?;

    match analyze(&config).await {
        Ok(result) => {
            println!("{}", render(&result, format)?);
            Ok(())
        }
        Err(RunError::Analysis(AnalysisError::InvalidSeriesReference(series_id))) => {
            error!(series_id = %series_id, "Series does not exist in the archive");
            eprintln!("Invalid configuration: series '{}' does not exist, no computation possible.", series_id);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

/// Open the configured archive and compute the distribution as of now.
pub async fn analyze(config: &Config) -> Result<ComputeResult, RunError> {
    let archive = open_archive(&config.archive.path).await?;
    let request = config.analysis_request();

    info!(
        series_id = %request.series_id,
        months = request.month_count,
        "Running analysis"
    );

    Ok(compute(&archive, &request, Utc::now()).await?)
}

async fn open_archive(path: &Path) -> Result<DuckDbArchive, RunError> {
    info!(path = %path.display(), "Opening archive");
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
    }
    let archive = DuckDbArchive::new(path)?;
    archive.init_schema().await?;
    Ok(archive)
}

pub fn render(result: &ComputeResult, format: OutputFormat) -> Result<String, RunError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => Ok(format!(
            "{}\n\n{}",
            Summary::from_result(result),
            format_table(result)
        )),
    }
}
