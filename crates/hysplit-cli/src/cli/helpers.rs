use super::CliError;
use anyhow::Context;
use chrono::NaiveDateTime;
use hysplit_core::PipelineConfig;
use hysplit_core::domain::PipelineError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub(super) const RELEASE_TIME_ARG_FORMAT: &str = "%Y-%m-%d %H";

/// Flags shared by every command that touches the pipeline configuration.
#[derive(clap::Args, Debug, Clone, Default)]
pub(super) struct ConfigFlags {
    /// JSON pipeline configuration
    #[arg(long)]
    pub(super) config: Option<PathBuf>,

    /// Directory holding control templates and setup files
    #[arg(long)]
    pub(super) template_dir: Option<PathBuf>,

    /// Parent of per-simulation working directories
    #[arg(long)]
    pub(super) data_dir: Option<PathBuf>,

    /// Root of the contour and metadata store
    #[arg(long)]
    pub(super) store_dir: Option<PathBuf>,

    /// Worker count handed to the parallel launcher
    #[arg(long)]
    pub(super) workers: Option<usize>,

    /// Topology quantization
    #[arg(long)]
    pub(super) quantization: Option<u32>,
}

pub(super) fn load_config(flags: &ConfigFlags) -> Result<PipelineConfig, CliError> {
    let working_dir = std::env::current_dir().context("failed to read current working directory")?;
    let mut config = match &flags.config {
        Some(path) => read_config_file(&resolve_cli_path(&working_dir, path))?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = &flags.template_dir {
        config.template_dir = resolve_cli_path(&working_dir, path);
    }
    if let Some(path) = &flags.data_dir {
        config.data_dir = resolve_cli_path(&working_dir, path);
    }
    if let Some(path) = &flags.store_dir {
        config.store_dir = resolve_cli_path(&working_dir, path);
    }
    if let Some(workers) = flags.workers {
        config.parallel_workers = workers;
    }
    if let Some(quantization) = flags.quantization {
        config.quantization = quantization;
    }
    config.validate().map_err(CliError::Pipeline)?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<PipelineConfig, CliError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read pipeline config '{}'", path.display()))?;
    let config = serde_json::from_str::<PipelineConfig>(&content)
        .with_context(|| format!("failed to parse pipeline config '{}'", path.display()))?;
    Ok(config.relative_to(path.parent().unwrap_or_else(|| Path::new(""))))
}

pub(super) fn resolve_cli_path(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Accepts `YYYY-MM-DD HH`.
pub(super) fn parse_release_time(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(&format!("{} 00", value.trim()), "%Y-%m-%d %H %M").map_err(
        |error| format!("expected release time as '{RELEASE_TIME_ARG_FORMAT}', got '{value}': {error}"),
    )
}

pub(super) fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|source| {
        CliError::Pipeline(PipelineError::internal(
            "SYS.CLI_OUTPUT",
            format!("failed to render JSON output: {source}"),
        ))
    })?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_release_time;

    #[test]
    fn release_time_takes_date_and_hour() {
        let parsed = parse_release_time("2024-01-01 06").expect("time should parse");
        assert_eq!(parsed.to_string(), "2024-01-01 06:00:00");
        assert!(parse_release_time("2024-01-01").is_err());
        assert!(parse_release_time("01/01/2024 06").is_err());
    }
}
