pub mod aggregate;
pub mod compare;
pub mod config;
pub mod distribution;
pub mod errors;
pub mod filename;
pub mod loader;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod utterance;

use crate::config::DashboardConfig;
use crate::errors::AppError;
use crate::models::{
    AggregateReport, CaptureName, Category, CategoryComparison, Distribution, PeriodComparison,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "tmssr", about = "Aggregate TMSSR/Potential codings from capture CSV folders")]
struct Cli {
    /// YAML dashboard config; built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Write JSON logs to a daily rolling file in this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Per-user, per-point category counts for one folder.
    Aggregate {
        dir: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        skip_rows: usize,
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long)]
        user: Option<String>,
    },
    /// Utterance and file counts of the early and late periods.
    ComparePeriods {
        #[arg(long)]
        early_dir: Option<PathBuf>,
        #[arg(long)]
        late_dir: Option<PathBuf>,
        #[arg(long)]
        early_skip_rows: Option<usize>,
        #[arg(long)]
        late_skip_rows: Option<usize>,
    },
    /// Category totals of two folders side by side.
    CompareCategories {
        early_dir: PathBuf,
        late_dir: PathBuf,
        #[arg(long, default_value_t = 0)]
        early_skip_rows: usize,
        #[arg(long, default_value_t = 0)]
        late_skip_rows: usize,
    },
    /// Category and potential distribution of a single coded sheet.
    Distribution {
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        skip_rows: usize,
    },
    /// Show how a capture file name is interpreted.
    ParseName { name: String },
}

pub fn aggregate_command(
    config: &DashboardConfig,
    dir: Option<&Path>,
    skip_rows: usize,
    categories: &[String],
    user: Option<&str>,
) -> Result<AggregateReport, String> {
    let dir = dir.unwrap_or(config.data_dir.as_path());
    let mut options = config.aggregate_options(skip_rows);
    if !categories.is_empty() {
        options.categories = Some(parse_categories(categories).map_err(to_client_error)?);
    }
    let rows = aggregate::aggregate_folder(dir, &options).map_err(to_client_error)?;
    if rows.is_empty() {
        tracing::warn!(dir = %dir.to_string_lossy(), "no capture rows with TMSSR/Potential columns found");
    }
    Ok(aggregate::build_report(rows, user))
}

pub fn compare_periods_command(config: &DashboardConfig) -> Result<PeriodComparison, String> {
    let early = utterance::snapshot_period(&config.early).map_err(to_client_error)?;
    let late = utterance::snapshot_period(&config.late).map_err(to_client_error)?;
    Ok(utterance::compare_periods(&early, &late))
}

pub fn compare_categories_command(
    config: &DashboardConfig,
    early_dir: &Path,
    late_dir: &Path,
    early_skip_rows: usize,
    late_skip_rows: usize,
) -> Result<CategoryComparison, String> {
    let early = aggregate::aggregate_folder(early_dir, &config.aggregate_options(early_skip_rows))
        .map_err(to_client_error)?;
    let late = aggregate::aggregate_folder(late_dir, &config.aggregate_options(late_skip_rows))
        .map_err(to_client_error)?;
    Ok(compare::compare_aggregates(&early, &late))
}

pub fn distribution_command(
    config: &DashboardConfig,
    file: &Path,
    skip_rows: usize,
) -> Result<Distribution, String> {
    let table = loader::load_table(file).map_err(to_client_error)?;
    distribution::distribution(&table, &config.aggregate_options(skip_rows)).map_err(to_client_error)
}

pub fn parse_name_command(name: &str) -> Result<CaptureName, String> {
    filename::parse_capture_filename(name).map_err(to_client_error)
}

fn parse_categories(raw: &[String]) -> Result<Vec<Category>, AppError> {
    raw.iter()
        .map(|value| {
            Category::normalize(value)
                .ok_or_else(|| AppError::Config(format!("Unknown TMSSR category: {}", value)))
        })
        .collect()
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    println!("{}", rendered);
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_dir.as_deref()).map_err(anyhow::Error::msg)?;

    let mut config = config::load_config(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Command::Aggregate {
            dir,
            skip_rows,
            categories,
            user,
        } => print_json(
            &aggregate_command(&config, dir.as_deref(), skip_rows, &categories, user.as_deref())
                .map_err(anyhow::Error::msg)?,
        ),
        Command::ComparePeriods {
            early_dir,
            late_dir,
            early_skip_rows,
            late_skip_rows,
        } => {
            if let Some(dir) = early_dir {
                config.early.dir = dir;
            }
            if let Some(dir) = late_dir {
                config.late.dir = dir;
            }
            if let Some(skip) = early_skip_rows {
                config.early.skip_rows = skip;
            }
            if let Some(skip) = late_skip_rows {
                config.late.skip_rows = skip;
            }
            print_json(&compare_periods_command(&config).map_err(anyhow::Error::msg)?)
        }
        Command::CompareCategories {
            early_dir,
            late_dir,
            early_skip_rows,
            late_skip_rows,
        } => print_json(
            &compare_categories_command(&config, &early_dir, &late_dir, early_skip_rows, late_skip_rows)
                .map_err(anyhow::Error::msg)?,
        ),
        Command::Distribution { file, skip_rows } => {
            print_json(&distribution_command(&config, &file, skip_rows).map_err(anyhow::Error::msg)?)
        }
        Command::ParseName { name } => print_json(&parse_name_command(&name).map_err(anyhow::Error::msg)?),
    }
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
