use crate::errors::{AppError, AppResult};
use crate::models::Category;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct PeriodConfig {
    pub label: String,
    pub dir: PathBuf,
    /// Leading data rows to ignore in every file of this period.
    pub skip_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub category_column: String,
    pub potential_column: String,
    pub early: PeriodConfig,
    pub late: PeriodConfig,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            dir: PathBuf::new(),
            skip_rows: 0,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data_new"),
            category_column: "TMSSR".to_string(),
            potential_column: "Potential".to_string(),
            early: PeriodConfig {
                label: "학기 초".to_string(),
                dir: PathBuf::from("data_comparison/학기 초(9월 11일)"),
                skip_rows: 8,
            },
            late: PeriodConfig {
                label: "학기 말".to_string(),
                dir: PathBuf::from("data_comparison/학기 말(12월 4일)"),
                skip_rows: 6,
            },
        }
    }
}

/// Per-invocation knobs for the category aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOptions {
    pub skip_rows: usize,
    pub category_column: String,
    pub potential_column: String,
    /// Restricts the emitted rows. `None` keeps every category.
    pub categories: Option<Vec<Category>>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            skip_rows: 0,
            category_column: "TMSSR".to_string(),
            potential_column: "Potential".to_string(),
            categories: None,
        }
    }
}

impl DashboardConfig {
    pub fn aggregate_options(&self, skip_rows: usize) -> AggregateOptions {
        AggregateOptions {
            skip_rows,
            category_column: self.category_column.clone(),
            potential_column: self.potential_column.clone(),
            categories: None,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.category_column.trim().is_empty() || self.potential_column.trim().is_empty() {
            return Err(AppError::Config("column names must not be blank".to_string()));
        }
        for period in [&self.early, &self.late] {
            if period.dir.as_os_str().is_empty() {
                return Err(AppError::Config(format!("period '{}' has no directory", period.label)));
            }
        }
        Ok(())
    }
}

/// Reads a YAML config, or returns the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> AppResult<DashboardConfig> {
    let Some(path) = path else {
        return Ok(DashboardConfig::default());
    };

    let raw = fs::read_to_string(path)
        .map_err(|error| AppError::Config(format!("{}: {}", path.to_string_lossy(), error)))?;
    let config: DashboardConfig = serde_yaml::from_str(&raw)?;
    config.validate()?;
    tracing::debug!(path = %path.to_string_lossy(), "loaded dashboard config");
    Ok(config)
}
