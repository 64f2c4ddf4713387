use crate::model::{ConfigError, DateWindow, IndexSpec};
use chrono::{NaiveDate, TimeDelta};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub code: String,
    pub display_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Eastmoney,
    Yahoo,
    LocalCsv,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub indices: Vec<IndexConfig>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderKind>,
    #[serde(default)]
    pub local_csv_dir: Option<PathBuf>,
}

fn default_lookback_days() -> i64 {
    180
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("history.csv")
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_providers() -> Vec<ProviderKind> {
    vec![ProviderKind::Eastmoney, ProviderKind::Yahoo]
}

/// Everything one run needs, resolved against the run date.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub indices: Vec<IndexSpec>,
    pub window: DateWindow,
    pub run_date: NaiveDate,
    pub output_dir: PathBuf,
    pub history_path: PathBuf,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indices.is_empty() {
            return Err(ConfigError::Invalid("no indices configured".into()));
        }
        if let Some(blank) = self.indices.iter().find(|i| i.code.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "index '{}' has a blank code",
                blank.display_name
            )));
        }
        if self.providers.is_empty() {
            return Err(ConfigError::Invalid("no providers configured".into()));
        }
        if self.providers.contains(&ProviderKind::LocalCsv) && self.local_csv_dir.is_none() {
            return Err(ConfigError::Invalid(
                "local_csv provider needs local_csv_dir".into(),
            ));
        }
        if self.lookback_days < 0 {
            return Err(ConfigError::Invalid("lookback_days must not be negative".into()));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
        }
        Ok(())
    }

    /// Resolves dates and paths for a run happening on `today`.
    pub fn plan(&self, today: NaiveDate) -> Result<RunPlan, ConfigError> {
        let end = self.end_date.unwrap_or(today);
        let start = match self.start_date {
            Some(start) => start,
            None => TimeDelta::try_days(self.lookback_days)
                .and_then(|lookback| end.checked_sub_signed(lookback))
                .ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "lookback_days {} reaches before the earliest date",
                        self.lookback_days
                    ))
                })?,
        };
        if start > end {
            return Err(ConfigError::Invalid(format!(
                "start_date {} is after end_date {}",
                start, end
            )));
        }

        let indices = self
            .indices
            .iter()
            .map(|i| IndexSpec {
                aliases: i.aliases.clone(),
                ..IndexSpec::new(i.code.trim(), i.display_name.clone())
            })
            .collect();

        Ok(RunPlan {
            indices,
            window: DateWindow { start, end },
            run_date: today,
            output_dir: self.output_dir.clone(),
            history_path: self.output_dir.join(&self.history_file),
        })
    }
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}
