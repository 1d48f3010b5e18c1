//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching the
//! config/gemscout.toml structure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::batch::manager::BatchConfig;
use crate::batch::strategy_select::BatchStrategy;
use crate::scheduler::runner::SchedulerConfig;

/// Main configuration structure matching gemscout.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub provider: ProviderSection,
    pub batch: BatchSection,
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub watchlist: WatchlistSection,
    pub logging: LoggingSection,
}

/// Data gateway configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    /// Gateway base URL
    pub base_url: String,
    /// Optional API key (prefer the GEMSCOUT_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retry attempts for transient failures
    pub max_retries: u32,
    /// Base delay for retry backoff (milliseconds)
    pub retry_base_delay_ms: u64,
}

impl ProviderSection {
    /// API key with environment variable override
    /// Checks GEMSCOUT_API_KEY first, falls back to the config value
    pub fn get_api_key(&self) -> Option<String> {
        std::env::var("GEMSCOUT_API_KEY")
            .ok()
            .or_else(|| self.api_key.clone())
    }
}

/// Batch manager configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSection {
    /// Run address validation before every fetch
    pub enable_validation: bool,
    /// Upper bound on addresses per true-batch chunk
    pub max_batch_size: usize,
    /// Bounded concurrency for the parallel path
    pub max_concurrent_requests: usize,
    /// Requests-per-minute ceiling
    pub requests_per_minute: u32,
    /// Metadata cache TTL in seconds (slow-moving data)
    pub metadata_ttl_secs: u64,
    /// Price cache TTL in seconds (volatile data)
    pub price_ttl_secs: u64,
    /// Refetch a failed batch chunk individually
    pub retry_individual_on_batch_failure: bool,
    /// Extra delay between sequential requests (milliseconds)
    pub sequential_delay_ms: u64,
    /// Strategy while batch capability is unknown:
    /// "parallel_individual", "true_batch" or "sequential_safe"
    pub default_strategy: String,
}

impl BatchSection {
    /// Convert into the batch manager's runtime configuration
    pub fn to_batch_config(&self) -> Result<BatchConfig, ConfigError> {
        Ok(BatchConfig {
            enable_validation: self.enable_validation,
            max_batch_size: self.max_batch_size,
            max_concurrent_requests: self.max_concurrent_requests,
            requests_per_minute: self.requests_per_minute,
            metadata_ttl: Duration::from_secs(self.metadata_ttl_secs),
            price_ttl: Duration::from_secs(self.price_ttl_secs),
            retry_individual_on_batch_failure: self.retry_individual_on_batch_failure,
            sequential_delay: Duration::from_millis(self.sequential_delay_ms),
            default_strategy: parse_strategy(&self.default_strategy)?,
        })
    }
}

fn parse_strategy(name: &str) -> Result<BatchStrategy, ConfigError> {
    match name {
        "true_batch" => Ok(BatchStrategy::TrueBatch),
        "parallel_individual" => Ok(BatchStrategy::ParallelIndividual),
        "sequential_safe" => Ok(BatchStrategy::SequentialSafe),
        other => Err(ConfigError::ValidationError(format!(
            "unknown default_strategy '{other}'"
        ))),
    }
}

/// Scheduler configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Master switch for scheduled runs
    pub enabled: bool,
    /// UTC hours of day at which runs are due
    pub run_hours: Vec<u32>,
    /// Minimum spacing between due-checks in seconds
    pub check_interval_secs: u64,
    /// Path of the persisted execution history (~ is expanded)
    pub history_file: String,
    /// Execution records older than this many days are pruned
    pub max_record_age_days: u32,
}

impl SchedulerSection {
    /// Convert into the scheduler's runtime configuration
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        let history_file = shellexpand::tilde(&self.history_file).to_string();
        SchedulerConfig {
            enabled: self.enabled,
            run_hours: self.run_hours.clone(),
            check_interval: Duration::from_secs(self.check_interval_secs),
            history_path: PathBuf::from(history_file),
            max_record_age_days: self.max_record_age_days,
        }
    }
}

/// Watchlist configuration section (optional)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchlistSection {
    /// Addresses surfaced on every scheduled run
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log to file (in addition to stdout)
    pub log_to_file: bool,
    /// Log file path
    pub log_file: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.base_url must not be empty".into(),
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "provider.timeout_secs must be > 0".into(),
            ));
        }

        if self.batch.max_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_batch_size must be > 0".into(),
            ));
        }
        if self.batch.max_concurrent_requests == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_concurrent_requests must be > 0".into(),
            ));
        }
        if self.batch.requests_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "batch.requests_per_minute must be > 0".into(),
            ));
        }
        if self.batch.metadata_ttl_secs == 0 || self.batch.price_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "batch TTLs must be > 0".into(),
            ));
        }
        if self.batch.price_ttl_secs > self.batch.metadata_ttl_secs {
            return Err(ConfigError::ValidationError(format!(
                "batch.price_ttl_secs ({}) must not exceed batch.metadata_ttl_secs ({})",
                self.batch.price_ttl_secs, self.batch.metadata_ttl_secs
            )));
        }
        parse_strategy(&self.batch.default_strategy)?;

        if self.scheduler.run_hours.is_empty() {
            return Err(ConfigError::ValidationError(
                "scheduler.run_hours must not be empty".into(),
            ));
        }
        if let Some(hour) = self.scheduler.run_hours.iter().find(|h| **h > 23) {
            return Err(ConfigError::ValidationError(format!(
                "scheduler.run_hours entry {hour} is not a valid hour"
            )));
        }

        Ok(())
    }
}
