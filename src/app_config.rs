use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::providers::Credentials;
use crate::translation::PollSettings;

/// Longest accepted wait between two status requests
pub const MAX_POLL_INTERVAL_SECS: f64 = 3600.0;

/// Settings for a versedraft run, read from `conf.json`
///
/// Every section falls back to its defaults when missing, so a config file
/// only needs the keys it changes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Remote translation service
    #[serde(default)]
    pub service: ServiceConfig,

    /// Job polling cadence
    #[serde(default)]
    pub polling: PollingConfig,

    /// Verse batching
    #[serde(default)]
    pub batch: BatchConfig,

    /// Anonymous usage quota
    #[serde(default)]
    pub usage: UsageConfig,

    /// SQLite file for drafts, platform data directory when absent
    #[serde(default)]
    pub database_path: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Remote translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    // @field: Service base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Model name sent with every job
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Account name for the token exchange
    #[serde(default = "String::new")]
    pub username: String,

    // @field: Account password
    #[serde(default = "String::new")]
    pub password: String,

    // @field: Per-request timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Job polling configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PollingConfig {
    /// Seconds between two status requests, fractions allowed
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: f64,

    /// Status requests before the job is reported as timed out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Verse batching configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchConfig {
    /// Verses per remote call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Usage quota configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UsageConfig {
    /// Jobs per day for anonymous users
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Signed-in users bypass the daily limit
    #[serde(default)]
    pub authenticated: bool,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            authenticated: false,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:8000/".to_string()
}

fn default_model() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> f64 {
    3.0
}

fn default_max_attempts() -> u32 {
    1200
}

fn default_batch_size() -> usize {
    10
}

fn default_daily_limit() -> u32 {
    5
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)
            .context("Invalid source language")?;
        crate::language_utils::validate_language_code(&self.target_language)
            .context("Invalid target language")?;

        if self.service.endpoint.trim().is_empty() {
            return Err(anyhow!("Translation service endpoint is required"));
        }
        if !(self.polling.interval_secs > 0.0 && self.polling.interval_secs <= MAX_POLL_INTERVAL_SECS) {
            return Err(anyhow!(
                "Polling interval must be between 0 and {} seconds",
                MAX_POLL_INTERVAL_SECS
            ));
        }
        if self.polling.max_attempts == 0 {
            return Err(anyhow!("Polling needs at least one attempt"));
        }
        if self.batch.batch_size == 0 {
            return Err(anyhow!("Batch size must be at least one verse"));
        }

        Ok(())
    }

    /// Load a configuration file, writing the defaults first when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings::new(
            Duration::try_from_secs_f64(self.polling.interval_secs)
                .unwrap_or(Duration::from_secs_f64(MAX_POLL_INTERVAL_SECS)),
            self.polling.max_attempts,
        )
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.service.username, &self.service.password)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    /// Configured database file, if any
    pub fn database_file(&self) -> Option<PathBuf> {
        self.database_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            service: ServiceConfig::default(),
            polling: PollingConfig::default(),
            batch: BatchConfig::default(),
            usage: UsageConfig::default(),
            database_path: None,
            log_level: LogLevel::default(),
        }
    }
}
