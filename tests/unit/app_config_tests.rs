/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use std::time::Duration;
use versedraft::app_config::{Config, LogLevel};

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.polling.interval_secs, 3.0);
    assert_eq!(config.polling.max_attempts, 1200);
    assert_eq!(config.batch.batch_size, 10);
    assert_eq!(config.usage.daily_limit, 5);
    assert!(!config.usage.authenticated);
    assert!(config.database_path.is_none());
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_pollSettings_withOversizedInterval_shouldNotPanic() {
    let mut config = Config::default();
    config.polling.interval_secs = 1e20;

    let settings = config.poll_settings();

    assert_eq!(settings.interval, Duration::from_secs(3600));
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.source_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "eng".to_string();
    assert!(config.validate().is_ok());

    config.target_language = "".to_string();
    assert!(config.validate().is_err());
    config.target_language = "fr".to_string();

    config.service.endpoint = "  ".to_string();
    assert!(config.validate().is_err());
    config.service.endpoint = "http://localhost:8000".to_string();

    config.polling.interval_secs = 0.0;
    assert!(config.validate().is_err());
    config.polling.interval_secs = 1e20;
    assert!(config.validate().is_err());
    config.polling.interval_secs = f64::NAN;
    assert!(config.validate().is_err());
    config.polling.interval_secs = 0.5;

    config.polling.max_attempts = 0;
    assert!(config.validate().is_err());
    config.polling.max_attempts = 1;

    config.batch.batch_size = 0;
    assert!(config.validate().is_err());
    config.batch.batch_size = 1;

    assert!(config.validate().is_ok());
}

/// Partial files fall back to defaults for missing sections
#[test]
fn test_config_deserialize_withMissingSections_shouldUseDefaults() -> Result<()> {
    let json = r#"{
        "source_language": "en",
        "target_language": "de",
        "polling": { "interval_secs": 1.5 },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json)?;

    assert_eq!(config.target_language, "de");
    assert_eq!(config.polling.interval_secs, 1.5);
    assert_eq!(config.polling.max_attempts, 1200);
    assert_eq!(config.batch.batch_size, 10);
    assert_eq!(config.service.timeout_secs, 30);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.poll_settings().interval, Duration::from_millis(1500));
    Ok(())
}

/// Missing files are created with the defaults
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.exists());

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.target_language, created.target_language);
    assert_eq!(reloaded.polling, created.polling);
    Ok(())
}

/// Saved changes survive a reload
#[test]
fn test_save_thenFromFile_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("custom.json");

    let mut config = Config::default();
    config.target_language = "es".to_string();
    config.usage.authenticated = true;
    config.database_path = Some("/tmp/drafts.db".to_string());
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.target_language, "es");
    assert!(loaded.usage.authenticated);
    assert_eq!(loaded.database_file(), Some(std::path::PathBuf::from("/tmp/drafts.db")));
    Ok(())
}

/// Broken JSON is reported with the file name
#[test]
fn test_fromFile_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ not json")?;

    let error = Config::from_file(&path).unwrap_err();
    assert!(error.to_string().contains("broken.json"));
    Ok(())
}

/// Credentials come from the service section
#[test]
fn test_credentials_shouldUseServiceAccount() {
    let mut config = Config::default();
    assert!(!config.credentials().is_complete());

    config.service.username = "alice".to_string();
    config.service.password = "pw".to_string();
    let credentials = config.credentials();

    assert!(credentials.is_complete());
    assert_eq!(credentials.username, "alice");
}

#[test]
fn test_logLevel_toLevelFilter_shouldMatch() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
