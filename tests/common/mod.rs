/*!
 * Common test utilities for the versedraft test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use versedraft::app_config::Config;
use versedraft::app_controller::Controller;
use versedraft::database::Repository;
use versedraft::providers::mock::MockJobProvider;

/// A short book with headings, a chapter and three verses
pub const SAMPLE_USFM: &str = "\\id GEN Sample book\n\
\\h Genesis\n\
\\mt1 The Book of Genesis\n\
\\c 1\n\
\\p\n\
\\v 1 In the beginning God created the heavens and the earth.\n\
\\v 2 The earth was formless and empty.\n\
\\v 3 God said, Let there be light.\n";

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Configuration with fast polling and a generous quota
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.polling.interval_secs = 0.01;
    config.polling.max_attempts = 5;
    config.batch.batch_size = 2;
    config.usage.daily_limit = 100;
    config.service.username = "tester".to_string();
    config.service.password = "secret".to_string();
    config
}

/// Route log output through the test harness; repeated calls are ignored
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Controller backed by a mock service and an in-memory database
pub fn test_controller(provider: MockJobProvider, config: Config) -> Result<Controller> {
    init_logging();
    let repository = Repository::new_in_memory()?;
    Ok(Controller::with_components(config, Arc::new(provider), repository).without_progress())
}
