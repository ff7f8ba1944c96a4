//! Path utilities for sysdump data directories

use std::path::PathBuf;
use std::sync::OnceLock;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "SYSDUMP_DATA_DIR";

const DEFAULT_DATA_DIR: &str = "/var/lib/sysdump";

/// Global storage for custom data directory path
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Must be called early in main() before any other path functions are used.
/// If custom_path is None, uses `$SYSDUMP_DATA_DIR` or /var/lib/sysdump.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    // Ignore error if already set (shouldn't happen in normal usage)
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Get the base data directory.
/// Returns the custom path if set via init_data_dir(), otherwise the default.
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Get the config file path (<data_dir>/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Get the logs directory (<data_dir>/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Get the default log file path (<data_dir>/logs/sysdump.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("sysdump.log")
}
