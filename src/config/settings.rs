use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::data::DEFAULT_BASE_ENTRY_PATH;
use crate::host::DEFAULT_CAPTURE_TARGET;
use crate::util::paths::{config_path, data_dir};

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where entry records are persisted
    pub storage: StorageConfig,
    /// How entries are exposed and where their artifacts live
    pub dump: DumpConfig,
    /// Host tooling settings
    pub host: HostConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding one record file per entry
    pub persist_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpConfig {
    /// Object path prefix for entries
    pub base_entry_path: String,
    /// Directory the offloaded dump files are stored in
    pub dump_dir: PathBuf,
}

impl DumpConfig {
    /// Location of the dump file for entry `id`
    pub fn dump_file_path(&self, id: u32) -> PathBuf {
        self.dump_dir.join(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// systemd unit that starts the out-of-band capture
    pub capture_target: String,
    /// Upper bound for any single host tooling call
    pub command_timeout_ms: u64,
}

impl HostConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        let data = data_dir();
        Self {
            storage: StorageConfig {
                persist_dir: data.join("entries"),
            },
            dump: DumpConfig {
                base_entry_path: DEFAULT_BASE_ENTRY_PATH.to_string(),
                dump_dir: data.join("dumps"),
            },
            host: HostConfig {
                capture_target: DEFAULT_CAPTURE_TARGET.to_string(),
                command_timeout_ms: 5_000,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlStorageConfig {
    pub persist_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlDumpConfig {
    pub base_entry_path: Option<String>,
    pub dump_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlHostConfig {
    pub capture_target: Option<String>,
    pub command_timeout_ms: Option<u64>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub storage: Option<TomlStorageConfig>,
    pub dump: Option<TomlDumpConfig>,
    pub host: Option<TomlHostConfig>,
}

impl Config {
    /// Load configuration from the default location, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from `path`. A missing or unreadable file yields
    /// the defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file");
                Config::default()
            }
        }
    }

    /// Parse TOML contents layered over the defaults
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let toml_config = toml::from_str::<TomlConfig>(contents)?;
        let mut config = Config::default();

        if let Some(storage) = toml_config.storage {
            if let Some(persist_dir) = storage.persist_dir {
                config.storage.persist_dir = persist_dir;
            }
        }

        if let Some(dump) = toml_config.dump {
            if let Some(base_entry_path) = dump.base_entry_path {
                config.dump.base_entry_path = base_entry_path;
            }
            if let Some(dump_dir) = dump.dump_dir {
                config.dump.dump_dir = dump_dir;
            }
        }

        if let Some(host) = toml_config.host {
            if let Some(capture_target) = host.capture_target {
                config.host.capture_target = capture_target;
            }
            if let Some(command_timeout_ms) = host.command_timeout_ms {
                config.host.command_timeout_ms = command_timeout_ms;
            }
        }

        Ok(config)
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_persist_dir(mut self, dir: PathBuf) -> Self {
        self.storage.persist_dir = dir;
        self
    }

    pub fn with_dump_dir(mut self, dir: PathBuf) -> Self {
        self.dump.dump_dir = dir;
        self
    }
}
