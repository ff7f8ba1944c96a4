mod settings;

pub use settings::{Config, DumpConfig, HostConfig, StorageConfig, EXAMPLE_CONFIG};
