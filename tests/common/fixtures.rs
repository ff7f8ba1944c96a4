//! Manager fixtures backed by a temporary entry directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sysdump::config::DumpConfig;
use sysdump::core::{Collaborators, DumpManager, RestoreReport};
use sysdump::data::{
    FileEntryPersistence, PersistedEntry, PersistenceError, DEFAULT_BASE_ENTRY_PATH,
};
use sysdump::host::mock::{MockHost, RecordingPublisher};
use tempfile::TempDir;

/// A temporary data directory with a mock host.
///
/// Each call to [`TestEnv::open`] builds a fresh manager over the same
/// directory, which is how tests simulate a restart.
pub struct TestEnv {
    dir: TempDir,
    pub host: MockHost,
    pub publisher: RecordingPublisher,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            host: MockHost::new(),
            publisher: RecordingPublisher::new(),
        }
    }

    pub fn entries_dir(&self) -> PathBuf {
        self.dir.path().join("entries")
    }

    pub fn dumps_dir(&self) -> PathBuf {
        self.dir.path().join("dumps")
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> DumpConfig {
        DumpConfig {
            base_entry_path: DEFAULT_BASE_ENTRY_PATH.to_string(),
            dump_dir: self.dumps_dir(),
        }
    }

    /// Open a manager over the directory, restoring whatever is on disk.
    /// Blocks while another manager holds the directory.
    pub fn open(&self) -> (DumpManager, RestoreReport) {
        let persistence =
            FileEntryPersistence::open(self.entries_dir()).expect("Failed to open entries dir");
        self.manager_over(persistence)
    }

    /// Like [`TestEnv::open`] but fails instead of waiting for the lock
    pub fn try_open(&self) -> Result<(DumpManager, RestoreReport), PersistenceError> {
        let persistence = FileEntryPersistence::try_open(self.entries_dir())?;
        Ok(self.manager_over(persistence))
    }

    fn manager_over(&self, persistence: FileEntryPersistence) -> (DumpManager, RestoreReport) {
        let collaborators = Collaborators::mock(self.host.clone())
            .with_publisher(Arc::new(self.publisher.clone()));
        DumpManager::open(self.settings(), Arc::new(persistence), collaborators)
    }

    /// Decode the record file of entry `id` straight from disk
    pub fn read_record(&self, id: u32) -> PersistedEntry {
        let path = self.entries_dir().join(id.to_string());
        let contents = std::fs::read(&path).expect("Failed to read record");
        serde_json::from_slice(&contents).expect("Failed to decode record")
    }

    /// Write a raw file into the entry directory
    pub fn write_record(&self, name: &str, contents: &str) {
        std::fs::create_dir_all(self.entries_dir()).expect("Failed to create entries dir");
        std::fs::write(self.entries_dir().join(name), contents).expect("Failed to write record");
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
