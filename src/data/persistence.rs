//! Durable per-entry records
//!
//! Every entry is written as its own JSON document, keyed by the decimal
//! entry id. Writes go through a temporary file in the same directory that
//! is fsynced and renamed over the final name, so a crash never leaves a
//! half-written record behind.
//!
//! The entry directory has a single writer: [`FileEntryPersistence`] holds
//! an exclusive `flock` on `<dir>/.lock` for as long as it lives.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{DumpEntry, OperationStatus, OriginatorType};

/// Current on-disk record version
pub const RECORD_VERSION: u32 = 1;

const TEMP_PREFIX: &str = ".entry-";
const LOCK_FILE: &str = ".lock";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Record serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unsupported record version {0}")]
    UnsupportedVersion(u32),
    #[error("Record {0} not found")]
    NotFound(String),
    #[error("Record {0} already exists")]
    AlreadyExists(u32),
    #[error("Entry directory {0} is locked by another process")]
    Locked(PathBuf),
    #[error("Simulated write failure")]
    WriteRejected,
}

impl PersistenceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serialized form of a dump entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub version: u32,
    pub timestamp: u64,
    pub size: u64,
    pub source_id: u32,
    pub status: OperationStatus,
    #[serde(default)]
    pub originator_id: String,
    pub originator_type: OriginatorType,
}

impl PersistedEntry {
    pub fn from_entry(entry: &DumpEntry) -> Self {
        Self {
            version: RECORD_VERSION,
            timestamp: entry.timestamp,
            size: entry.size,
            source_id: entry.source_id,
            status: entry.status,
            originator_id: entry.originator_id.clone(),
            originator_type: entry.originator_type,
        }
    }

    /// Load the persisted fields into a provisional entry
    pub fn apply_to(self, entry: &mut DumpEntry) -> Result<(), PersistenceError> {
        if self.version > RECORD_VERSION {
            return Err(PersistenceError::UnsupportedVersion(self.version));
        }
        entry.timestamp = self.timestamp;
        entry.size = self.size;
        entry.source_id = self.source_id;
        entry.status = self.status;
        entry.originator_id = self.originator_id;
        entry.originator_type = self.originator_type;
        Ok(())
    }
}

/// Storage backend for entry records
pub trait EntryPersistence: Send + Sync {
    /// Write the record for a new entry. Fails with `AlreadyExists` instead
    /// of replacing a record that is already stored under the same id.
    fn create(&self, entry: &DumpEntry) -> Result<(), PersistenceError>;

    /// Write (or overwrite) the record for `entry`. Returns once durable.
    fn save(&self, entry: &DumpEntry) -> Result<(), PersistenceError>;

    /// Keys of every stored record. Empty when the store does not exist yet.
    fn record_keys(&self) -> Result<Vec<String>, PersistenceError>;

    /// Read and decode one record
    fn load(&self, key: &str) -> Result<PersistedEntry, PersistenceError>;
}

/// Directory-backed persistence: one file per entry id.
///
/// Opening takes the directory lock; clones share it and it is released
/// when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct FileEntryPersistence {
    dir: PathBuf,
    _lock: Arc<File>,
}

impl FileEntryPersistence {
    /// Open `dir`, waiting for any other process holding it to let go
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        Self::acquire(dir.into(), true)
    }

    /// Open `dir`, failing with `Locked` if another holder has it
    pub fn try_open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        Self::acquire(dir.into(), false)
    }

    fn acquire(dir: PathBuf, wait: bool) -> Result<Self, PersistenceError> {
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

        let lock_path = dir.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| PersistenceError::io(&lock_path, e))?;

        if wait {
            FileExt::lock_exclusive(&lock).map_err(|e| PersistenceError::io(&lock_path, e))?;
        } else {
            FileExt::try_lock_exclusive(&lock).map_err(|e| {
                if e.kind() == fs2::lock_contended_error().kind() {
                    PersistenceError::Locked(dir.clone())
                } else {
                    PersistenceError::io(&lock_path, e)
                }
            })?;
        }

        let persistence = Self {
            dir,
            _lock: Arc::new(lock),
        };
        persistence.remove_stale_temp_files();
        Ok(persistence)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for entry `id`
    pub fn record_path(&self, id: u32) -> PathBuf {
        self.dir.join(id.to_string())
    }

    /// Delete temporary files left by writes interrupted before the rename.
    /// Only safe while the directory lock is held.
    fn remove_stale_temp_files(&self) {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to scan entry directory");
                return;
            }
        };

        for item in read_dir.flatten() {
            let name = item.file_name().to_string_lossy().to_string();
            if !name.starts_with(TEMP_PREFIX) {
                continue;
            }
            match fs::remove_file(item.path()) {
                Ok(()) => tracing::info!(file = %name, "Removed leftover temporary entry file"),
                Err(e) => tracing::warn!(file = %name, error = %e, "Failed to remove temporary entry file"),
            }
        }
    }

    /// Serialize `entry` into a synced temporary file next to its record
    fn write_temp(&self, entry: &DumpEntry) -> Result<tempfile::NamedTempFile, PersistenceError> {
        let record = PersistedEntry::from_entry(entry);
        let payload = serde_json::to_vec_pretty(&record)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| PersistenceError::io(&self.dir, e))?;
        tmp.write_all(&payload)
            .map_err(|e| PersistenceError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| PersistenceError::io(tmp.path(), e))?;
        Ok(tmp)
    }
}

impl EntryPersistence for FileEntryPersistence {
    fn create(&self, entry: &DumpEntry) -> Result<(), PersistenceError> {
        let tmp = self.write_temp(entry)?;

        let target = self.record_path(entry.id);
        tmp.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                PersistenceError::AlreadyExists(entry.id)
            } else {
                PersistenceError::io(&target, e.error)
            }
        })?;
        sync_dir(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;

        tracing::debug!(entry_id = entry.id, path = %target.display(), "Created dump entry record");
        Ok(())
    }

    fn save(&self, entry: &DumpEntry) -> Result<(), PersistenceError> {
        let tmp = self.write_temp(entry)?;

        let target = self.record_path(entry.id);
        tmp.persist(&target)
            .map_err(|e| PersistenceError::io(&target, e.error))?;
        sync_dir(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;

        tracing::debug!(entry_id = entry.id, path = %target.display(), "Persisted dump entry");
        Ok(())
    }

    fn record_keys(&self) -> Result<Vec<String>, PersistenceError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let read_dir = fs::read_dir(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;
        for item in read_dir {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let name = item.file_name().to_string_lossy().to_string();
            // Lock file and temporary files from an interrupted write
            if name.starts_with('.') {
                tracing::debug!(file = %name, "Ignoring hidden file in entry directory");
                continue;
            }
            keys.push(name);
        }
        keys.sort();
        Ok(keys)
    }

    fn load(&self, key: &str) -> Result<PersistedEntry, PersistenceError> {
        let path = self.dir.join(key);
        let contents = fs::read(&path).map_err(|e| PersistenceError::io(&path, e))?;
        Ok(serde_json::from_slice(&contents)?)
    }
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> std::io::Result<()> {
    fs::File::open(path)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// In-memory persistence holding raw record payloads.
///
/// Used by tests and dry runs; can be told to reject writes.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_writes: Mutex<bool>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Store an arbitrary payload under `key`
    pub fn insert_raw(&self, key: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.records.lock().insert(key.into(), payload.into());
    }

    /// Decoded record for entry `id`, if present and valid
    pub fn record(&self, id: u32) -> Option<PersistedEntry> {
        self.load(&id.to_string()).ok()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl EntryPersistence for MemoryPersistence {
    fn create(&self, entry: &DumpEntry) -> Result<(), PersistenceError> {
        if *self.fail_writes.lock() {
            return Err(PersistenceError::WriteRejected);
        }
        let payload = serde_json::to_vec(&PersistedEntry::from_entry(entry))?;
        let mut records = self.records.lock();
        let key = entry.id.to_string();
        if records.contains_key(&key) {
            return Err(PersistenceError::AlreadyExists(entry.id));
        }
        records.insert(key, payload);
        Ok(())
    }

    fn save(&self, entry: &DumpEntry) -> Result<(), PersistenceError> {
        if *self.fail_writes.lock() {
            return Err(PersistenceError::WriteRejected);
        }
        let payload = serde_json::to_vec(&PersistedEntry::from_entry(entry))?;
        self.records.lock().insert(entry.id.to_string(), payload);
        Ok(())
    }

    fn record_keys(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.records.lock().keys().cloned().collect())
    }

    fn load(&self, key: &str) -> Result<PersistedEntry, PersistenceError> {
        let records = self.records.lock();
        let payload = records
            .get(key)
            .ok_or_else(|| PersistenceError::NotFound(key.to_string()))?;
        Ok(serde_json::from_slice(payload)?)
    }
}
