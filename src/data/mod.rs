//! Data layer for system dump entries
//!
//! This module provides the entry model, the in-memory entry store and the
//! durable per-entry records it is rebuilt from.

mod entry_store;
mod models;
mod persistence;

pub use entry_store::{EntryStore, StoreError};
pub use models::{
    now_micros, DumpEntry, EntryError, ObjectPath, OperationStatus, Originator, OriginatorType,
    DEFAULT_BASE_ENTRY_PATH, INVALID_SOURCE_ID,
};
pub use persistence::{
    EntryPersistence, FileEntryPersistence, MemoryPersistence, PersistedEntry, PersistenceError,
    RECORD_VERSION,
};
