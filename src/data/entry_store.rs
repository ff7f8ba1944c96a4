//! In-memory entry map and id allocation

use std::collections::BTreeMap;
use thiserror::Error;

use super::models::DumpEntry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Entry {0} already exists")]
    DuplicateId(u32),
    #[error("Entry {0} not found")]
    NotFound(u32),
}

/// Owner of every dump entry known to the process and of the id counter.
///
/// The store holds no reconciliation policy. Ids handed out by
/// [`EntryStore::allocate`] only become "used" once the caller calls
/// [`EntryStore::commit`] after a successful creation.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: BTreeMap<u32, DumpEntry>,
    last_id: u32,
}

impl EntryStore {
    /// Create an empty store with no ids in use
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id to use for a new entry. Does not advance the counter.
    pub fn allocate(&self) -> u32 {
        self.last_id.saturating_add(1)
    }

    /// Record that `id` has been used by a committed creation
    pub fn commit(&mut self, id: u32) {
        self.last_id = self.last_id.max(id);
    }

    /// Highest id handed out so far (0 when none)
    pub fn last_id(&self) -> u32 {
        self.last_id
    }

    /// Add a new entry
    pub fn insert(&mut self, entry: DumpEntry) -> Result<(), StoreError> {
        if self.entries.contains_key(&entry.id) {
            return Err(StoreError::DuplicateId(entry.id));
        }
        self.entries.insert(entry.id, entry);
        Ok(())
    }

    /// Swap an existing entry for its updated form
    pub(crate) fn replace(&mut self, entry: DumpEntry) -> Result<(), StoreError> {
        match self.entries.get_mut(&entry.id) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(StoreError::NotFound(entry.id)),
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<&DumpEntry> {
        self.entries.get(&id)
    }

    /// Iterate every entry in ascending id order
    pub fn all(&self) -> impl Iterator<Item = &DumpEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose capture is still running, if any
    pub fn in_progress(&self) -> Option<&DumpEntry> {
        self.all().find(|entry| !entry.is_completed())
    }

    /// Number of in-flight placeholders awaiting correlation (at most 1)
    pub fn pending_placeholder_count(&self) -> usize {
        self.all()
            .filter(|entry| entry.is_pending_placeholder())
            .count()
    }

    /// Largest of the ids found during restore, or 0 when none were
    pub fn highest_restored_id(ids: &[u32]) -> u32 {
        ids.iter().copied().max().unwrap_or(0)
    }
}
