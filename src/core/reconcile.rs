//! Reconciliation of host capture notifications with known entries
//!
//! A system dump is either triggered by a fault on the host, in which case
//! the first thing we hear about it is a notification, or requested by a
//! user, in which case a placeholder entry with the invalid source id
//! already exists. Only one capture can run at a time, so a notification
//! completes the placeholder when there is one and creates a fresh entry
//! otherwise.

use super::error::DumpError;
use crate::data::{DumpEntry, EntryPersistence, EntryStore, INVALID_SOURCE_ID};

/// Result of applying a notification to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// A completed entry already carries this source id; nothing changed
    Duplicate { entry_id: u32 },
    /// The pending placeholder was completed
    Updated(DumpEntry),
    /// No placeholder existed; a new completed entry was created
    Created(DumpEntry),
}

impl NotifyOutcome {
    /// The entry touched by this notification, if any
    pub fn entry(&self) -> Option<&DumpEntry> {
        match self {
            NotifyOutcome::Duplicate { .. } => None,
            NotifyOutcome::Updated(entry) | NotifyOutcome::Created(entry) => Some(entry),
        }
    }
}

/// Apply a capture-complete notification for `source_id`.
///
/// Every change is persisted before the store is touched; on any failure
/// the store and its id counter are left as they were.
pub fn apply_notification(
    store: &mut EntryStore,
    persistence: &dyn EntryPersistence,
    base_path: &str,
    source_id: u32,
    size: u64,
    timestamp: u64,
) -> Result<NotifyOutcome, DumpError> {
    let mut placeholder: Option<&DumpEntry> = None;
    for entry in store.all() {
        if entry.source_id == source_id && entry.is_completed() {
            tracing::info!(
                source_id,
                entry_id = entry.id,
                "System dump entry with this source id is already present"
            );
            return Ok(NotifyOutcome::Duplicate { entry_id: entry.id });
        }

        // Keep scanning so a later completed duplicate still wins
        if entry.source_id == INVALID_SOURCE_ID && placeholder.is_none() {
            placeholder = Some(entry);
        }
    }

    if let Some(pending) = placeholder {
        tracing::info!(
            entry_id = pending.id,
            source_id,
            size,
            "Updating dump entry with notified capture"
        );
        let updated = pending
            .with_completion(timestamp, size, source_id)
            .map_err(|e| DumpError::internal("Error in updating system dump entry", e))?;
        persistence.save(&updated).map_err(|e| {
            DumpError::internal(&format!("Failed to persist entry {}", updated.id), e)
        })?;
        store
            .replace(updated.clone())
            .map_err(|e| DumpError::internal("Error in updating system dump entry", e))?;
        return Ok(NotifyOutcome::Updated(updated));
    }

    let id = store.allocate();
    tracing::info!(
        entry_id = id,
        source_id,
        size,
        "Creating new dump entry for notified capture"
    );
    if store.contains(id) {
        return Err(DumpError::InternalFailure(format!(
            "Entry id {} is already in use",
            id
        )));
    }

    let entry = DumpEntry::completed(base_path, id, timestamp, size, source_id).map_err(|e| {
        tracing::error!(
            error = %e,
            entry_id = id,
            timestamp,
            size,
            source_id,
            "Error in creating system dump entry"
        );
        DumpError::internal("Error in creating system dump entry", e)
    })?;
    persistence
        .create(&entry)
        .map_err(|e| DumpError::internal(&format!("Failed to persist entry {}", id), e))?;
    store
        .insert(entry.clone())
        .map_err(|e| DumpError::internal("Error in creating system dump entry", e))?;
    store.commit(id);

    Ok(NotifyOutcome::Created(entry))
}
