//! Preconditions and placeholder creation for user-requested dumps

use super::error::DumpError;
use crate::data::{DumpEntry, EntryPersistence, EntryStore, Originator};
use crate::host::{dump_allowed, HostStateProvider};

/// Reason given when the host is not in a dumpable state
pub const HOST_NOT_UP_REASON: &str = "System dump can be initiated only when the host is up";

/// Reject the request while another capture is still running
pub fn ensure_no_capture_in_flight(store: &EntryStore) -> Result<(), DumpError> {
    if let Some(entry) = store.in_progress() {
        tracing::error!(
            entry_id = entry.id,
            "Another dump in progress or available to offload"
        );
        return Err(DumpError::Unavailable);
    }
    Ok(())
}

/// Reject the request unless the host is running, quiesced, or powering off
pub async fn ensure_host_eligible(host: &dyn HostStateProvider) -> Result<(), DumpError> {
    let state = host
        .host_state()
        .await
        .map_err(|e| DumpError::internal("Failed to get host state", e))?;
    let progress = host
        .boot_progress()
        .await
        .map_err(|e| DumpError::internal("Failed to get boot progress", e))?;

    if !dump_allowed(progress, state) {
        tracing::warn!(
            host_state = %state,
            boot_progress = %progress,
            "Rejecting system dump request"
        );
        return Err(DumpError::NotAllowed(HOST_NOT_UP_REASON.to_string()));
    }
    Ok(())
}

/// Create, persist and insert the placeholder for a requested capture.
///
/// The in-flight check is repeated here so the store never holds two
/// pending placeholders, whatever the caller did beforehand.
pub fn create_placeholder(
    store: &mut EntryStore,
    persistence: &dyn EntryPersistence,
    base_path: &str,
    originator: Originator,
    timestamp: u64,
) -> Result<DumpEntry, DumpError> {
    ensure_no_capture_in_flight(store)?;

    let id = store.allocate();
    if store.contains(id) {
        return Err(DumpError::InternalFailure(format!(
            "Entry id {} is already in use",
            id
        )));
    }

    let entry = DumpEntry::placeholder(base_path, id, timestamp, originator).map_err(|e| {
        tracing::error!(error = %e, entry_id = id, "Error in creating system dump entry");
        DumpError::internal("Error in creating system dump entry", e)
    })?;
    persistence
        .create(&entry)
        .map_err(|e| DumpError::internal(&format!("Failed to persist entry {}", id), e))?;
    store
        .insert(entry.clone())
        .map_err(|e| DumpError::internal("Error in creating system dump entry", e))?;
    store.commit(id);

    tracing::info!(entry_id = id, path = %entry.object_path, "Created system dump placeholder");
    Ok(entry)
}
