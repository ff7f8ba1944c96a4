//! Rebuilding the entry store from persisted records at startup

use crate::data::{DumpEntry, EntryPersistence, EntryStore};

/// A persisted record that could not be restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub key: String,
    pub reason: String,
}

/// What a restore pass recovered and what it had to leave behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<u32>,
    pub skipped: Vec<SkippedRecord>,
}

impl EntryStore {
    /// Build a store from every readable record in `persistence`.
    ///
    /// Bad records are skipped and reported; they never abort the restore.
    /// The id counter resumes after the highest id found on disk, including
    /// ids of records that could not be loaded, so none of them is reused.
    pub fn restore(persistence: &dyn EntryPersistence, base_path: &str) -> (Self, RestoreReport) {
        let mut store = EntryStore::new();
        let mut report = RestoreReport::default();

        let keys = match persistence.record_keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list persisted dump entries");
                return (store, report);
            }
        };
        if keys.is_empty() {
            tracing::info!("No persisted system dump entries to restore");
            return (store, report);
        }

        let mut observed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Ok(id) = record_id(&key) {
                observed.push(id);
            }
            match restore_record(persistence, base_path, &key) {
                Ok(entry) => {
                    let id = entry.id;
                    if let Err(e) = store.insert(entry) {
                        skip(&mut report, key, e.to_string());
                        continue;
                    }
                    report.restored.push(id);
                }
                Err(reason) => skip(&mut report, key, reason),
            }
        }

        report.restored.sort_unstable();
        store.commit(EntryStore::highest_restored_id(&observed));
        tracing::info!(
            restored = report.restored.len(),
            skipped = report.skipped.len(),
            last_id = store.last_id(),
            "Restored system dump entries"
        );
        (store, report)
    }
}

fn record_id(key: &str) -> Result<u32, String> {
    let id: u32 = key
        .parse()
        .map_err(|_| format!("record name {:?} is not an entry id", key))?;
    if id == 0 {
        return Err("entry id 0 is never assigned".to_string());
    }
    Ok(id)
}

fn restore_record(
    persistence: &dyn EntryPersistence,
    base_path: &str,
    key: &str,
) -> Result<DumpEntry, String> {
    let id = record_id(key)?;

    let mut entry = DumpEntry::provisional(base_path, id).map_err(|e| e.to_string())?;
    let record = persistence.load(key).map_err(|e| e.to_string())?;
    record.apply_to(&mut entry).map_err(|e| e.to_string())?;
    Ok(entry)
}

fn skip(report: &mut RestoreReport, key: String, reason: String) {
    tracing::error!(record = %key, reason = %reason, "Error in restoring dump entry");
    report.skipped.push(SkippedRecord { key, reason });
}
