use crate::data::DumpEntry;

/// Receives entries as they appear or change so the transport layer can
/// expose them. Called with no store lock held.
pub trait EntryPublisher: Send + Sync {
    fn entry_added(&self, entry: &DumpEntry);

    fn entry_updated(&self, entry: &DumpEntry);
}

/// Publisher that only records entries in the trace log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

impl EntryPublisher for TracingPublisher {
    fn entry_added(&self, entry: &DumpEntry) {
        tracing::info!(
            entry_id = entry.id,
            path = %entry.object_path,
            status = %entry.status,
            "Dump entry added"
        );
    }

    fn entry_updated(&self, entry: &DumpEntry) {
        tracing::info!(
            entry_id = entry.id,
            path = %entry.object_path,
            source_id = entry.source_id,
            size = entry.size,
            "Dump entry updated"
        );
    }
}
