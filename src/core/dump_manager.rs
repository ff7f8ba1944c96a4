//! Single owner of the system dump entries.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;

use super::error::DumpError;
use super::params::{CreateParams, CREATE_DUMP_MAX_PARAMS};
use super::reconcile::{self, NotifyOutcome};
use super::request_gate;
use super::restore::RestoreReport;
use crate::config::{Config, DumpConfig, HostConfig};
use crate::data::{
    now_micros, DumpEntry, EntryPersistence, EntryStore, FileEntryPersistence, ObjectPath,
    PersistenceError,
};
use crate::host::mock::MockHost;
use crate::host::{
    BusctlDiagnosticLogger, BusctlHostState, CaptureLauncher, DiagnosticLogger, DumpLogEvent,
    EntryPublisher, HostStateProvider, SystemdCaptureLauncher, TracingPublisher,
};

/// External collaborators the manager calls out to
#[derive(Clone)]
pub struct Collaborators {
    pub host: Arc<dyn HostStateProvider>,
    pub launcher: Arc<dyn CaptureLauncher>,
    pub logger: Arc<dyn DiagnosticLogger>,
    pub publisher: Arc<dyn EntryPublisher>,
}

impl Collaborators {
    /// Process-backed collaborators talking to the real host tooling
    pub fn system(config: &HostConfig) -> Self {
        let timeout = config.command_timeout();
        Self {
            host: Arc::new(BusctlHostState::new(timeout)),
            launcher: Arc::new(SystemdCaptureLauncher::new(
                config.capture_target.clone(),
                timeout,
            )),
            logger: Arc::new(BusctlDiagnosticLogger::new(timeout)),
            publisher: Arc::new(TracingPublisher),
        }
    }

    /// Every host-facing role served by one mock
    pub fn mock(host: MockHost) -> Self {
        let host = Arc::new(host);
        Self {
            host: host.clone(),
            launcher: host.clone(),
            logger: host,
            publisher: Arc::new(TracingPublisher),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EntryPublisher>) -> Self {
        self.publisher = publisher;
        self
    }
}

/// Tracks system dump entries: reconciles host notifications, admits user
/// requests and keeps every change durable.
///
/// Mutations take the store's write lock; collaborator calls happen only
/// after it has been released. `create_dump` calls are additionally
/// serialized so two requests cannot both pass the in-flight check.
/// Diagnostic log events are written in the background; pending ones are
/// aborted when the manager is dropped unless
/// [`flush_diagnostics`](Self::flush_diagnostics) is awaited first.
pub struct DumpManager {
    store: RwLock<EntryStore>,
    create_gate: AsyncMutex<()>,
    diagnostics: Mutex<JoinSet<()>>,
    persistence: Arc<dyn EntryPersistence>,
    collaborators: Collaborators,
    settings: DumpConfig,
}

impl DumpManager {
    /// Restore persisted entries and build a manager around them
    pub fn open(
        settings: DumpConfig,
        persistence: Arc<dyn EntryPersistence>,
        collaborators: Collaborators,
    ) -> (Self, RestoreReport) {
        let (store, report) =
            EntryStore::restore(persistence.as_ref(), &settings.base_entry_path);
        for entry in store.all() {
            collaborators.publisher.entry_added(entry);
        }

        let manager = Self {
            store: RwLock::new(store),
            create_gate: AsyncMutex::new(()),
            diagnostics: Mutex::new(JoinSet::new()),
            persistence,
            collaborators,
            settings,
        };
        (manager, report)
    }

    /// Manager over the configured entry directory and the real host.
    ///
    /// Waits for exclusive use of the entry directory, which the manager
    /// keeps until it is dropped.
    pub fn from_config(config: &Config) -> Result<(Self, RestoreReport), PersistenceError> {
        let persistence = FileEntryPersistence::open(config.storage.persist_dir.clone())?;
        Ok(Self::open(
            config.dump.clone(),
            Arc::new(persistence),
            Collaborators::system(&config.host),
        ))
    }

    /// Handle a capture-complete notification from the host.
    ///
    /// Failures are logged and reported as `None`; the caller never sees an
    /// error.
    pub async fn notify(&self, source_id: u32, size: u64) -> Option<NotifyOutcome> {
        let timestamp = now_micros();
        let result = {
            let mut store = self.store.write();
            reconcile::apply_notification(
                &mut store,
                self.persistence.as_ref(),
                &self.settings.base_entry_path,
                source_id,
                size,
                timestamp,
            )
        };

        match result {
            Ok(outcome) => {
                match &outcome {
                    NotifyOutcome::Duplicate { .. } => {}
                    NotifyOutcome::Updated(entry) => {
                        self.collaborators.publisher.entry_updated(entry);
                        self.log_dump_available(entry);
                    }
                    NotifyOutcome::Created(entry) => {
                        self.collaborators.publisher.entry_added(entry);
                        self.log_dump_available(entry);
                    }
                }
                Some(outcome)
            }
            Err(e) => {
                tracing::error!(source_id, size, error = %e, "Failed to record system dump notification");
                None
            }
        }
    }

    /// Admit a user request for a system dump and create its placeholder.
    pub async fn create_dump(&self, params: CreateParams) -> Result<ObjectPath, DumpError> {
        let _gate = self.create_gate.lock().await;

        if params.len() > CREATE_DUMP_MAX_PARAMS {
            tracing::warn!(
                count = params.len(),
                "System dump accepts not more than {} additional parameters",
                CREATE_DUMP_MAX_PARAMS
            );
        }

        {
            let store = self.store.read();
            request_gate::ensure_no_capture_in_flight(&store)?;
        }
        request_gate::ensure_host_eligible(self.collaborators.host.as_ref()).await?;
        let originator = params.originator()?;

        // Launch is not rolled back if the placeholder cannot be created
        if let Err(e) = self.collaborators.launcher.start_capture().await {
            tracing::warn!(error = %e, "Failed to start system dump capture");
        }

        let timestamp = now_micros();
        let entry = {
            let mut store = self.store.write();
            request_gate::create_placeholder(
                &mut store,
                self.persistence.as_ref(),
                &self.settings.base_entry_path,
                originator,
                timestamp,
            )?
        };

        self.collaborators.publisher.entry_added(&entry);
        Ok(entry.object_path)
    }

    fn log_dump_available(&self, entry: &DumpEntry) {
        let event = DumpLogEvent::system_dump(entry.id, self.settings.dump_file_path(entry.id));
        let logger = Arc::clone(&self.collaborators.logger);

        let mut pending = self.diagnostics.lock();
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            if let Err(e) = logger.log_dump_event(&event).await {
                tracing::error!(entry_id = event.dump_id, error = %e, "Failed to create diagnostic log entry");
            }
        });
    }

    /// Wait until every diagnostic log event issued so far has been written
    pub async fn flush_diagnostics(&self) {
        let mut pending = std::mem::take(&mut *self.diagnostics.lock());
        while pending.join_next().await.is_some() {}
    }

    /// Snapshot of every entry in id order
    pub fn entries(&self) -> Vec<DumpEntry> {
        self.store.read().all().cloned().collect()
    }

    pub fn entry(&self, id: u32) -> Option<DumpEntry> {
        self.store.read().get(id).cloned()
    }

    /// Exposure paths of every entry in id order
    pub fn object_paths(&self) -> Vec<ObjectPath> {
        self.store
            .read()
            .all()
            .map(|entry| entry.object_path.clone())
            .collect()
    }

    /// The capture currently running, if any
    pub fn in_progress(&self) -> Option<DumpEntry> {
        self.store.read().in_progress().cloned()
    }

    /// Id the next created entry will receive
    pub fn next_id(&self) -> u32 {
        self.store.read().allocate()
    }

    pub fn dump_file_path(&self, id: u32) -> PathBuf {
        self.settings.dump_file_path(id)
    }

    pub fn settings(&self) -> &DumpConfig {
        &self.settings
    }
}

impl std::fmt::Debug for DumpManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.store.read();
        f.debug_struct("DumpManager")
            .field("entries", &store.len())
            .field("last_id", &store.last_id())
            .field("settings", &self.settings)
            .finish()
    }
}
