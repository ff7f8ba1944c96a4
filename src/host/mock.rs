//! Mock host collaborators for deterministic testing
//!
//! [`MockHost`] implements every host-facing trait without spawning a
//! process. It answers with configurable states and captures each call so
//! tests can assert on what the manager asked the host to do.
//!
//! # Example
//! ```no_run
//! use sysdump::host::mock::MockHost;
//! use sysdump::host::{BootProgress, HostState};
//!
//! let host = MockHost::new()
//!     .with_state(HostState::Off)
//!     .with_boot_progress(BootProgress::Unspecified);
//! assert_eq!(host.launch_count(), 0);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    BootProgress, CaptureLauncher, DiagnosticLogger, DumpLogEvent, EntryPublisher, HostError,
    HostState, HostStateProvider,
};
use crate::data::DumpEntry;

/// Host double with a running host by default
#[derive(Clone)]
pub struct MockHost {
    state: Arc<Mutex<HostState>>,
    progress: Arc<Mutex<BootProgress>>,
    fail_query: Arc<Mutex<bool>>,
    fail_launch: Arc<Mutex<bool>>,
    fail_log: Arc<Mutex<bool>>,
    launches: Arc<Mutex<usize>>,
    events: Arc<Mutex<Vec<DumpLogEvent>>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState::Running)),
            progress: Arc::new(Mutex::new(BootProgress::OSRunning)),
            fail_query: Arc::new(Mutex::new(false)),
            fail_launch: Arc::new(Mutex::new(false)),
            fail_log: Arc::new(Mutex::new(false)),
            launches: Arc::new(Mutex::new(0)),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_state(self, state: HostState) -> Self {
        self.set_state(state);
        self
    }

    pub fn with_boot_progress(self, progress: BootProgress) -> Self {
        self.set_boot_progress(progress);
        self
    }

    /// Make state queries fail
    pub fn failing_queries(self) -> Self {
        *self.fail_query.lock() = true;
        self
    }

    /// Make capture launches fail
    pub fn failing_launches(self) -> Self {
        *self.fail_launch.lock() = true;
        self
    }

    /// Make diagnostic logging fail
    pub fn failing_logs(self) -> Self {
        *self.fail_log.lock() = true;
        self
    }

    pub fn set_state(&self, state: HostState) {
        *self.state.lock() = state;
    }

    pub fn set_boot_progress(&self, progress: BootProgress) {
        *self.progress.lock() = progress;
    }

    /// Number of capture launches requested (including failed ones)
    pub fn launch_count(&self) -> usize {
        *self.launches.lock()
    }

    /// Diagnostic events received (including failed ones)
    pub fn logged_events(&self) -> Vec<DumpLogEvent> {
        self.events.lock().clone()
    }

    pub fn reset(&self) {
        *self.launches.lock() = 0;
        self.events.lock().clear();
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostStateProvider for MockHost {
    async fn host_state(&self) -> Result<HostState, HostError> {
        if *self.fail_query.lock() {
            return Err(HostError::Unavailable("mock query failure".into()));
        }
        Ok(*self.state.lock())
    }

    async fn boot_progress(&self) -> Result<BootProgress, HostError> {
        if *self.fail_query.lock() {
            return Err(HostError::Unavailable("mock query failure".into()));
        }
        Ok(*self.progress.lock())
    }
}

#[async_trait]
impl CaptureLauncher for MockHost {
    async fn start_capture(&self) -> Result<(), HostError> {
        *self.launches.lock() += 1;
        if *self.fail_launch.lock() {
            return Err(HostError::Unavailable("mock launch failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DiagnosticLogger for MockHost {
    async fn log_dump_event(&self, event: &DumpLogEvent) -> Result<(), HostError> {
        self.events.lock().push(event.clone());
        if *self.fail_log.lock() {
            return Err(HostError::Unavailable("mock logging failure".into()));
        }
        Ok(())
    }
}

/// What a [`RecordingPublisher`] was told
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Added(DumpEntry),
    Updated(DumpEntry),
}

/// Publisher that keeps every notification for later assertions
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<Published>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    pub fn added_ids(&self) -> Vec<u32> {
        self.published
            .lock()
            .iter()
            .filter_map(|p| match p {
                Published::Added(entry) => Some(entry.id),
                Published::Updated(_) => None,
            })
            .collect()
    }

    pub fn updated_ids(&self) -> Vec<u32> {
        self.published
            .lock()
            .iter()
            .filter_map(|p| match p {
                Published::Updated(entry) => Some(entry.id),
                Published::Added(_) => None,
            })
            .collect()
    }
}

impl EntryPublisher for RecordingPublisher {
    fn entry_added(&self, entry: &DumpEntry) {
        self.published.lock().push(Published::Added(entry.clone()));
    }

    fn entry_updated(&self, entry: &DumpEntry) {
        self.published.lock().push(Published::Updated(entry.clone()));
    }
}
