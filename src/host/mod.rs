//! External collaborators of the dump manager
//!
//! The manager never talks to the host directly. It goes through the traits
//! defined here:
//! - [`HostStateProvider`] answers whether the host may be dumped
//! - [`CaptureLauncher`] starts the out-of-band capture unit
//! - [`DiagnosticLogger`] records a structured event for a finished dump
//! - [`EntryPublisher`] tells the transport layer about new/updated entries

mod busctl;
mod command;
mod error;
pub mod mock;
mod publisher;
mod state;
mod systemd;

use std::path::PathBuf;

use async_trait::async_trait;

pub use busctl::{BusctlDiagnosticLogger, BusctlHostState};
pub use error::HostError;
pub use publisher::{EntryPublisher, TracingPublisher};
pub use state::{dump_allowed, BootProgress, HostState};
pub use systemd::{SystemdCaptureLauncher, DEFAULT_CAPTURE_TARGET};

/// Dump type label carried by diagnostic events
pub const SYSTEM_DUMP_FILE_TYPE: &str = "System Dump";

/// Query for the host's power and boot state
#[async_trait]
pub trait HostStateProvider: Send + Sync {
    async fn host_state(&self) -> Result<HostState, HostError>;

    async fn boot_progress(&self) -> Result<BootProgress, HostError>;
}

/// Starts the host's out-of-band capture. No result is consumed.
#[async_trait]
pub trait CaptureLauncher: Send + Sync {
    async fn start_capture(&self) -> Result<(), HostError>;
}

/// Structured event recorded when a dump becomes available
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpLogEvent {
    pub dump_id: u32,
    pub file_path: PathBuf,
    pub file_type: String,
}

impl DumpLogEvent {
    pub fn system_dump(dump_id: u32, file_path: PathBuf) -> Self {
        Self {
            dump_id,
            file_path,
            file_type: SYSTEM_DUMP_FILE_TYPE.to_string(),
        }
    }
}

/// Sink for diagnostic log events
#[async_trait]
pub trait DiagnosticLogger: Send + Sync {
    async fn log_dump_event(&self, event: &DumpLogEvent) -> Result<(), HostError>;
}
