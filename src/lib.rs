pub mod config;
pub mod core;
pub mod data;
pub mod host;
pub mod util;

pub use crate::core::{
    Collaborators, CreateParams, DumpError, DumpManager, NotifyOutcome, RestoreReport,
};
pub use config::Config;
pub use data::{
    DumpEntry, EntryPersistence, EntryStore, FileEntryPersistence, ObjectPath, OperationStatus,
    Originator, OriginatorType,
};
pub use host::{BootProgress, HostState};
