//! Core dump management shared by the daemon and the CLI.
//!
//! - [`reconcile`] folds host notifications into the entry store
//! - [`request_gate`] decides whether a user request may start a capture
//! - [`restore`] rebuilds the store from persisted records at startup
//! - [`DumpManager`] ties them together behind one lock discipline

mod dump_manager;
mod error;
mod params;
pub mod reconcile;
pub mod request_gate;
pub mod restore;

pub use dump_manager::{Collaborators, DumpManager};
pub use error::DumpError;
pub use params::{
    CreateParams, ParamValue, CREATE_DUMP_MAX_PARAMS, ORIGINATOR_ID_PARAM, ORIGINATOR_TYPE_PARAM,
};
pub use reconcile::{apply_notification, NotifyOutcome};
pub use restore::{RestoreReport, SkippedRecord};
