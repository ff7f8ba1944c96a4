use thiserror::Error;

/// Errors returned to callers of the dump manager.
///
/// `Unavailable`, `NotAllowed` and `InvalidArgument` are rejections of a
/// request; `InternalFailure` is a fault inside the manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DumpError {
    #[error("Another dump is in progress or available to offload")]
    Unavailable,

    #[error("Not allowed: {0}")]
    NotAllowed(String),

    #[error("Invalid argument {name}: {value}")]
    InvalidArgument { name: String, value: String },

    #[error("Internal failure: {0}")]
    InternalFailure(String),
}

impl DumpError {
    /// True when the request was refused rather than failed
    pub fn is_rejection(&self) -> bool {
        !matches!(self, DumpError::InternalFailure(_))
    }

    pub(crate) fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        DumpError::InternalFailure(format!("{}: {}", context, err))
    }
}
