use thiserror::Error;

/// Errors from host collaborator calls
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Command timed out after {0}ms")]
    Timeout(u64),

    #[error("Unexpected output: {0}")]
    UnexpectedOutput(String),

    #[error("Host unavailable: {0}")]
    Unavailable(String),
}
