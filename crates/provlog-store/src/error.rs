use provlog_core::id::RunId;
use thiserror::Error;

/// Result type local to provlog-store.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("log storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("log document error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("could not lock log '{path}': {reason}")]
    Lock { path: String, reason: String },

    #[error("no run with id {0}")]
    RunNotFound(RunId),

    #[error("a run with id {0} already exists")]
    DuplicateRun(RunId),

    #[error("field '{field}' is not a list")]
    NotAList { field: String },

    #[error("invalid store configuration: {0}")]
    Config(String),
}
