use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// A dotted attribute path could not be resolved.
///
/// `segment` is the first segment that failed; `path` is the full path as
/// requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing attribute '{segment}' while resolving '{path}'")]
pub struct MissingAttributeError {
    pub segment: String,
    pub path: String,
}

impl MissingAttributeError {
    pub fn new(segment: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            path: path.into(),
        }
    }
}

/// Error returned by a dynamic `Callable`.
///
/// Wrappers never produce or rewrite these; whatever the original callable
/// returns is handed back to the caller untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error("call failed: {0}")]
    Failed(String),

    #[error("bad argument '{name}': {reason}")]
    BadArgument { name: String, reason: String },

    #[error(transparent)]
    MissingAttribute(#[from] MissingAttributeError),
}

impl From<std::io::Error> for CallError {
    fn from(e: std::io::Error) -> Self {
        CallError::Failed(e.to_string())
    }
}
