use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("no module named '{0}'")]
    ModuleNotFound(String),

    #[error("failed to load module '{name}': {reason}")]
    ModuleLoad { name: String, reason: String },
}

impl ImportError {
    pub fn load(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ImportError::ModuleLoad {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
