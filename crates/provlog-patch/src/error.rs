use provlog_core::error::MissingAttributeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    #[error(transparent)]
    MissingAttribute(#[from] MissingAttributeError),

    #[error("'{path}' is not callable")]
    NotCallable { path: String },

    #[error("invalid patch plan: {0}")]
    InvalidPlan(String),
}

impl PatchError {
    /// Class name surfaced in run warnings.
    pub fn category(&self) -> &'static str {
        match self {
            PatchError::MissingAttribute(_) => "MissingAttributeError",
            PatchError::NotCallable { .. } => "NotCallableError",
            PatchError::InvalidPlan(_) => "InvalidPlanError",
        }
    }
}

impl From<serde_yaml::Error> for PatchError {
    fn from(e: serde_yaml::Error) -> Self {
        PatchError::InvalidPlan(e.to_string())
    }
}
