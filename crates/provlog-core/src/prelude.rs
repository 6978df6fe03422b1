//! Convenient re-exports for downstream crates.

pub use crate::attr::{backup_attr_name, get_attr_path, set_attr_path};
pub use crate::config::ProvConfig;
pub use crate::error::{CallError, Error, MissingAttributeError, Result};
pub use crate::id::RunId;
pub use crate::record::{ExceptionInfo, Field, FileRef, Role, RunRecord, VcsInfo, WarningRecord};
pub use crate::value::{CallArgs, Callable, ObjectKind, ObjectRef, Value};
