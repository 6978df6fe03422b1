//! Applying a patch plan to a loaded module.
//!
//! Entries are independent: one that cannot be applied (typically an
//! attribute that does not exist in this version of the library) is reported
//! as a warning and the rest are still patched.

use std::sync::Arc;

use provlog_core::attr::{backup_attr_name, get_attr_path, set_attr_path};
use provlog_core::record::Role;
use provlog_core::value::{ObjectRef, Value};
use provlog_run::RunRecorder;

use crate::error::PatchError;
use crate::plan::{PatchEntry, PatchRole};
use crate::wrap::{wrap_conditional, wrap_fixed, Wrapper};

#[derive(Debug, Clone, PartialEq)]
pub struct PatchFailure {
    pub path: String,
    pub error: PatchError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchReport {
    pub module: String,
    /// Paths now wrapped, in plan order.
    pub patched: Vec<String>,
    pub failures: Vec<PatchFailure>,
}

impl PatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Wrap every entry's callable on `module` in place.
///
/// For each entry the original is first stored under
/// `backup_attr_name(path)` on the module root, then replaced.
pub fn apply_patch_plan(
    module: &ObjectRef,
    entries: &[PatchEntry],
    recorder: Arc<dyn RunRecorder>,
) -> PatchReport {
    let mut report = PatchReport {
        module: module.name().to_string(),
        ..PatchReport::default()
    };

    for entry in entries {
        match patch_one(module, entry, Arc::clone(&recorder)) {
            Ok(()) => {
                tracing::debug!(module = module.name(), path = %entry.path, "patched");
                report.patched.push(entry.path.clone());
            }
            Err(error) => {
                let message = format!(
                    "could not patch '{}.{}': {error}",
                    module.name(),
                    entry.path
                );
                tracing::warn!(
                    module = module.name(),
                    path = %entry.path,
                    %error,
                    "un-patchable function"
                );
                recorder.record_warning(&message, error.category(), Some(entry.source_label.as_str()));
                report.failures.push(PatchFailure {
                    path: entry.path.clone(),
                    error,
                });
            }
        }
    }
    report
}

fn wrapper_for(entry: &PatchEntry, recorder: Arc<dyn RunRecorder>) -> Wrapper {
    let label = entry.source_label.clone();
    match &entry.role {
        PatchRole::Input => wrap_fixed(Role::Input, entry.arg.clone(), label, recorder),
        PatchRole::Output => wrap_fixed(Role::Output, entry.arg.clone(), label, recorder),
        PatchRole::Conditional(rule) => {
            wrap_conditional(entry.arg.clone(), rule.clone(), label, recorder)
        }
    }
}

fn patch_one(
    module: &ObjectRef,
    entry: &PatchEntry,
    recorder: Arc<dyn RunRecorder>,
) -> Result<(), PatchError> {
    let original = match get_attr_path(module, &entry.path)? {
        Value::Callable(c) => c,
        _ => {
            return Err(PatchError::NotCallable {
                path: entry.path.clone(),
            })
        }
    };
    let wrapped = wrapper_for(entry, recorder)(&original);
    module.set(backup_attr_name(&entry.path), original);
    set_attr_path(module, &entry.path, wrapped)?;
    Ok(())
}
