//! Everything an instrumenting program usually needs.

pub use crate::error::{Error, Result};
pub use crate::install::Instrumentation;

pub use provlog_core::prelude::*;
pub use provlog_import::{HookPhase, ImportError, ImportSystem, InterceptHook, ModuleResolver, ModuleSource};
pub use provlog_patch::{
    apply_patch_plan, ArgRef, ConditionalRule, PatchEntry, PatchPlan, PatchPlanRegistry, PatchReport,
    PatchRole,
};
pub use provlog_run::{RunContext, RunGuard, RunMeta, RunRecorder};
pub use provlog_store::RunLogStore;
