//! One-call setup of the instrumentation layer.

use std::sync::Arc;

use provlog_core::config::ProvConfig;
use provlog_core::id::RunId;
use provlog_core::record::ExceptionInfo;
use provlog_core::value::ObjectRef;
use provlog_import::{ImportSystem, InterceptHook};
use provlog_patch::PatchPlanRegistry;
use provlog_run::{install_panic_hook, RunContext, RunGuard, RunMeta, RunRecorder};

use crate::error::Result;

/// Live instrumentation: the run context, the import system it hooked and
/// the guard that finalizes the run when this value is dropped.
pub struct Instrumentation {
    context: Arc<RunContext>,
    system: Arc<ImportSystem>,
    hooks: Vec<Arc<InterceptHook>>,
    run_id: RunId,
    guard: Option<RunGuard>,
}

impl Instrumentation {
    /// Open the log named by `config`, start a run described by `meta` and
    /// hook every module `registry` has a plan for.
    pub fn install(
        config: ProvConfig,
        registry: &PatchPlanRegistry,
        system: Arc<ImportSystem>,
        meta: RunMeta,
    ) -> Result<Self> {
        let context = Arc::new(RunContext::from_config(config)?);
        Self::with_context(context, registry, system, meta)
    }

    /// As `install`, with a caller-built context (custom store or VCS probe).
    pub fn with_context(
        context: Arc<RunContext>,
        registry: &PatchPlanRegistry,
        system: Arc<ImportSystem>,
        meta: RunMeta,
    ) -> Result<Self> {
        let run_id = context.start_run(meta)?;

        let recorder: Arc<dyn RunRecorder> = context.clone();
        let mut hooks = Vec::with_capacity(registry.len());
        for module in registry.modules() {
            let entries = registry.effective_entries(module, context.config());
            let hook = Arc::new(InterceptHook::new(module, entries, Arc::clone(&recorder)));
            system.prepend_resolver(hook.clone());
            hooks.push(hook);
        }
        tracing::debug!(run = %run_id, hooks = hooks.len(), "instrumentation installed");

        Ok(Self {
            guard: Some(RunGuard::new(context.clone())),
            context,
            system,
            hooks,
            run_id,
        })
    }

    /// Record a panic that unwinds out of the scope owning this handle.
    /// Panics recovered with `catch_unwind` leave the run untouched.
    pub fn capture_panics(self) -> Self {
        install_panic_hook(self.context.clone());
        self
    }

    pub fn context(&self) -> &Arc<RunContext> {
        &self.context
    }

    pub fn system(&self) -> &Arc<ImportSystem> {
        &self.system
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn hook(&self, module: &str) -> Option<&Arc<InterceptHook>> {
        self.hooks.iter().find(|h| h.target() == module)
    }

    pub fn import(&self, module: &str) -> Result<ObjectRef> {
        Ok(self.system.import(module)?)
    }

    /// Finalize the run now. Returns false if it was already finalized.
    pub fn finish(mut self, exception: Option<ExceptionInfo>) -> Result<bool> {
        match self.guard.take() {
            Some(guard) => Ok(guard.finish(exception)?),
            None => Ok(false),
        }
    }
}
