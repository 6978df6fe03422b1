//! Process-wide run state.
//!
//! Concurrency: every log mutation from this process goes through `mutation`,
//! so observation callbacks on different threads cannot lose each other's
//! appends. Separate processes rely on the store backend's lock.
//!
//! Lifecycle: `Idle -> Active(id) -> Finished(id)`. A finished run is frozen;
//! observations arriving after `finish_run` are rejected until the next
//! `start_run`.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use once_cell::sync::OnceCell;
use thiserror::Error;

use provlog_core::config::ProvConfig;
use provlog_core::hash::fingerprint_file;
use provlog_core::id::RunId;
use provlog_core::record::{ExceptionInfo, Field, FileRef, Role, WarningRecord};
use provlog_store::RunLogStore;

use crate::meta::{NoVcs, RunMeta, VcsProbe};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("run log: {0}")]
    Store(#[from] provlog_store::Error),

    #[error("no active run")]
    NoActiveRun,

    #[error("run {0} is already finished")]
    RunFinished(RunId),

    #[error("a global run context is already installed")]
    AlreadyInstalled,
}

/// Observation sink used by wrappers.
///
/// Implementations must not fail the caller: errors are logged and dropped.
pub trait RunRecorder: Send + Sync {
    fn record_input(&self, path: &str, source: &str);
    fn record_output(&self, path: &str, source: &str);
    fn record_warning(&self, message: &str, category: &str, source: Option<&str>);

    fn record(&self, role: Role, path: &str, source: &str) {
        match role {
            Role::Input => self.record_input(path, source),
            Role::Output => self.record_output(path, source),
        }
    }
}

static GLOBAL: OnceCell<Arc<RunContext>> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Active(RunId),
    Finished(RunId),
}

pub struct RunContext {
    store: Arc<RunLogStore>,
    config: ProvConfig,
    vcs: Box<dyn VcsProbe>,
    phase: RwLock<Phase>,
    staged: Mutex<Option<ExceptionInfo>>,
    mutation: Mutex<()>,
}

impl RunContext {
    pub fn new(store: Arc<RunLogStore>, config: ProvConfig) -> Self {
        Self {
            store,
            config,
            vcs: Box::new(NoVcs),
            phase: RwLock::new(Phase::Idle),
            staged: Mutex::new(None),
            mutation: Mutex::new(()),
        }
    }

    /// Open the store named by `config` and build a context around it.
    pub fn from_config(config: ProvConfig) -> Result<Self, RunError> {
        let store = RunLogStore::from_config(&config)?;
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn with_vcs(mut self, probe: impl VcsProbe + 'static) -> Self {
        self.vcs = Box::new(probe);
        self
    }

    pub fn store(&self) -> &RunLogStore {
        &self.store
    }

    pub fn config(&self) -> &ProvConfig {
        &self.config
    }

    /// Make `ctx` the process default. Only the first call succeeds.
    pub fn install_global(ctx: Arc<RunContext>) -> Result<(), RunError> {
        GLOBAL.set(ctx).map_err(|_| RunError::AlreadyInstalled)
    }

    pub fn global() -> Option<Arc<RunContext>> {
        GLOBAL.get().cloned()
    }

    /// Create a new run record and make it the active run.
    ///
    /// Calling this again (notebook-style re-initialization) finalizes the
    /// previous run first, then switches to the new one.
    pub fn start_run(&self, meta: RunMeta) -> Result<RunId, RunError> {
        if self.active_run_id().is_some() {
            self.finish_run(None)?;
        }

        let id = RunId::new();
        let script = meta.script.clone();
        let mut record = meta.into_record(id);
        if !self.config.ignored_metadata.git {
            if let Some(mut vcs) = self.vcs.probe(Path::new(&script)) {
                if self.config.ignored_metadata.diff {
                    vcs.diff = None;
                }
                record = record.with_vcs(vcs);
            }
        }

        {
            let _g = self.lock_mutations();
            self.store.insert_run(&record)?;
            self.set_phase(Phase::Active(id));
        }
        self.take_staged_exception();
        tracing::debug!(run = %id, script = %script, "run started");
        Ok(id)
    }

    /// The run observations currently go to. `None` before the first run
    /// and after it has been finished.
    pub fn active_run_id(&self) -> Option<RunId> {
        match self.phase() {
            Phase::Active(id) => Some(id),
            Phase::Idle | Phase::Finished(_) => None,
        }
    }

    pub fn require_active(&self) -> Result<RunId, RunError> {
        match self.phase() {
            Phase::Active(id) => Ok(id),
            Phase::Finished(id) => Err(RunError::RunFinished(id)),
            Phase::Idle => Err(RunError::NoActiveRun),
        }
    }

    /// Hold a panic report until the owner decides whether it ended the run.
    /// A later panic replaces an earlier one.
    pub fn stage_exception(&self, exception: ExceptionInfo) {
        *self.staged.lock().unwrap_or_else(PoisonError::into_inner) = Some(exception);
    }

    pub fn take_staged_exception(&self) -> Option<ExceptionInfo> {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Append one file observation to the active run.
    ///
    /// Returns the stored entry, or `None` when the source module's category is
    /// ignored by configuration.
    pub fn try_record(
        &self,
        role: Role,
        path: &str,
        source: &str,
    ) -> Result<Option<FileRef>, RunError> {
        if self.config.is_ignored(role, source) {
            return Ok(None);
        }
        self.require_active()?;
        let fingerprint = if self.config.hashes(role) {
            fingerprint_file(Path::new(path))
        } else {
            None
        };
        let entry = FileRef::new(path, fingerprint);
        let id = {
            let _g = self.lock_mutations();
            // re-checked under the lock; a concurrent finish wins
            let id = self.require_active()?;
            self.store.append(id, role.field(), &entry)?;
            id
        };
        if self.config.debug {
            tracing::info!(run = %id, %role, path, source, "recorded");
        } else {
            tracing::trace!(run = %id, %role, path, source, "recorded");
        }
        Ok(Some(entry))
    }

    pub fn add_warning(&self, warning: &WarningRecord) -> Result<(), RunError> {
        let _g = self.lock_mutations();
        let id = self.require_active()?;
        self.store.append(id, Field::Warnings, warning)?;
        Ok(())
    }

    /// Stamp `exit_date` (and `exception`, if given) on the active run and
    /// retire it.
    ///
    /// Happens once per run; returns `Ok(false)` if the run was already
    /// finished or there is no active run.
    pub fn finish_run(&self, exception: Option<ExceptionInfo>) -> Result<bool, RunError> {
        let _g = self.lock_mutations();
        let Phase::Active(id) = self.phase() else {
            return Ok(false);
        };
        let mut handle = self.store.open()?;
        if handle.get_run(id)?.is_finished() {
            handle.discard();
            self.set_phase(Phase::Finished(id));
            return Ok(false);
        }
        let exit = serde_json::to_value(Utc::now()).map_err(provlog_store::Error::from)?;
        handle.update_field(id, Field::ExitDate, exit)?;
        if let Some(exc) = &exception {
            let exc = serde_json::to_value(exc).map_err(provlog_store::Error::from)?;
            handle.update_field(id, Field::Exception, exc)?;
        }
        handle.close()?;
        self.set_phase(Phase::Finished(id));
        if !self.config.quiet {
            tracing::info!(run = %id, location = %self.store.location(), "run recorded");
        }
        Ok(true)
    }

    fn phase(&self) -> Phase {
        *self.phase.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.write().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn lock_mutations(&self) -> std::sync::MutexGuard<'_, ()> {
        self.mutation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RunRecorder for RunContext {
    fn record_input(&self, path: &str, source: &str) {
        if let Err(e) = self.try_record(Role::Input, path, source) {
            tracing::warn!(error = %e, path, source, "failed to record input");
        }
    }

    fn record_output(&self, path: &str, source: &str) {
        if let Err(e) = self.try_record(Role::Output, path, source) {
            tracing::warn!(error = %e, path, source, "failed to record output");
        }
    }

    fn record_warning(&self, message: &str, category: &str, source: Option<&str>) {
        let warning = WarningRecord {
            message: message.to_string(),
            category: category.to_string(),
            source: source.map(str::to_string),
        };
        if let Err(e) = self.add_warning(&warning) {
            tracing::warn!(error = %e, message, "failed to record warning");
        }
    }
}
