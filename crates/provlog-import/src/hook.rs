//! Import interception.
//!
//! One hook per instrumented module name. Lifecycle:
//!
//! ```text
//! Unregistered -> Registered -> Intercepting -> Patched
//!                     ^              |
//!                     +--- failure --+
//! ```
//!
//! While `Intercepting`, an import of the same name from the intercepting
//! thread is passed through to the rest of the chain and yields the real,
//! unpatched module. Other threads wait for the outcome. Once `Patched`, the
//! same patched instance is returned for every later import.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use provlog_core::value::ObjectRef;
use provlog_patch::{apply_patch_plan, PatchEntry, PatchReport};
use provlog_run::RunRecorder;

use crate::error::ImportError;
use crate::resolver::{ModuleLoader, ModuleResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Unregistered,
    Registered,
    Intercepting,
    Patched,
}

enum State {
    Idle,
    Intercepting(ThreadId),
    Patched(ObjectRef),
}

pub struct InterceptHook {
    target: String,
    label: String,
    entries: Vec<PatchEntry>,
    recorder: Arc<dyn RunRecorder>,
    registered: AtomicBool,
    state: Mutex<State>,
    settled: Condvar,
    applied: AtomicUsize,
    last_report: Mutex<Option<PatchReport>>,
}

impl InterceptHook {
    pub fn new(
        target: impl Into<String>,
        entries: Vec<PatchEntry>,
        recorder: Arc<dyn RunRecorder>,
    ) -> Self {
        let target = target.into();
        Self {
            label: format!("intercept:{target}"),
            target,
            entries,
            recorder,
            registered: AtomicBool::new(false),
            state: Mutex::new(State::Idle),
            settled: Condvar::new(),
            applied: AtomicUsize::new(0),
            last_report: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn phase(&self) -> HookPhase {
        match &*self.lock_state() {
            State::Patched(_) => HookPhase::Patched,
            State::Intercepting(_) => HookPhase::Intercepting,
            State::Idle if self.registered.load(Ordering::Acquire) => HookPhase::Registered,
            State::Idle => HookPhase::Unregistered,
        }
    }

    /// How many times the patch plan has been applied. Never exceeds one.
    pub fn apply_count(&self) -> usize {
        self.applied.load(Ordering::Acquire)
    }

    pub fn patched_module(&self) -> Option<ObjectRef> {
        match &*self.lock_state() {
            State::Patched(m) => Some(m.clone()),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<PatchReport> {
        self.last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, next: State) {
        *self.lock_state() = next;
        self.settled.notify_all();
    }
}

struct ResetOnExit<'a> {
    hook: &'a InterceptHook,
    armed: bool,
}

impl ResetOnExit<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetOnExit<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.hook.settle(State::Idle);
        }
    }
}

impl ModuleResolver for InterceptHook {
    fn name(&self) -> &str {
        &self.label
    }

    fn can_handle(&self, module: &str) -> bool {
        module == self.target
    }

    fn load(&self, module: &str, next: &ModuleLoader<'_>) -> Result<ObjectRef, ImportError> {
        let me = thread::current().id();
        {
            let mut state = self.lock_state();
            loop {
                let owner = match &*state {
                    State::Patched(m) => return Ok(m.clone()),
                    State::Intercepting(owner) => Some(*owner),
                    State::Idle => None,
                };
                match owner {
                    Some(owner) if owner == me => {
                        drop(state);
                        tracing::trace!(module, "nested import while intercepting");
                        return next.load(module);
                    }
                    Some(_) => {
                        state = self
                            .settled
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    None => {
                        *state = State::Intercepting(me);
                        break;
                    }
                }
            }
        }

        // back to Idle on any early exit, unwinding included
        let reset = ResetOnExit { hook: self, armed: true };
        let real = match next.load(module) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(module, error = %e, "load failed; hook stays registered");
                return Err(e);
            }
        };

        let report = apply_patch_plan(&real, &self.entries, Arc::clone(&self.recorder));
        self.applied.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(
            module,
            patched = report.patched.len(),
            failed = report.failures.len(),
            "module instrumented"
        );
        *self
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(report);
        reset.disarm();
        self.settle(State::Patched(real.clone()));
        Ok(real)
    }

    fn is_patched(&self, module: &str) -> bool {
        module == self.target && self.phase() == HookPhase::Patched
    }

    fn on_registered(&self) {
        self.registered.store(true, Ordering::Release);
    }
}
