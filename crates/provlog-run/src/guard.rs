use std::sync::Arc;

use provlog_core::record::ExceptionInfo;

use crate::context::{RunContext, RunError};

/// Finalizes the active run when dropped: normal exit of the scope that owns
/// the instrumented program, or a panic unwinding out of it. In the unwinding
/// case the exception staged by the panic hook is recorded; otherwise any
/// staged exception came from a panic that was caught, and is discarded.
pub struct RunGuard {
    ctx: Option<Arc<RunContext>>,
}

impl RunGuard {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self { ctx: Some(ctx) }
    }

    /// Finalize now, reporting errors instead of logging them.
    pub fn finish(mut self, exception: Option<ExceptionInfo>) -> Result<bool, RunError> {
        match self.ctx.take() {
            Some(ctx) => ctx.finish_run(exception),
            None => Ok(false),
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            let staged = ctx.take_staged_exception();
            let exception = if std::thread::panicking() { staged } else { None };
            if let Err(e) = ctx.finish_run(exception) {
                tracing::warn!(error = %e, "failed to finalize run");
            }
        }
    }
}
