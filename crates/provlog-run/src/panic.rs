//! Uncaught-failure capture.
//!
//! The hook runs for every panic, including ones a library later recovers
//! from with `catch_unwind`, so it only stages the report on the context and
//! then hands the panic to whatever hook was installed before. The run is
//! finalized with that report only if the panic unwinds through the
//! `RunGuard` (see `guard.rs`). Under `panic = "abort"` no guard runs and the
//! run is left without `exit_date`.

use std::any::Any;
use std::backtrace::Backtrace;
use std::sync::Arc;

use provlog_core::record::ExceptionInfo;

use crate::context::RunContext;

pub fn install_panic_hook(ctx: Arc<RunContext>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let exception = ExceptionInfo {
            kind: "panic".to_string(),
            message: payload_message(info.payload()),
            traceback: format!("at {location}\n{}", Backtrace::force_capture()),
        };
        ctx.stage_exception(exception);
        previous(info);
    }));
}

pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_messages() {
        let a: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(payload_message(a.as_ref()), "static");
        let b: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(payload_message(b.as_ref()), "owned");
        let c: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(payload_message(c.as_ref()), "Box<dyn Any>");
    }
}
