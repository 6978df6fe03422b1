//! Wrapper factories.
//!
//! A `Wrapper` turns an original callable into a proxy with the same name and
//! signature. On every call the proxy resolves the path argument, reports it
//! to the recorder, then delegates. The observation happens before the
//! delegate runs, so a read or write that subsequently fails is still logged.
//! The delegate's result (value or error) comes back unchanged.

use std::sync::Arc;

use provlog_core::record::Role;
use provlog_core::value::{CallArgs, Callable, Value};
use provlog_run::RunRecorder;

use crate::path::path_or_raw;
use crate::plan::{ArgRef, ConditionalRule};

pub type Wrapper = Arc<dyn Fn(&Callable) -> Callable + Send + Sync>;

/// Wrapper recording every call as `role`.
pub fn wrap_fixed(
    role: Role,
    arg: impl Into<ArgRef>,
    source_label: impl Into<String>,
    recorder: Arc<dyn RunRecorder>,
) -> Wrapper {
    let arg = arg.into();
    let label: Arc<str> = source_label.into().into();
    Arc::new(move |original: &Callable| {
        let inner = original.clone();
        let arg = arg.clone();
        let label = Arc::clone(&label);
        let recorder = Arc::clone(&recorder);
        Callable::with_contract_of(original, move |args| {
            match observed_path(&inner, args, &arg) {
                Some(path) => recorder.record(role, &path, &label),
                None => missing_argument(&inner, &arg),
            }
            inner.call(args)
        })
    })
}

/// Wrapper deciding the role per call from `rule.keyword`.
///
/// The discriminator's value (or `rule.default` when omitted) is checked against
/// both value sets; membership in both records an input and an output,
/// membership in neither records nothing.
pub fn wrap_conditional(
    arg: impl Into<ArgRef>,
    rule: ConditionalRule,
    source_label: impl Into<String>,
    recorder: Arc<dyn RunRecorder>,
) -> Wrapper {
    let arg = arg.into();
    let rule = Arc::new(rule);
    let label: Arc<str> = source_label.into().into();
    Arc::new(move |original: &Callable| {
        let inner = original.clone();
        let arg = arg.clone();
        let rule = Arc::clone(&rule);
        let label = Arc::clone(&label);
        let recorder = Arc::clone(&recorder);
        Callable::with_contract_of(original, move |args| {
            let discriminator = match discriminator_arg(&inner, args, &rule) {
                Some(v) => discriminator_text(v),
                None => rule.default.clone(),
            };
            let roles = rule.classify(&discriminator);
            if !roles.is_empty() {
                match observed_path(&inner, args, &arg) {
                    Some(path) => {
                        for role in roles {
                            recorder.record(role, &path, &label);
                        }
                    }
                    None => missing_argument(&inner, &arg),
                }
            }
            inner.call(args)
        })
    })
}

/// Positional slot first, then the keyword form of the same parameter.
fn argument<'a>(original: &Callable, args: &'a CallArgs, arg: &ArgRef) -> Option<&'a Value> {
    if let Some(v) = args.positional(arg.position) {
        return Some(v);
    }
    let name = arg
        .keyword
        .as_deref()
        .or_else(|| original.param_name(arg.position))?;
    args.keyword(name)
}

/// Keyword form first, then the positional slot: the rule's own, else the
/// one the signature gives the keyword.
fn discriminator_arg<'a>(
    original: &Callable,
    args: &'a CallArgs,
    rule: &ConditionalRule,
) -> Option<&'a Value> {
    if let Some(v) = args.keyword(&rule.keyword) {
        return Some(v);
    }
    let position = rule
        .position
        .or_else(|| original.params().iter().position(|p| *p == rule.keyword))?;
    args.positional(position)
}

fn observed_path(original: &Callable, args: &CallArgs, arg: &ArgRef) -> Option<String> {
    argument(original, args, arg).map(path_or_raw)
}

fn missing_argument(original: &Callable, arg: &ArgRef) {
    tracing::warn!(
        function = original.name(),
        position = arg.position,
        "path argument not supplied; call not recorded"
    );
}

fn discriminator_text(v: &Value) -> String {
    match v {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}
