//! Normalizing a call argument to the path that gets logged.

use std::path::{Component, Path, PathBuf};

use provlog_core::value::Value;

/// File handles and similar objects expose their path under this attribute.
pub const NAME_ATTR: &str = "name";

/// Absolute, lexically normalized path for `value`.
///
/// Strings and paths are used directly; objects are asked for their `name`
/// attribute. Anything else yields `None`.
pub fn normalize_path(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Str(s) => PathBuf::from(s),
        Value::Path(p) => p.clone(),
        Value::Object(o) => match o.get(NAME_ATTR)? {
            Value::Str(s) => PathBuf::from(s),
            Value::Path(p) => p,
            _ => return None,
        },
        _ => return None,
    };
    if raw.as_os_str().is_empty() {
        return None;
    }
    let abs = if raw.is_absolute() {
        raw
    } else {
        std::env::current_dir().ok()?.join(raw)
    };
    Some(lexical_clean(&abs).display().to_string())
}

/// What actually gets logged: the normalized path, or the raw value.
pub fn path_or_raw(value: &Value) -> String {
    normalize_path(value).unwrap_or_else(|| value.to_string())
}

fn lexical_clean(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in p.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
