//! Dotted attribute paths over the dynamic object model.
//!
//! `get_attr_path(root, "Model.load_weights")` performs repeated attribute
//! lookup; `set_attr_path` walks all but the last segment and assigns on the
//! final intermediate object. Any segment before the last must resolve to an
//! object: a missing segment (or one that resolves to a non-object) fails with
//! `MissingAttributeError` naming that segment.

use crate::error::MissingAttributeError;
use crate::value::{ObjectRef, Value};

/// Prefix of the attribute under which a patched original is kept.
pub const BACKUP_PREFIX: &str = "_orig_";

/// Resolve `path` starting at `root`.
pub fn get_attr_path(root: &ObjectRef, path: &str) -> Result<Value, MissingAttributeError> {
    let (parent, last) = walk_parent(root, path)?;
    parent
        .get(last)
        .ok_or_else(|| MissingAttributeError::new(last, path))
}

/// Assign `value` at `path`, returning the value it replaced (if any).
pub fn set_attr_path(
    root: &ObjectRef,
    path: &str,
    value: impl Into<Value>,
) -> Result<Option<Value>, MissingAttributeError> {
    let (parent, last) = walk_parent(root, path)?;
    Ok(parent.set(last, value))
}

/// Name of the root-level attribute holding the pre-patch value of `path`.
pub fn backup_attr_name(path: &str) -> String {
    format!("{BACKUP_PREFIX}{}", path.replace('.', "_"))
}

/// Split off the last segment and resolve everything before it.
fn walk_parent<'p>(
    root: &ObjectRef,
    path: &'p str,
) -> Result<(ObjectRef, &'p str), MissingAttributeError> {
    let segments: Vec<&str> = path.split('.').collect();
    if let Some(empty) = segments.iter().find(|s| s.is_empty()) {
        return Err(MissingAttributeError::new(*empty, path));
    }
    let (last, init) = match segments.split_last() {
        Some(parts) => parts,
        None => return Err(MissingAttributeError::new("", path)),
    };

    let mut cur = root.clone();
    for seg in init {
        cur = match cur.get(seg) {
            Some(Value::Object(next)) => next,
            _ => return Err(MissingAttributeError::new(*seg, path)),
        };
    }
    Ok((cur, *last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{CallArgs, Callable};

    fn fake_module() -> ObjectRef {
        let f = Callable::new("save", &["self", "path"], |_| Ok(Value::None));
        let model = ObjectRef::class("Model").with("save", f);
        let io = ObjectRef::namespace("io").with("formats", ObjectRef::namespace("formats"));
        ObjectRef::module("lib")
            .with("Model", model)
            .with("io", io)
            .with("version", "1.0")
    }

    #[test]
    fn get_walks_nested_objects() {
        let m = fake_module();
        assert!(get_attr_path(&m, "Model.save").unwrap().as_callable().is_some());
        assert!(get_attr_path(&m, "io.formats").unwrap().as_object().is_some());
        assert_eq!(get_attr_path(&m, "version").unwrap(), Value::from("1.0"));
    }

    #[test]
    fn missing_segment_is_named() {
        let m = fake_module();
        let err = get_attr_path(&m, "io.missing.read").unwrap_err();
        assert_eq!(err.segment, "missing");
        assert_eq!(err.path, "io.missing.read");

        let err = get_attr_path(&m, "Model.load").unwrap_err();
        assert_eq!(err.segment, "load");
    }

    #[test]
    fn non_object_intermediate_fails() {
        let m = fake_module();
        let err = get_attr_path(&m, "version.upper").unwrap_err();
        assert_eq!(err.segment, "version");
        let err = set_attr_path(&m, "Model.save.inner", Value::None).unwrap_err();
        assert_eq!(err.segment, "save");
    }

    #[test]
    fn empty_paths_are_rejected() {
        let m = fake_module();
        assert!(get_attr_path(&m, "").is_err());
        assert!(get_attr_path(&m, "io..formats").is_err());
        assert!(set_attr_path(&m, "Model.", 1i64).is_err());
    }

    #[test]
    fn set_then_get_round_trips_on_class_method() {
        let m = fake_module();
        let replacement = Callable::new("save", &["self", "path"], |_| Ok(Value::Int(7)));
        let old = set_attr_path(&m, "Model.save", replacement.clone()).unwrap();
        assert!(old.is_some());
        let got = get_attr_path(&m, "Model.save").unwrap();
        assert_eq!(got, Value::Callable(replacement));
        assert_eq!(
            got.as_callable().unwrap().call(&CallArgs::new()).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn backup_names_flatten_dots() {
        assert_eq!(backup_attr_name("Model.save"), "_orig_Model_save");
        assert_eq!(backup_attr_name("load"), "_orig_load");
    }
}
