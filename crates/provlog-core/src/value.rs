//! Dynamic object model.
//!
//! Instrumented libraries are exposed to the import system as graphs of
//! named, attribute-bearing objects. Modules, classes, nested namespaces and
//! plain instances all share one representation (`ObjectRef`) so attribute
//! paths can be walked and rewritten without knowing concrete types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::CallError;

/// Any value reachable through attribute lookup or passed to a callable.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    List(Vec<Value>),
    Object(ObjectRef),
    Callable(Callable),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

// Objects and callables compare by identity, everything else by value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Path(p) => write!(f, "Path({p:?})"),
            Value::List(v) => f.debug_list().entries(v).finish(),
            Value::Object(o) => write!(f, "{o:?}"),
            Value::Callable(c) => write!(f, "{c:?}"),
        }
    }
}

/// Raw rendering, used when a value is logged as-is.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::List(v) => {
                f.write_str("[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(o) => write!(f, "<{} {}>", o.kind(), o.name()),
            Value::Callable(c) => write!(f, "<callable {}>", c.name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Module,
    Class,
    Namespace,
    Instance,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Module => "module",
            ObjectKind::Class => "class",
            ObjectKind::Namespace => "namespace",
            ObjectKind::Instance => "object",
        };
        f.write_str(s)
    }
}

struct Object {
    name: String,
    kind: ObjectKind,
    attrs: RwLock<BTreeMap<String, Value>>,
}

/// Shared handle to an attribute-bearing object.
///
/// Clones alias the same object; mutation through one handle is visible
/// through all of them.
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self(Arc::new(Object {
            name: name.into(),
            kind,
            attrs: RwLock::new(BTreeMap::new()),
        }))
    }

    pub fn module(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Module)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Class)
    }

    pub fn namespace(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Namespace)
    }

    pub fn instance(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Instance)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> ObjectKind {
        self.0.kind
    }

    /// Attribute lookup; the value is cloned out (objects stay shared).
    pub fn get(&self, attr: &str) -> Option<Value> {
        self.0
            .attrs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(attr)
            .cloned()
    }

    /// Assign an attribute, returning the previous value if any.
    pub fn set(&self, attr: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0
            .attrs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(attr.into(), value.into())
    }

    /// Builder-style `set`.
    pub fn with(self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attr, value);
        self
    }

    pub fn has(&self, attr: &str) -> bool {
        self.0
            .attrs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(attr)
    }

    pub fn remove(&self, attr: &str) -> Option<Value> {
        self.0
            .attrs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(attr)
    }

    pub fn attr_names(&self) -> Vec<String> {
        self.0
            .attrs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Look up a callable attribute and invoke it.
    pub fn call_method(&self, attr: &str, args: &CallArgs) -> Result<Value, CallError> {
        match self.get(attr) {
            Some(Value::Callable(c)) => c.call(args),
            Some(other) => Err(CallError::Failed(format!(
                "'{}.{attr}' is not callable ({other})",
                self.name()
            ))),
            None => Err(crate::error::MissingAttributeError::new(attr, attr).into()),
        }
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("name", &self.0.name)
            .field("kind", &self.0.kind)
            .field("attrs", &self.attr_names())
            .finish()
    }
}

/// Arguments of one call: positional values plus keyword values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, v: impl Into<Value>) -> Self {
        self.positional.push(v.into());
        self
    }

    pub fn kwarg(mut self, k: impl Into<String>, v: impl Into<Value>) -> Self {
        self.keywords.insert(k.into(), v.into());
        self
    }

    pub fn positional(&self, i: usize) -> Option<&Value> {
        self.positional.get(i)
    }

    pub fn keyword(&self, k: &str) -> Option<&Value> {
        self.keywords.get(k)
    }
}

type CallFn = dyn Fn(&CallArgs) -> Result<Value, CallError> + Send + Sync;

struct CallableInner {
    name: String,
    params: Vec<String>,
    f: Box<CallFn>,
}

/// A named, shareable function value.
///
/// `params` is the ordered parameter-name signature; it lets keyword
/// arguments be matched to a positional slot.
#[derive(Clone)]
pub struct Callable(Arc<CallableInner>);

impl Callable {
    pub fn new<F>(name: impl Into<String>, params: &[&str], f: F) -> Self
    where
        F: Fn(&CallArgs) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self(Arc::new(CallableInner {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            f: Box::new(f),
        }))
    }

    /// New callable carrying `original`'s name and signature.
    pub fn with_contract_of<F>(original: &Callable, f: F) -> Self
    where
        F: Fn(&CallArgs) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self(Arc::new(CallableInner {
            name: original.0.name.clone(),
            params: original.0.params.clone(),
            f: Box::new(f),
        }))
    }

    pub fn call(&self, args: &CallArgs) -> Result<Value, CallError> {
        (self.0.f)(args)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn params(&self) -> &[String] {
        &self.0.params
    }

    pub fn param_name(&self, position: usize) -> Option<&str> {
        self.0.params.get(position).map(|s| s.as_str())
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({}({}))", self.0.name, self.0.params.join(", "))
    }
}
