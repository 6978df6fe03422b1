#![forbid(unsafe_code)]
//! provlog-import: module resolution with interception.
//!
//! `ImportSystem` is an explicit resolver chain plus a module cache. Resolvers
//! are asked in order whether they own a module name; the first that does
//! produces the module. `InterceptHook` is the resolver that loads the real
//! module through the rest of the chain, applies its patch plan once, and
//! serves the patched instance from then on.

pub mod error;
pub mod hook;
pub mod resolver;
pub mod source;

pub use error::ImportError;
pub use hook::{HookPhase, InterceptHook};
pub use resolver::{ImportSystem, ModuleLoader, ModuleResolver};
pub use source::{ModuleFactory, ModuleSource};
