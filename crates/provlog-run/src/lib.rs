#![forbid(unsafe_code)]
//! provlog-run: the active run and everything that writes to it.
//!
//! Wrappers only ever see the `RunRecorder` trait. `RunContext` is the
//! production implementation: it owns the active run id, serializes this
//! process's mutations of the log, and finalizes the record at exit or on an
//! uncaught panic.

pub mod context;
pub mod guard;
pub mod meta;
pub mod panic;

pub use context::{RunContext, RunError, RunRecorder};
pub use guard::RunGuard;
pub use meta::{NoVcs, RunMeta, VcsProbe};
pub use panic::install_panic_hook;
