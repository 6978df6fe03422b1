#![forbid(unsafe_code)]
//! provlog: provenance tracking for instrumented modules.
//!
//! Wiring, in order: a `ProvConfig` opens the run log, a `RunContext` starts
//! the run, and one `InterceptHook` per planned module is prepended to the
//! `ImportSystem`. Importing a planned module then yields an instrumented
//! instance whose reads and writes land in the active run.
//!
//! ```no_run
//! use std::sync::Arc;
//! use provlog::prelude::*;
//!
//! # fn main() -> provlog::Result<()> {
//! let system = Arc::new(ImportSystem::new());
//! system.append_resolver(Arc::new(ModuleSource::new()));
//! let registry = PatchPlanRegistry::from_yaml_str("plans: []")?;
//! let inst = Instrumentation::install(
//!     ProvConfig::from_env(),
//!     &registry,
//!     system,
//!     RunMeta::capture(""),
//! )?;
//! inst.finish(None)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod install;
pub mod prelude;

pub use error::{Error, Result};
pub use install::Instrumentation;

pub use provlog_core as core;
pub use provlog_import as import;
pub use provlog_patch as patch;
pub use provlog_run as run;
pub use provlog_store as store;
