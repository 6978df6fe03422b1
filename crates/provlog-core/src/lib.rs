#![forbid(unsafe_code)]
//! provlog-core: shared types for the provenance layer.
//!
//! Contents:
//! - run identifiers and the persisted run record shape,
//! - content fingerprints (BLAKE3),
//! - `ProvConfig` (env / YAML),
//! - the dynamic object model (`Value`, `ObjectRef`, `Callable`) that stands in
//!   for runtime reflection,
//! - dotted attribute path lookup and rewrite over that model.
//!
//! No storage and no import machinery lives here.

pub mod attr;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod record;
pub mod value;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
