#![forbid(unsafe_code)]
//! provlog-patch: turning a declarative patch plan into wrapped callables.
//!
//! - `path`: argument value → absolute path string (raw fallback).
//! - `wrap`: fixed-role and conditional-role wrapper factories.
//! - `plan`: patch plan entries and the per-module registry (YAML loadable).
//! - `apply`: rewrite a loaded module according to its entries.

pub mod apply;
pub mod error;
pub mod path;
pub mod plan;
pub mod wrap;

pub use apply::{apply_patch_plan, PatchFailure, PatchReport};
pub use error::PatchError;
pub use plan::{ArgRef, ConditionalRule, PatchEntry, PatchPlan, PatchPlanRegistry, PatchRole};
pub use wrap::{wrap_conditional, wrap_fixed, Wrapper};
