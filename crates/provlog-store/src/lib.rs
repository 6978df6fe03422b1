#![forbid(unsafe_code)]
//! provlog-store: durable run log.
//!
//! Every mutation is one full cycle: lock + read the document, apply a single
//! change, write it back, unlock. No handle stays open between mutations, so
//! overlapping processes see each other's writes (last write wins) as long as
//! the backend provides exclusivity for the duration of a cycle.

pub mod error;
pub mod log;
pub mod storage;

pub use error::{Error, Result};
pub use log::{LogDocument, LogHandle, RunLogStore};
pub use storage::{build_storage_from_config, FsStorage, MemoryStorage, Storage, StorageLock};
