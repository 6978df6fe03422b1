//! Storage backends for the run log document.
//!
//! - `fs`: a JSON file on the local filesystem, guarded by an advisory
//!   exclusive lock on a sidecar `.lock` file (default).
//! - `memory`: in-process buffer for tests and dry runs (`memory://`).

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use provlog_core::config::ProvConfig;

use crate::error::{Error, Result};

/// Whole-document storage for the run log.
pub trait Storage: Send + Sync {
    /// Take exclusive access for one open/mutate/close cycle. Dropping the
    /// returned guard releases it.
    fn lock(&self) -> Result<StorageLock>;

    /// Current document bytes, or `None` if nothing has been written yet.
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the document.
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Human-readable location (path or URI) for diagnostics.
    fn location(&self) -> String;
}

/// Exclusive-access guard returned by `Storage::lock`.
#[must_use = "dropping the lock ends the exclusive section"]
pub struct StorageLock {
    file: Option<std::fs::File>,
}

impl StorageLock {
    /// A guard that holds nothing (backends without cross-process sharing).
    pub fn none() -> Self {
        Self { file: None }
    }

    pub(crate) fn file(file: std::fs::File) -> Self {
        Self { file: Some(file) }
    }
}

impl Drop for StorageLock {
    fn drop(&mut self) {
        if let Some(f) = self.file.take() {
            // Closing the descriptor releases the lock as well.
            let _ = fs2::FileExt::unlock(&f);
        }
    }
}

/// Build the correct storage backend using the provided configuration.
pub fn build_storage_from_config(cfg: &ProvConfig) -> Result<Box<dyn Storage>> {
    if cfg.is_memory() {
        return Ok(Box::new(MemoryStorage::new()));
    }
    match cfg.db_path.split_once("://") {
        Some(("file", rest)) => Ok(Box::new(FsStorage::new(rest))),
        Some((other, _)) => Err(Error::Config(format!("unsupported log scheme '{other}'"))),
        None if cfg.db_path.trim().is_empty() => Err(Error::Config("empty db_path".into())),
        None => Ok(Box::new(FsStorage::new(&cfg.db_path))),
    }
}
