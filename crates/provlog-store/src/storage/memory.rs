//! In-memory storage backend for testing.

use std::sync::{Arc, Mutex, PoisonError};

use super::{Storage, StorageLock};
use crate::error::Result;

/// Thread-safe in-memory document. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn lock(&self) -> Result<StorageLock> {
        Ok(StorageLock::none())
    }

    fn read(&self) -> Result<Option<Vec<u8>>> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(data.clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        *data = Some(bytes.to_vec());
        Ok(())
    }

    fn location(&self) -> String {
        provlog_core::config::MEMORY_DB.to_string()
    }
}
