//! Run log store.
//!
//! The document is `{ "runs": [ { "unique_id": ..., ... }, ... ] }`. Records
//! are kept as JSON maps so a single field can be appended to or replaced
//! without round-tripping unknown keys written by other tools.
//!
//! Invariants:
//! - at most one record per `unique_id`;
//! - each convenience mutation (`insert_run`, `append`, `update_field`,
//!   `set_notes`) is exactly one open → mutate → close cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use provlog_core::config::ProvConfig;
use provlog_core::id::RunId;
use provlog_core::record::{Field, RunRecord};

use crate::error::{Error, Result};
use crate::storage::{build_storage_from_config, FsStorage, MemoryStorage, Storage, StorageLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogDocument {
    #[serde(default)]
    pub runs: Vec<Map<String, Json>>,
}

impl LogDocument {
    fn position(&self, id: RunId) -> Option<usize> {
        let key = id.to_string();
        self.runs.iter().position(|r| {
            r.get(Field::UniqueId.key()).and_then(Json::as_str) == Some(key.as_str())
        })
    }

    fn record_mut(&mut self, id: RunId) -> Result<&mut Map<String, Json>> {
        let idx = self.position(id).ok_or(Error::RunNotFound(id))?;
        Ok(&mut self.runs[idx])
    }
}

/// The durable store. Cheap to share behind an `Arc`; holds no open file.
pub struct RunLogStore {
    storage: Box<dyn Storage>,
}

impl RunLogStore {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    /// File-backed store at `path`; writes an empty document if none exists.
    pub fn open_or_create(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let store = Self::new(Box::new(FsStorage::new(path)));
        store.ensure_document()?;
        Ok(store)
    }

    /// Store selected by `cfg.db_path`.
    pub fn from_config(cfg: &ProvConfig) -> Result<Self> {
        let store = Self::new(build_storage_from_config(cfg)?);
        store.ensure_document()?;
        Ok(store)
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    pub fn location(&self) -> String {
        self.storage.location()
    }

    fn ensure_document(&self) -> Result<()> {
        let handle = self.open()?;
        if handle.fresh {
            self.close(handle)
        } else {
            handle.discard();
            Ok(())
        }
    }

    /// Lock the backend and load the current document.
    pub fn open(&self) -> Result<LogHandle<'_>> {
        let lock = self.storage.lock()?;
        let (doc, fresh) = match self.storage.read()? {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                (serde_json::from_slice(&bytes)?, false)
            }
            _ => (LogDocument::default(), true),
        };
        Ok(LogHandle {
            store: self,
            doc,
            fresh,
            _lock: lock,
        })
    }

    /// Persist the handle's document and release the lock.
    pub fn close(&self, handle: LogHandle<'_>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&handle.doc)?;
        self.storage.write(&bytes)?;
        tracing::trace!(
            location = %self.storage.location(),
            runs = handle.doc.runs.len(),
            "log closed"
        );
        Ok(())
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut LogHandle<'_>) -> Result<T>) -> Result<T> {
        let mut handle = self.open()?;
        let out = f(&mut handle)?;
        self.close(handle)?;
        Ok(out)
    }

    pub fn insert_run(&self, record: &RunRecord) -> Result<()> {
        self.mutate(|h| h.insert_run(record))
    }

    pub fn append<T: Serialize>(&self, id: RunId, field: Field, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.mutate(|h| h.append(id, field, value))
    }

    pub fn update_field<T: Serialize>(&self, id: RunId, field: Field, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.mutate(|h| h.update_field(id, field, value))
    }

    /// Post-hoc annotation hook for external tools.
    pub fn set_notes(&self, id: RunId, notes: &str) -> Result<()> {
        self.update_field(id, Field::Notes, &notes)
    }

    pub fn get_run(&self, id: RunId) -> Result<RunRecord> {
        self.open()?.get_run(id)
    }

    pub fn list_runs(&self) -> Result<Vec<RunRecord>> {
        self.open()?.runs()
    }

    /// The run with the most recent start date.
    pub fn latest_run(&self) -> Result<Option<RunRecord>> {
        let runs = self.list_runs()?;
        Ok(runs.into_iter().max_by_key(|r| r.date))
    }
}

/// An open log: exclusive access plus the loaded document.
///
/// Mutations are applied in memory; only `RunLogStore::close` writes them.
/// Dropping a handle without closing it releases the lock and discards them.
pub struct LogHandle<'s> {
    store: &'s RunLogStore,
    doc: LogDocument,
    fresh: bool,
    _lock: StorageLock,
}

impl LogHandle<'_> {
    pub fn document(&self) -> &LogDocument {
        &self.doc
    }

    /// Release the lock without writing.
    pub fn discard(self) {}

    /// Persist and release; same as `RunLogStore::close(handle)`.
    pub fn close(self) -> Result<()> {
        let store = self.store;
        store.close(self)
    }

    pub fn insert_run(&mut self, record: &RunRecord) -> Result<()> {
        if self.doc.position(record.unique_id).is_some() {
            return Err(Error::DuplicateRun(record.unique_id));
        }
        match serde_json::to_value(record)? {
            Json::Object(map) => {
                self.doc.runs.push(map);
                Ok(())
            }
            _ => Err(Error::Config("run record did not serialize to a map".into())),
        }
    }

    pub fn append(&mut self, id: RunId, field: Field, value: Json) -> Result<()> {
        let rec = self.doc.record_mut(id)?;
        let slot = rec
            .entry(field.key().to_string())
            .or_insert_with(|| Json::Array(Vec::new()));
        if slot.is_null() && field.is_list() {
            *slot = Json::Array(Vec::new());
        }
        match slot {
            Json::Array(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(Error::NotAList {
                field: field.key().to_string(),
            }),
        }
    }

    pub fn update_field(&mut self, id: RunId, field: Field, value: Json) -> Result<()> {
        let rec = self.doc.record_mut(id)?;
        rec.insert(field.key().to_string(), value);
        Ok(())
    }

    pub fn get_run(&self, id: RunId) -> Result<RunRecord> {
        let idx = self.doc.position(id).ok_or(Error::RunNotFound(id))?;
        Ok(serde_json::from_value(Json::Object(self.doc.runs[idx].clone()))?)
    }

    pub fn runs(&self) -> Result<Vec<RunRecord>> {
        self.doc
            .runs
            .iter()
            .map(|r| serde_json::from_value(Json::Object(r.clone())).map_err(Error::from))
            .collect()
    }
}
