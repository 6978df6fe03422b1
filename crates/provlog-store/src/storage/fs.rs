use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::{Storage, StorageLock};
use crate::error::{Error, Result};

/// Local filesystem storage: one JSON document plus a sidecar lock file.
#[derive(Debug, Clone)]
pub struct FsStorage {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FsStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

impl Storage for FsStorage {
    fn lock(&self) -> Result<StorageLock> {
        self.ensure_parent()?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        // Blocks until any other writer finishes its cycle.
        file.lock_exclusive().map_err(|e| Error::Lock {
            path: self.lock_path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(StorageLock::file(file))
    }

    fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_parent()?;
        // Write-then-rename so readers never observe a torn document.
        let mut tmp_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        {
            use std::io::Write;
            let mut f = File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_before_write_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let s = FsStorage::new(dir.path().join("runs.json"));
        assert!(s.read().unwrap().is_none());
    }

    #[test]
    fn write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let s = FsStorage::new(dir.path().join("nested/deeper/runs.json"));
        {
            let _lock = s.lock().unwrap();
            s.write(b"{\"runs\":[]}").unwrap();
        }
        s.write(b"second").unwrap();
        assert_eq!(s.read().unwrap().unwrap(), b"second");
        assert!(dir.path().join("nested/deeper/runs.json.lock").exists());
        assert!(!dir.path().join("nested/deeper/runs.json.tmp").exists());
    }

    #[test]
    fn lock_is_reacquirable_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let s = FsStorage::new(dir.path().join("runs.json"));
        drop(s.lock().unwrap());
        drop(s.lock().unwrap());
    }
}
