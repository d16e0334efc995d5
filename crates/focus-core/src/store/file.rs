//! TOML file store with advisory locking and atomic replacement

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use fs2::FileExt;

use super::{RuleStore, Snapshot};
use crate::io::{lock_owner, run_blocking, with_suffix, write_atomic};
use crate::{Error, Result};

/// Snapshot store backed by a single TOML file
///
/// Reads take a shared lock; writes go to a temp file under an exclusive
/// lock, are synced, and then renamed over the target.
///
/// A claimed store also holds an exclusive lock on `<file>.lock` until it
/// is dropped, so a second core over the same file cannot start. Clones
/// start out unclaimed.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    owner: Mutex<Option<File>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner: Mutex::new(None),
        }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable snapshot is moved before starting empty
    pub fn corrupt_path(&self) -> PathBuf {
        with_suffix(&self.path, "corrupt")
    }

    /// Lock file held by the core that owns this snapshot
    pub fn lock_path(&self) -> PathBuf {
        with_suffix(&self.path, "lock")
    }

    /// Whether this store holds the ownership lock
    pub fn is_claimed(&self) -> bool {
        self.owner().is_some()
    }

    fn owner(&self) -> MutexGuard<'_, Option<File>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for FileStore {
    fn clone(&self) -> Self {
        Self::new(self.path.clone())
    }
}

#[async_trait]
impl RuleStore for FileStore {
    async fn load(&self) -> Result<Snapshot> {
        let path = self.path.clone();
        let corrupt = self.corrupt_path();
        run_blocking(&self.path, move || load_snapshot(&path, &corrupt)).await
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let content = toml::to_string_pretty(snapshot)?;
        let path = self.path.clone();
        run_blocking(&self.path, move || write_atomic(&path, content.as_bytes())).await
    }

    async fn claim(&self) -> Result<()> {
        if self.is_claimed() {
            return Ok(());
        }
        let lock_path = self.lock_path();
        let file = {
            let lock_path = lock_path.clone();
            run_blocking(&self.path, move || lock_owner(&lock_path)).await?
        };
        *self.owner() = Some(file);
        tracing::debug!(lock = %lock_path.display(), "Claimed persisted filters");
        Ok(())
    }
}

fn load_snapshot(path: &Path, corrupt: &Path) -> Result<Snapshot> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No snapshot on disk, starting empty");
            return Ok(Snapshot::default());
        }
        Err(e) => return Err(Error::io(path, e)),
    };
    file.lock_shared()
        .map_err(|_| Error::LockFailed { path: path.to_path_buf() })?;

    // Read through the locked handle
    let mut content = String::new();
    (&file)
        .read_to_string(&mut content)
        .map_err(|e| Error::io(path, e))?;
    drop(file);

    match toml::from_str::<Snapshot>(&content) {
        Ok(snapshot) => Ok(snapshot),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                moved_to = %corrupt.display(),
                error = %e,
                "Snapshot is unreadable, moving it aside and starting empty"
            );
            fs::rename(path, corrupt).map_err(|e| Error::io(path, e))?;
            Ok(Snapshot::default())
        }
    }
}
