//! learnkeep-store — Durable JSON document store.
//!
//! Each named document under the data root is loaded and saved as a whole,
//! serialized per path through a [`LockRegistry`], written with an
//! [`AtomicWriter`], and snapshotted by a [`BackupManager`] before every
//! overwrite. Unreadable documents are quarantined and reset to a default on
//! load instead of failing the caller.

pub mod atomic;
pub mod backup;
pub mod error;
pub mod lock;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use atomic::{write_atomic, AtomicWriter};
pub use backup::{BackupManager, RestoreReport, SnapshotInfo, DEFAULT_RETENTION};
pub use error::{StoreError, StoreResult};
pub use lock::{LockRegistry, PathLock};

/// How a document came to be returned by [`DocumentStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file existed and parsed.
    Existing,
    /// The file was missing and the default was written.
    Bootstrapped,
    /// The file was empty or unparseable; it was quarantined (when the copy
    /// succeeded) and reset to the default.
    Recovered { quarantined_to: Option<PathBuf> },
    /// The file could not be read at all; the default was returned and
    /// nothing was written.
    Fallback,
}

/// A loaded document and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub outcome: LoadOutcome,
}

impl<T> Loaded<T> {
    /// The document was corrupt and has been reset to the default.
    pub fn recovered_from_corruption(&self) -> bool {
        matches!(self.outcome, LoadOutcome::Recovered { .. })
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Typed load/save of whole JSON documents under one data root.
///
/// Cloning is cheap and clones share locks and backup bookkeeping.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    data_root: PathBuf,
    locks: Arc<LockRegistry>,
    backups: Arc<BackupManager>,
    writer: AtomicWriter,
}

impl DocumentStore {
    /// Open a store rooted at `data_root`, creating the directory if needed.
    pub fn open(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        if let Err(e) = fs::create_dir_all(&data_root) {
            tracing::warn!(path = %data_root.display(), "failed to create data root: {e}");
        }
        let backups = BackupManager::new(&data_root);
        Self {
            data_root: backups.data_root().to_path_buf(),
            locks: Arc::new(LockRegistry::new()),
            backups: Arc::new(backups),
            writer: AtomicWriter::default(),
        }
    }

    /// Keep at most `retention` snapshots.
    pub fn with_retention(mut self, retention: usize) -> Self {
        let backups = BackupManager::new(&self.data_root).with_retention(retention);
        self.backups = Arc::new(backups);
        self
    }

    /// Share an existing lock registry.
    pub fn with_locks(mut self, locks: Arc<LockRegistry>) -> Self {
        self.locks = locks;
        self
    }

    /// Replace the atomic writer.
    pub fn with_writer(mut self, writer: AtomicWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Path of the named document under the data root.
    pub fn path(&self, name: &str) -> PathBuf {
        self.data_root.join(name)
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// The lock serializing access to `path`.
    pub fn lock(&self, path: &Path) -> PathLock {
        self.locks.lock_for(path)
    }

    fn ensure_tracked(&self, path: &Path) -> StoreResult<()> {
        match self.backups.tracked_relative(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::OutsideDataRoot(path.to_path_buf())),
        }
    }

    fn write_value<T: Serialize>(&self, path: &Path, value: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(path, e))?;
        self.writer
            .write(path, &bytes)
            .map_err(|e| StoreError::io(path, e))
    }

    /// Load the document at `path`.
    ///
    /// A missing file is bootstrapped with `default`. An empty or unparseable
    /// file is quarantined, reset to `default`, and reported as
    /// [`LoadOutcome::Recovered`]. Read and write failures are returned.
    pub fn try_load<T>(&self, path: &Path, default: T) -> StoreResult<Loaded<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.ensure_tracked(path)?;
        let lock = self.lock(path);
        let _guard = lock.lock();

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.write_value(path, &default)?;
                tracing::info!(path = %path.display(), "bootstrapped missing document");
                return Ok(Loaded {
                    value: default,
                    outcome: LoadOutcome::Bootstrapped,
                });
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
            Err("document is empty".to_string())
        } else {
            serde_json::from_slice::<T>(&bytes).map_err(|e| e.to_string())
        };

        match parsed {
            Ok(value) => Ok(Loaded {
                value,
                outcome: LoadOutcome::Existing,
            }),
            Err(reason) => {
                tracing::warn!(path = %path.display(), %reason, "document unreadable, resetting");
                let quarantined_to = match self.backups.quarantine(path) {
                    Ok(dest) => Some(dest),
                    Err(e) => {
                        tracing::error!(path = %path.display(), "quarantine failed: {e}");
                        None
                    }
                };
                self.write_value(path, &default)?;
                Ok(Loaded {
                    value: default,
                    outcome: LoadOutcome::Recovered { quarantined_to },
                })
            }
        }
    }

    /// Load the document at `path`, never failing.
    ///
    /// Errors from [`DocumentStore::try_load`] are logged and `default` is
    /// returned as [`LoadOutcome::Fallback`].
    pub fn load<T>(&self, path: &Path, default: T) -> Loaded<T>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        match self.try_load(path, default.clone()) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(path = %path.display(), "load failed, using default: {e}");
                Loaded {
                    value: default,
                    outcome: LoadOutcome::Fallback,
                }
            }
        }
    }

    /// Replace the document at `path` with `value`, snapshotting the previous
    /// content first.
    ///
    /// Nothing is written when the existing file cannot be snapshotted.
    pub fn try_save<T: Serialize>(&self, path: &Path, value: &T) -> StoreResult<()> {
        self.ensure_tracked(path)?;
        let lock = self.lock(path);
        let _guard = lock.lock();

        if let Err(e) = self.backups.backup_if_exists(path) {
            tracing::error!(path = %path.display(), "backup before save failed, not saving: {e}");
            return Err(e);
        }
        self.write_value(path, value)?;
        tracing::debug!(path = %path.display(), "saved document");
        Ok(())
    }

    /// Replace the document at `path`, logging instead of failing.
    ///
    /// Returns whether the save reached disk.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> bool {
        match self.try_save(path, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(path = %path.display(), "save failed: {e}");
                false
            }
        }
    }

    /// All snapshots, oldest first.
    pub fn list_snapshots(&self) -> StoreResult<Vec<SnapshotInfo>> {
        self.backups.list_snapshots()
    }

    /// Snapshot every existing file of `paths` into one new snapshot.
    pub fn snapshot_all(&self, paths: &[PathBuf]) -> StoreResult<Option<SnapshotInfo>> {
        let locks: Vec<PathLock> = paths.iter().map(|p| self.lock(p)).collect();
        let _guards: Vec<_> = locks.iter().map(|l| l.lock()).collect();
        self.backups.snapshot_all(paths)
    }

    /// Copy every file of snapshot `name` back into the data root.
    ///
    /// Each file is written under its own lock, after snapshotting the
    /// current content. Files not in the snapshot are left alone. Failures are
    /// reported in the result rather than returned as errors.
    pub fn restore(&self, name: &str) -> RestoreReport {
        let files = match self.backups.read_snapshot(name) {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(snapshot = name, "restore failed: {e}");
                return RestoreReport::failed(format!("cannot read snapshot {name}: {e}"));
            }
        };
        if files.is_empty() {
            return RestoreReport::failed(format!("snapshot {name} contains no files"));
        }

        let total = files.len();
        let mut restored = 0usize;
        let mut failures = Vec::new();
        for (relative, bytes) in files {
            let target = self.data_root.join(&relative);
            let lock = self.lock(&target);
            let _guard = lock.lock();

            if let Err(e) = self.backups.backup_if_exists(&target) {
                tracing::error!(path = %target.display(), "backup before restore failed: {e}");
                failures.push(format!("{}: {e}", relative.display()));
                continue;
            }
            match self.writer.write(&target, &bytes) {
                Ok(()) => restored += 1,
                Err(e) => {
                    tracing::error!(path = %target.display(), "restore of file failed: {e}");
                    failures.push(format!("{}: {e}", relative.display()));
                }
            }
        }

        let ok = failures.is_empty();
        let message = if ok {
            format!("restored {restored} file(s) from {name}")
        } else {
            format!(
                "restored {restored} of {total} file(s) from {name}; {} failed",
                failures.len()
            )
        };
        tracing::info!(snapshot = name, restored, failed = failures.len(), "restore finished");
        RestoreReport {
            ok,
            files_restored: restored,
            message,
            failures,
        }
    }
}
