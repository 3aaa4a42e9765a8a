//! Per-path lock registry.
//!
//! Operations on the same logical file serialize on one reentrant lock while
//! unrelated files proceed independently. The registry is an ordinary value
//! owned by the document store, so tests can build isolated instances.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

/// Reentrant lock guarding one file.
pub type PathLock = Arc<ReentrantMutex<()>>;

/// Map from normalized absolute path to its lock.
///
/// Locks are created lazily and live as long as the registry. Acquisition
/// blocks without a timeout. Callers that ever need two file locks at once
/// must take them in a consistent order.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<PathBuf, PathLock>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `path`. Every spelling of the same file yields the same
    /// lock instance.
    pub fn lock_for(&self, path: &Path) -> PathLock {
        let key = normalize_path(path);
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key).or_default())
    }

    /// Number of distinct paths seen so far.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Make `path` absolute and resolve `.`/`..` lexically.
///
/// When the parent directory exists it is canonicalized as well, so symlinked
/// directories map to the same key.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other.as_os_str()),
        }
    }

    match (lexical.parent(), lexical.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => parent.join(name),
            Err(_) => lexical,
        },
        _ => lexical,
    }
}
