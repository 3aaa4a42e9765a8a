//! Cached view of one document.
//!
//! Every repository owns a [`Collection`] for its file. The document is loaded
//! lazily on first access and kept in memory; updates hold the file's path
//! lock across read, modify and save, and replace the cache only after the
//! save succeeded.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use learnkeep_store::{DocumentStore, LoadOutcome, PathLock, StoreResult};

#[derive(Debug)]
struct Cached<D> {
    value: D,
    outcome: LoadOutcome,
}

/// One named document under the data root, cached in memory.
#[derive(Debug)]
pub struct Collection<D> {
    store: DocumentStore,
    name: String,
    path: PathBuf,
    cache: Mutex<Option<Cached<D>>>,
}

impl<D> Collection<D>
where
    D: Serialize + DeserializeOwned + Clone + Default,
{
    pub fn new(store: DocumentStore, name: &str) -> Self {
        let path = store.path(name);
        Self {
            store,
            name: name.to_string(),
            path,
            cache: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The per-path lock of this document.
    ///
    /// Lock order is always path lock, then cache.
    pub fn lock(&self) -> PathLock {
        self.store.lock(&self.path)
    }

    fn load_fresh(&self) -> StoreResult<Cached<D>> {
        let loaded = self.store.try_load(&self.path, D::default())?;
        if loaded.recovered_from_corruption() {
            tracing::warn!(document = %self.name, "document was corrupt and has been reset");
        }
        Ok(Cached {
            value: loaded.value,
            outcome: loaded.outcome,
        })
    }

    /// Run `f` against the cached document.
    ///
    /// A document that cannot be read is served as the default for this call
    /// only. It is not cached, so the next access retries the load.
    fn with_loaded<R>(&self, f: impl FnOnce(&Cached<D>) -> R) -> R {
        let lock = self.lock();
        let _guard = lock.lock();
        let mut cache = self.cache.lock();
        if cache.is_none() {
            match self.load_fresh() {
                Ok(loaded) => *cache = Some(loaded),
                Err(e) => {
                    tracing::error!(document = %self.name, "load failed, using default: {e}");
                }
            }
        }
        match cache.as_ref() {
            Some(cached) => f(cached),
            None => f(&Cached {
                value: D::default(),
                outcome: LoadOutcome::Fallback,
            }),
        }
    }

    /// Run `f` against the cached document, failing if it cannot be read.
    fn with_loaded_mut<R>(
        &self,
        f: impl FnOnce(&mut Cached<D>) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let lock = self.lock();
        let _guard = lock.lock();
        let mut cache = self.cache.lock();
        let cached = match &mut *cache {
            Some(cached) => cached,
            empty => empty.insert(self.load_fresh()?),
        };
        f(cached)
    }

    /// Run `f` against the current document.
    pub fn read<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        self.with_loaded(|cached| f(&cached.value))
    }

    /// A copy of the current document.
    pub fn snapshot(&self) -> D {
        self.read(D::clone)
    }

    /// Apply `f` to a copy of the document and save it.
    ///
    /// Fails without writing when the document cannot be read.
    pub fn update<R>(&self, f: impl FnOnce(&mut D) -> R) -> StoreResult<R> {
        self.with_loaded_mut(|cached| {
            let mut next = cached.value.clone();
            let result = f(&mut next);
            self.store.try_save(&self.path, &next)?;
            cached.value = next;
            Ok(result)
        })
    }

    /// Like [`Collection::update`], but only saves when `f` returns `Some`.
    pub fn try_update<R>(&self, f: impl FnOnce(&mut D) -> Option<R>) -> StoreResult<Option<R>> {
        self.with_loaded_mut(|cached| {
            let mut next = cached.value.clone();
            let Some(result) = f(&mut next) else {
                return Ok(None);
            };
            self.store.try_save(&self.path, &next)?;
            cached.value = next;
            Ok(Some(result))
        })
    }

    /// Drop the cache and load the document from disk again.
    ///
    /// When the load fails the cache stays empty and the next access retries.
    pub fn reload(&self) -> LoadOutcome {
        let lock = self.lock();
        let _guard = lock.lock();
        let mut cache = self.cache.lock();
        match self.load_fresh() {
            Ok(loaded) => {
                let outcome = loaded.outcome.clone();
                *cache = Some(loaded);
                outcome
            }
            Err(e) => {
                tracing::error!(document = %self.name, "reload failed: {e}");
                *cache = None;
                LoadOutcome::Fallback
            }
        }
    }

    /// How the cached document was obtained, loading it if needed.
    pub fn load_outcome(&self) -> LoadOutcome {
        self.with_loaded(|cached| cached.outcome.clone())
    }
}
