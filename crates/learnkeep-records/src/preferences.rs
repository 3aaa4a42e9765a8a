//! UI preferences, a flat JSON object keyed by setting name.

use serde_json::{Map, Value};

use learnkeep_store::DocumentStore;

use crate::collection::Collection;
use crate::error::RecordsResult;
use crate::PREFERENCES_FILE;

#[derive(Debug)]
pub struct PreferencesRepository {
    docs: Collection<Map<String, Value>>,
}

impl PreferencesRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            docs: Collection::new(store, PREFERENCES_FILE),
        }
    }

    pub(crate) fn collection(&self) -> &Collection<Map<String, Value>> {
        &self.docs
    }

    pub fn all(&self) -> Map<String, Value> {
        self.docs.snapshot()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.docs.read(|prefs| prefs.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: Value) -> RecordsResult<()> {
        self.docs.update(|prefs| {
            prefs.insert(key.to_string(), value);
        })?;
        Ok(())
    }

    /// Remove a setting, returning its previous value.
    pub fn remove(&self, key: &str) -> RecordsResult<Option<Value>> {
        Ok(self.docs.try_update(|prefs| prefs.remove(key))?)
    }

    pub fn reload(&self) {
        self.docs.reload();
    }
}
