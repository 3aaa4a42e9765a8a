//! Operator account repository.
//!
//! Accounts are persisted with an opaque password hash; hashing and login
//! checks happen in the caller.

use learnkeep_core::model::OperatorAccount;
use learnkeep_store::DocumentStore;

use crate::collection::Collection;
use crate::error::RecordsResult;
use crate::OPERATORS_FILE;

#[derive(Debug)]
pub struct OperatorRepository {
    docs: Collection<Vec<OperatorAccount>>,
}

impl OperatorRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            docs: Collection::new(store, OPERATORS_FILE),
        }
    }

    pub(crate) fn collection(&self) -> &Collection<Vec<OperatorAccount>> {
        &self.docs
    }

    pub fn list(&self) -> Vec<OperatorAccount> {
        self.docs.snapshot()
    }

    /// Case-insensitive lookup by username.
    pub fn find_by_username(&self, username: &str) -> Option<OperatorAccount> {
        self.docs.read(|all| {
            all.iter()
                .find(|a| a.username.eq_ignore_ascii_case(username))
                .cloned()
        })
    }

    /// Insert or replace an account, matched by id.
    pub fn upsert(&self, account: OperatorAccount) -> RecordsResult<()> {
        self.docs.update(|all| match all.iter_mut().find(|a| a.id == account.id) {
            Some(existing) => *existing = account,
            None => all.push(account),
        })?;
        Ok(())
    }

    /// Remove an account. Returns whether it existed.
    pub fn delete(&self, id: &str) -> RecordsResult<bool> {
        let removed = self.docs.try_update(|all| {
            let before = all.len();
            all.retain(|a| a.id != id);
            (all.len() != before).then_some(())
        })?;
        Ok(removed.is_some())
    }

    pub fn reload(&self) {
        self.docs.reload();
    }
}
