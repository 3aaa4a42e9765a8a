//! Append-only session history.

use std::collections::HashSet;

use learnkeep_core::model::{new_id, SessionRecord};
use learnkeep_store::{DocumentStore, PathLock};

use crate::collection::Collection;
use crate::error::RecordsResult;
use crate::SESSIONS_FILE;

/// Session records stored in `sessions.json`.
#[derive(Debug)]
pub struct SessionRepository {
    docs: Collection<Vec<SessionRecord>>,
}

impl SessionRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            docs: Collection::new(store, SESSIONS_FILE),
        }
    }

    pub(crate) fn collection(&self) -> &Collection<Vec<SessionRecord>> {
        &self.docs
    }

    /// The path lock of `sessions.json`.
    pub fn lock(&self) -> PathLock {
        self.docs.lock()
    }

    pub fn all(&self) -> Vec<SessionRecord> {
        self.docs.snapshot()
    }

    pub fn len(&self) -> usize {
        self.docs.read(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.read(|all| all.iter().any(|s| s.id == id))
    }

    pub fn for_learner(&self, learner_id: &str) -> Vec<SessionRecord> {
        self.filtered(|s| s.learner_id.as_deref() == Some(learner_id))
    }

    pub fn for_game(&self, game_id: &str) -> Vec<SessionRecord> {
        self.filtered(|s| s.game_id == game_id)
    }

    /// Sessions of one learner in one game, excluding `exclude_id`.
    pub fn history_for(
        &self,
        learner_id: &str,
        game_id: &str,
        exclude_id: &str,
    ) -> Vec<SessionRecord> {
        self.filtered(|s| {
            s.learner_id.as_deref() == Some(learner_id)
                && s.game_id == game_id
                && s.id != exclude_id
        })
    }

    /// The `n` most recent sessions of a learner in a game, newest first.
    pub fn recent_for_game(
        &self,
        learner_id: &str,
        game_id: &str,
        n: usize,
    ) -> Vec<SessionRecord> {
        let mut matching =
            self.filtered(|s| s.learner_id.as_deref() == Some(learner_id) && s.game_id == game_id);
        matching.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        matching.truncate(n);
        matching
    }

    fn filtered(&self, keep: impl Fn(&SessionRecord) -> bool) -> Vec<SessionRecord> {
        self.docs
            .read(|all| all.iter().filter(|s| keep(s)).cloned().collect())
    }

    /// Append one record. A record whose id is already stored is ignored; a
    /// record without an id gets a fresh one.
    ///
    /// Returns whether the record was added.
    pub fn append(&self, mut record: SessionRecord) -> RecordsResult<bool> {
        if record.id.is_empty() {
            record.id = new_id();
        }
        let added = self.docs.try_update(|all| {
            if all.iter().any(|s| s.id == record.id) {
                tracing::debug!(session = %record.id, "session already stored, skipping");
                return None;
            }
            all.push(record);
            Some(())
        })?;
        Ok(added.is_some())
    }

    /// Append many records, skipping ids already stored or repeated in the
    /// batch. Returns how many were added.
    pub fn import(&self, records: Vec<SessionRecord>) -> RecordsResult<usize> {
        let added = self.docs.try_update(|all| {
            let mut seen: HashSet<String> = all.iter().map(|s| s.id.clone()).collect();
            let before = all.len();
            for mut record in records {
                if record.id.is_empty() {
                    record.id = new_id();
                }
                if seen.insert(record.id.clone()) {
                    all.push(record);
                }
            }
            let added = all.len() - before;
            (added > 0).then_some(added)
        })?;
        let added = added.unwrap_or(0);
        tracing::info!(added, "imported sessions");
        Ok(added)
    }

    /// Remove every session of a learner. Returns how many were removed.
    pub fn delete_for_learner(&self, learner_id: &str) -> RecordsResult<usize> {
        let removed = self.docs.try_update(|all| {
            let before = all.len();
            all.retain(|s| s.learner_id.as_deref() != Some(learner_id));
            let removed = before - all.len();
            (removed > 0).then_some(removed)
        })?;
        Ok(removed.unwrap_or(0))
    }

    pub fn reload(&self) {
        self.docs.reload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn repo(dir: &std::path::Path) -> SessionRepository {
        SessionRepository::new(DocumentStore::open(dir))
    }

    fn session(learner: &str, game: &str, minutes_ago: i64) -> SessionRecord {
        let ended = Utc::now() - Duration::minutes(minutes_ago);
        SessionRecord {
            ended_at: ended,
            started_at: ended - Duration::minutes(1),
            ..SessionRecord::new(Some(learner), game)
        }
    }

    #[test]
    fn append_ignores_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = repo(dir.path());
        let s = session("ana", "memory", 1);
        assert!(sessions.append(s.clone()).unwrap());
        assert!(!sessions.append(s.clone()).unwrap());
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains(&s.id));
        assert!(!sessions.contains("missing"));
    }

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = repo(dir.path());
        let old = session("ana", "memory", 30);
        let mid = session("ana", "memory", 20);
        let new = session("ana", "memory", 10);
        let other_game = session("ana", "sorting", 5);
        let other_learner = session("ben", "memory", 1);
        for s in [&mid, &old, &new, &other_game, &other_learner] {
            sessions.append(s.clone()).unwrap();
        }

        let recent = sessions.recent_for_game("ana", "memory", 2);
        let ids: Vec<_> = recent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![new.id.as_str(), mid.id.as_str()]);
    }

    #[test]
    fn history_excludes_current_session() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = repo(dir.path());
        let a = session("ana", "memory", 2);
        let b = session("ana", "memory", 1);
        sessions.append(a.clone()).unwrap();
        sessions.append(b.clone()).unwrap();
        let history = sessions.history_for("ana", "memory", &b.id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, a.id);
    }

    #[test]
    fn import_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = repo(dir.path());
        let a = session("ana", "memory", 3);
        let b = session("ana", "memory", 2);
        sessions.append(a.clone()).unwrap();
        let added = sessions.import(vec![a, b.clone(), b]).unwrap();
        assert_eq!(added, 1);
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn delete_for_learner_keeps_others() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = repo(dir.path());
        sessions.append(session("ana", "memory", 3)).unwrap();
        sessions.append(session("ana", "sorting", 2)).unwrap();
        sessions.append(session("ben", "memory", 1)).unwrap();
        sessions.append(SessionRecord::new(None, "memory")).unwrap();

        assert_eq!(sessions.delete_for_learner("ana").unwrap(), 2);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions.for_learner("ben").len(), 1);
        assert_eq!(sessions.for_game("memory").len(), 2);
    }
}
