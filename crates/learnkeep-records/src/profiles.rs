//! Learner profile repository.

use learnkeep_core::model::{clamp_difficulty, LearnerProfile};
use learnkeep_store::{DocumentStore, PathLock};

use crate::collection::Collection;
use crate::error::{RecordsError, RecordsResult};
use crate::PROFILES_FILE;

/// Profiles stored in `profiles.json`.
#[derive(Debug)]
pub struct ProfileRepository {
    docs: Collection<Vec<LearnerProfile>>,
}

impl ProfileRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            docs: Collection::new(store, PROFILES_FILE),
        }
    }

    pub(crate) fn collection(&self) -> &Collection<Vec<LearnerProfile>> {
        &self.docs
    }

    pub fn lock(&self) -> PathLock {
        self.docs.lock()
    }

    pub fn list(&self) -> Vec<LearnerProfile> {
        self.docs.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<LearnerProfile> {
        self.docs.read(|all| all.iter().find(|p| p.id == id).cloned())
    }

    pub fn in_classroom(&self, classroom_id: &str) -> Vec<LearnerProfile> {
        self.docs.read(|all| {
            all.iter()
                .filter(|p| p.classroom_id == classroom_id)
                .cloned()
                .collect()
        })
    }

    /// Insert a new profile or replace the one with the same id.
    pub fn upsert(&self, profile: LearnerProfile) -> RecordsResult<()> {
        self.docs.update(|all| match all.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => all.push(profile),
        })?;
        Ok(())
    }

    /// Remove a profile. Returns whether it existed.
    pub fn delete(&self, id: &str) -> RecordsResult<bool> {
        let removed = self.docs.try_update(|all| {
            let before = all.len();
            all.retain(|p| p.id != id);
            (all.len() != before).then_some(())
        })?;
        Ok(removed.is_some())
    }

    /// Apply `f` to one profile and save it.
    pub fn modify<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut LearnerProfile) -> R,
    ) -> RecordsResult<R> {
        self.docs
            .try_update(|all| all.iter_mut().find(|p| p.id == id).map(f))?
            .ok_or_else(|| RecordsError::LearnerNotFound(id.to_string()))
    }

    /// Add to a learner's points. Returns the new total.
    pub fn add_points(&self, id: &str, points: u64) -> RecordsResult<u64> {
        self.modify(id, |p| {
            p.points = p.points.saturating_add(points);
            p.points
        })
    }

    pub fn assign_game(&self, id: &str, game_id: &str) -> RecordsResult<()> {
        self.modify(id, |p| p.assign_game(game_id))
    }

    /// Pin a game's difficulty at `level`, suspending adaptation.
    pub fn set_manual_difficulty(&self, id: &str, game_id: &str, level: u8) -> RecordsResult<()> {
        let level = clamp_difficulty(level as i64);
        self.modify(id, |p| {
            let state = p.difficulty_entry(game_id, level);
            state.manual_override = true;
            state.manual_level = level;
        })
    }

    /// Hand a game back to the adaptive controller.
    pub fn clear_manual_override(&self, id: &str, game_id: &str) -> RecordsResult<()> {
        self.modify(id, |p| {
            if let Some(state) = p.difficulty.get_mut(game_id) {
                state.manual_override = false;
            }
        })
    }

    /// Move every learner of classroom `from` to classroom `to`.
    ///
    /// Returns how many learners moved.
    pub fn move_classroom(&self, from: &str, to: &str) -> RecordsResult<usize> {
        let moved = self.docs.try_update(|all| {
            let mut moved = 0usize;
            for profile in all.iter_mut().filter(|p| p.classroom_id == from) {
                profile.classroom_id = to.to_string();
                moved += 1;
            }
            (moved > 0).then_some(moved)
        })?;
        Ok(moved.unwrap_or(0))
    }

    /// Drop the cache and read `profiles.json` again.
    pub fn reload(&self) {
        self.docs.reload();
    }
}
