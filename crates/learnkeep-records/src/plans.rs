//! Learning plan repository.

use chrono::Utc;

use learnkeep_core::model::{LearningPlan, SessionRecord};
use learnkeep_core::progress::{recompute_in_place, summarize, ObjectiveProgress};
use learnkeep_store::DocumentStore;

use crate::collection::Collection;
use crate::error::{RecordsError, RecordsResult};
use crate::PLANS_FILE;

/// Learning plans stored in `plans.json`.
///
/// A learner has at most one active plan: saving an active plan closes every
/// other active plan of the same learner.
#[derive(Debug)]
pub struct PlanRepository {
    docs: Collection<Vec<LearningPlan>>,
}

impl PlanRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            docs: Collection::new(store, PLANS_FILE),
        }
    }

    pub(crate) fn collection(&self) -> &Collection<Vec<LearningPlan>> {
        &self.docs
    }

    pub fn list(&self) -> Vec<LearningPlan> {
        self.docs.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<LearningPlan> {
        self.docs.read(|all| all.iter().find(|p| p.id == id).cloned())
    }

    pub fn for_learner(&self, learner_id: &str) -> Vec<LearningPlan> {
        self.docs.read(|all| {
            all.iter()
                .filter(|p| p.learner_id == learner_id)
                .cloned()
                .collect()
        })
    }

    pub fn active_for(&self, learner_id: &str) -> Option<LearningPlan> {
        self.docs.read(|all| {
            all.iter()
                .find(|p| p.learner_id == learner_id && p.active)
                .cloned()
        })
    }

    /// Insert or replace a plan.
    pub fn save_plan(&self, plan: LearningPlan) -> RecordsResult<()> {
        let now = Utc::now();
        self.docs.update(|all| {
            if plan.active {
                for other in all
                    .iter_mut()
                    .filter(|p| p.learner_id == plan.learner_id && p.id != plan.id && p.active)
                {
                    other.close(now);
                    tracing::info!(
                        plan = %other.id,
                        learner = %other.learner_id,
                        "closed superseded plan"
                    );
                }
            }
            match all.iter_mut().find(|p| p.id == plan.id) {
                Some(existing) => *existing = plan,
                None => all.push(plan),
            }
        })?;
        Ok(())
    }

    /// Close a plan without deleting it.
    pub fn deactivate(&self, id: &str) -> RecordsResult<()> {
        let now = Utc::now();
        self.docs
            .try_update(|all| {
                all.iter_mut()
                    .find(|p| p.id == id)
                    .map(|plan| plan.close(now))
            })?
            .ok_or_else(|| RecordsError::PlanNotFound(id.to_string()))
    }

    /// Remove a plan. Returns whether it existed.
    pub fn delete(&self, id: &str) -> RecordsResult<bool> {
        let removed = self.docs.try_update(|all| {
            let before = all.len();
            all.retain(|p| p.id != id);
            (all.len() != before).then_some(())
        })?;
        Ok(removed.is_some())
    }

    /// Remove every plan of a learner. Returns how many were removed.
    pub fn delete_for_learner(&self, learner_id: &str) -> RecordsResult<usize> {
        let removed = self.docs.try_update(|all| {
            let before = all.len();
            all.retain(|p| p.learner_id != learner_id);
            let removed = before - all.len();
            (removed > 0).then_some(removed)
        })?;
        Ok(removed.unwrap_or(0))
    }

    /// Recompute objective progress of every plan from `sessions` and save.
    pub fn recompute(&self, sessions: &[SessionRecord]) -> RecordsResult<Vec<ObjectiveProgress>> {
        let rows = self.docs.update(|all| {
            recompute_in_place(all, sessions);
            summarize(all)
        })?;
        tracing::debug!(objectives = rows.len(), "recomputed goal progress");
        Ok(rows)
    }

    pub fn reload(&self) {
        self.docs.reload();
    }
}
