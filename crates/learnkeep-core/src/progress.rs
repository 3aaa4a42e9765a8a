//! Goal progress recomputation.
//!
//! Objective progress is never updated incrementally: it is derived from the
//! complete session history every time, so it stays correct after deletions,
//! imports and restores.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{LearningPlan, SessionRecord};

/// Progress of a single objective, flattened for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    pub learner_id: String,
    pub plan_id: String,
    pub objective_id: String,
    pub description: String,
    pub rounds_correct: u64,
    pub target_rounds_correct: u64,
    pub sessions_completed: u64,
    pub target_sessions: u64,
    pub completed: bool,
}

/// Totals accumulated for one `(plan, objective)` pair.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    rounds_correct: u64,
    sessions: u64,
}

fn tally_sessions(sessions: &[SessionRecord]) -> HashMap<(&str, &str), Tally> {
    let mut tallies: HashMap<(&str, &str), Tally> = HashMap::new();
    for session in sessions {
        let (Some(plan_id), Some(objective_id)) =
            (session.plan_id.as_deref(), session.objective_id.as_deref())
        else {
            continue;
        };
        let tally = tallies.entry((plan_id, objective_id)).or_default();
        tally.rounds_correct += session.correct_total.max(0) as u64;
        tally.sessions += 1;
    }
    tallies
}

/// Recompute every objective of every plan in place from `sessions`.
pub fn recompute_in_place(plans: &mut [LearningPlan], sessions: &[SessionRecord]) {
    let tallies = tally_sessions(sessions);
    for plan in plans.iter_mut() {
        for objective in plan.objectives.iter_mut() {
            let tally = tallies
                .get(&(plan.id.as_str(), objective.id.as_str()))
                .copied()
                .unwrap_or_default();
            objective.rounds_correct = tally.rounds_correct;
            objective.sessions_completed = tally.sessions;
            objective.completed = tally.rounds_correct >= objective.target_rounds_correct
                && tally.sessions >= objective.target_sessions;
        }
    }
}

/// Recompute objective progress for `plans` from the full session history.
///
/// Pure and idempotent: the result depends only on the plans' definitions and
/// the sessions, never on previously stored counters.
pub fn recompute_progress(plans: &[LearningPlan], sessions: &[SessionRecord]) -> Vec<LearningPlan> {
    let mut plans = plans.to_vec();
    recompute_in_place(&mut plans, sessions);
    plans
}

/// Flatten the objectives of `plans` into progress rows.
pub fn summarize(plans: &[LearningPlan]) -> Vec<ObjectiveProgress> {
    plans
        .iter()
        .flat_map(|plan| {
            plan.objectives.iter().map(move |o| ObjectiveProgress {
                learner_id: plan.learner_id.clone(),
                plan_id: plan.id.clone(),
                objective_id: o.id.clone(),
                description: o.description.clone(),
                rounds_correct: o.rounds_correct,
                target_rounds_correct: o.target_rounds_correct,
                sessions_completed: o.sessions_completed,
                target_sessions: o.target_sessions,
                completed: o.completed,
            })
        })
        .collect()
}
