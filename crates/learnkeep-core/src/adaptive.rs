//! Adaptive difficulty controller.
//!
//! After every finished session the controller looks at the learner's most
//! recent sessions for that game and decides whether the next session should
//! be easier, harder, or stay put. Rules are evaluated in a fixed precedence
//! order and the first one that matches decides.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{clamp_difficulty, LearnerProfile, SessionRecord};
use crate::scoring::{consistency, precision};

/// Average precision at or above which difficulty goes up.
pub const RAISE_PRECISION: f64 = 0.88;
/// Average consistency at or above which difficulty goes up.
pub const RAISE_CONSISTENCY: f64 = 0.60;
/// Average precision at or below which difficulty goes down.
pub const LOWER_PRECISION: f64 = 0.60;
/// Average consistency at or below which difficulty goes down.
pub const LOWER_CONSISTENCY: f64 = 0.30;
/// Sessions during which changes are suppressed after a change.
pub const COOLDOWN_AFTER_CHANGE: u32 = 2;
/// Number of recent sessions the controller is normally fed.
pub const DEFAULT_RECENT_WINDOW: usize = 3;

/// Why the controller decided what it decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    NoProfile,
    Manual,
    AdaptationOff,
    Cooldown,
    NoHistory,
    Changed,
    Unchanged,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::NoProfile => "no-profile",
            Reason::Manual => "manual",
            Reason::AdaptationOff => "adaptation-off",
            Reason::Cooldown => "cooldown",
            Reason::NoHistory => "no-history",
            Reason::Changed => "changed",
            Reason::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Level the next session should be played at.
    pub next_difficulty: u8,
    pub changed: bool,
    /// Cooldown started by this decision, 0 when none.
    pub cooldown_set: u32,
    pub reason: Reason,
}

impl Decision {
    fn keep(level: u8, reason: Reason) -> Self {
        Self {
            next_difficulty: level,
            changed: false,
            cooldown_set: 0,
            reason,
        }
    }
}

/// Which games take part in automatic adaptation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptationSettings {
    /// Games for which automatic adaptation is switched off.
    #[serde(default)]
    pub disabled_games: BTreeSet<String>,
}

impl AdaptationSettings {
    pub fn is_enabled(&self, game_id: &str) -> bool {
        !self.disabled_games.contains(game_id)
    }
}

/// Mean precision and consistency across `sessions`.
///
/// Sessions that cannot produce a metric contribute 0 rather than being
/// skipped.
pub fn average_metrics(sessions: &[SessionRecord]) -> (f64, f64) {
    if sessions.is_empty() {
        return (0.0, 0.0);
    }
    let n = sessions.len() as f64;
    let precision_sum: f64 = sessions.iter().map(precision).sum();
    let consistency_sum: f64 = sessions.iter().map(consistency).sum();
    (precision_sum / n, consistency_sum / n)
}

/// Level proposed purely from the averaged metrics, clamped to the valid range.
pub fn propose(difficulty_used: u8, avg_precision: f64, avg_consistency: f64) -> u8 {
    let used = difficulty_used as i64;
    let proposal = if avg_precision >= RAISE_PRECISION && avg_consistency >= RAISE_CONSISTENCY {
        used + 1
    } else if avg_precision <= LOWER_PRECISION || avg_consistency <= LOWER_CONSISTENCY {
        used - 1
    } else {
        used
    };
    clamp_difficulty(proposal)
}

/// Per-learner adaptive difficulty controller.
#[derive(Debug, Clone, Default)]
pub struct DifficultyController {
    settings: AdaptationSettings,
}

impl DifficultyController {
    pub fn new(settings: AdaptationSettings) -> Self {
        Self { settings }
    }

    /// Decide the difficulty following a finished session.
    ///
    /// Mutates the learner's difficulty record for `game_id`; the caller
    /// persists the profile afterwards.
    pub fn evaluate(
        &self,
        learner: Option<&mut LearnerProfile>,
        game_id: &str,
        difficulty_used: u8,
        recent: &[SessionRecord],
    ) -> Decision {
        let used = clamp_difficulty(difficulty_used as i64);

        let Some(learner) = learner else {
            return Decision::keep(used, Reason::NoProfile);
        };
        let learner_id = learner.id.clone();
        let state = learner.difficulty_entry(game_id, used);

        if state.manual_override {
            return Decision::keep(used, Reason::Manual);
        }

        if !self.settings.is_enabled(game_id) {
            return Decision::keep(used, Reason::AdaptationOff);
        }

        if state.cooldown_remaining > 0 {
            state.cooldown_remaining -= 1;
            tracing::debug!(
                learner = %learner_id,
                game = game_id,
                remaining = state.cooldown_remaining,
                "difficulty cooldown tick"
            );
            return Decision::keep(used, Reason::Cooldown);
        }

        if recent.is_empty() {
            state.automatic_difficulty = used;
            return Decision::keep(used, Reason::NoHistory);
        }

        let (avg_precision, avg_consistency) = average_metrics(recent);
        let proposal = propose(used, avg_precision, avg_consistency);

        if proposal != used {
            state.automatic_difficulty = proposal;
            state.cooldown_remaining = COOLDOWN_AFTER_CHANGE;
            tracing::info!(
                learner = %learner_id,
                game = game_id,
                from = used,
                to = proposal,
                avg_precision,
                avg_consistency,
                "difficulty adapted"
            );
            Decision {
                next_difficulty: proposal,
                changed: true,
                cooldown_set: COOLDOWN_AFTER_CHANGE,
                reason: Reason::Changed,
            }
        } else {
            state.automatic_difficulty = used;
            Decision::keep(used, Reason::Unchanged)
        }
    }
}
