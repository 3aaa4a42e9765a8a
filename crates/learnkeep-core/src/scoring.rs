//! Session scoring.
//!
//! Turns the raw metrics of a finished session into a 0–100 score. The score
//! blends precision, first-attempt consistency and pace, and is scaled down
//! for sessions that stopped before reaching their round target.

use serde::{Deserialize, Serialize};

use crate::model::SessionRecord;

/// Weight of precision in the base score.
pub const PRECISION_WEIGHT: f64 = 0.60;
/// Weight of first-attempt consistency in the base score.
pub const CONSISTENCY_WEIGHT: f64 = 0.25;
/// Weight of pace in the base score.
pub const TIME_WEIGHT: f64 = 0.15;

/// Time score used when the duration is unknown.
pub const NEUTRAL_TIME_SCORE: f64 = 0.6;
/// Slow play never scores below this on pace.
pub const MIN_TIME_SCORE: f64 = 0.35;
/// Baseline duration floor when the learner has no history for the game.
pub const FALLBACK_BASELINE_MS: f64 = 25_000.0;
/// Expected milliseconds per round when the learner has no history.
pub const FALLBACK_MS_PER_ROUND: f64 = 15_000.0;

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn ratio(numerator: i64, denominator: i64) -> f64 {
    numerator.max(0) as f64 / denominator as f64
}

/// Fraction of attempts that were correct.
pub fn precision(session: &SessionRecord) -> f64 {
    let attempts = session.attempts.max(0);
    if attempts > 0 {
        clamp01(ratio(session.correct_total, attempts))
    } else {
        0.0
    }
}

/// Fraction of completed rounds solved on the first attempt.
pub fn consistency(session: &SessionRecord) -> f64 {
    let completed = session.rounds_completed.max(0);
    if completed > 0 {
        clamp01(ratio(session.correct_first_attempt, completed))
    } else {
        0.0
    }
}

/// Fraction of the round target that was played. A session without a target
/// counts as complete.
pub fn completeness(session: &SessionRecord) -> f64 {
    let total = session.rounds_total.max(0);
    if total > 0 {
        clamp01(ratio(session.rounds_completed, total))
    } else {
        1.0
    }
}

/// Median of the positive durations, or `None` when there are none.
fn median_duration(history: &[SessionRecord]) -> Option<f64> {
    let mut durations: Vec<i64> = history
        .iter()
        .map(|s| s.duration_ms)
        .filter(|&d| d > 0)
        .collect();
    if durations.is_empty() {
        return None;
    }
    durations.sort_unstable();
    let mid = durations.len() / 2;
    let median = if durations.len() % 2 == 0 {
        (durations[mid - 1] as f64 + durations[mid] as f64) / 2.0
    } else {
        durations[mid] as f64
    };
    Some(median)
}

/// Pace relative to the learner's usual duration for this game.
pub fn time_score(session: &SessionRecord, history: &[SessionRecord]) -> f64 {
    if session.duration_ms <= 0 {
        return NEUTRAL_TIME_SCORE;
    }
    let baseline = median_duration(history).unwrap_or_else(|| {
        FALLBACK_BASELINE_MS.max(session.rounds_total.max(0) as f64 * FALLBACK_MS_PER_ROUND)
    });
    (baseline / session.duration_ms as f64).clamp(MIN_TIME_SCORE, 1.0)
}

/// Every intermediate quantity behind a session score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub precision: f64,
    pub consistency: f64,
    pub completeness: f64,
    pub time_score: f64,
    /// Weighted blend of precision, consistency and pace.
    pub base: f64,
    /// `0.5 + 0.5 * completeness`.
    pub completeness_factor: f64,
    /// Final score in `[0, 100]`.
    pub score: u8,
}

impl ScoreBreakdown {
    /// Compute the full breakdown for `session` given prior sessions of the
    /// same game.
    pub fn compute(session: &SessionRecord, history: &[SessionRecord]) -> Self {
        let precision = precision(session);
        let consistency = consistency(session);
        let completeness = completeness(session);
        let time_score = time_score(session, history);

        let base = PRECISION_WEIGHT * precision
            + CONSISTENCY_WEIGHT * consistency
            + TIME_WEIGHT * time_score;
        let completeness_factor = 0.5 + 0.5 * completeness;
        let score = (100.0 * base * completeness_factor).round().clamp(0.0, 100.0) as u8;

        Self {
            precision,
            consistency,
            completeness,
            time_score,
            base,
            completeness_factor,
            score,
        }
    }
}

/// Score a finished session against prior sessions of the same game.
pub fn score(session: &SessionRecord, history: &[SessionRecord]) -> u8 {
    ScoreBreakdown::compute(session, history).score
}
