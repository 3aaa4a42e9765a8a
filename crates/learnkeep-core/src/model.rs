//! Core data model types for learnkeep.
//!
//! These are the records the durable store persists: learner profiles with
//! their per-game difficulty state, immutable session records, and
//! individualized learning plans with their objectives.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest difficulty level a game can be played at.
pub const MIN_DIFFICULTY: u8 = 1;
/// Highest difficulty level a game can be played at.
pub const MAX_DIFFICULTY: u8 = 5;
/// Identifier of the classroom every learner falls back to.
pub const DEFAULT_CLASSROOM_ID: &str = "default";

/// Clamp a difficulty level into `[MIN_DIFFICULTY, MAX_DIFFICULTY]`.
pub fn clamp_difficulty(level: i64) -> u8 {
    level.clamp(MIN_DIFFICULTY as i64, MAX_DIFFICULTY as i64) as u8
}

/// Generate a fresh record identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Learner profiles
// ---------------------------------------------------------------------------

/// Per-game difficulty state of a learner.
///
/// The manual fields are owned by teachers; the automatic fields are owned by
/// the adaptive difficulty controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDifficulty {
    /// Teacher-set difficulty is in force; automatic adaptation is suspended.
    #[serde(default)]
    pub manual_override: bool,
    /// Level chosen by the teacher while `manual_override` is set.
    #[serde(default = "default_level")]
    pub manual_level: u8,
    /// Level last chosen (or synced) by the adaptive controller.
    #[serde(default = "default_level")]
    pub automatic_difficulty: u8,
    /// Sessions left during which automatic changes are suppressed.
    #[serde(default)]
    pub cooldown_remaining: u32,
}

fn default_level() -> u8 {
    MIN_DIFFICULTY
}

impl Default for GameDifficulty {
    fn default() -> Self {
        Self {
            manual_override: false,
            manual_level: MIN_DIFFICULTY,
            automatic_difficulty: MIN_DIFFICULTY,
            cooldown_remaining: 0,
        }
    }
}

impl GameDifficulty {
    /// A fresh automatic record starting at `level`.
    pub fn starting_at(level: u8) -> Self {
        let level = clamp_difficulty(level as i64);
        Self {
            manual_level: level,
            automatic_difficulty: level,
            ..Self::default()
        }
    }

    /// The level a new session for this game should start at.
    pub fn effective_level(&self) -> u8 {
        if self.manual_override {
            clamp_difficulty(self.manual_level as i64)
        } else {
            clamp_difficulty(self.automatic_difficulty as i64)
        }
    }
}

/// A child's persistent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    /// Unique identifier.
    pub id: String,
    /// Name shown on the administration screens.
    pub display_name: String,
    /// Optional avatar or icon key.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Classroom the learner belongs to.
    #[serde(default = "default_classroom")]
    pub classroom_id: String,
    /// Running total of earned points.
    #[serde(default)]
    pub points: u64,
    /// Games assigned to the learner.
    #[serde(default)]
    pub assigned_games: BTreeSet<String>,
    /// Difficulty state per assigned game.
    #[serde(default)]
    pub difficulty: BTreeMap<String, GameDifficulty>,
    /// When the profile was created.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

fn default_classroom() -> String {
    DEFAULT_CLASSROOM_ID.to_string()
}

impl LearnerProfile {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            display_name: display_name.into(),
            avatar: None,
            classroom_id: default_classroom(),
            points: 0,
            assigned_games: BTreeSet::new(),
            difficulty: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Assign a game, creating its difficulty record if missing.
    pub fn assign_game(&mut self, game_id: &str) {
        self.assigned_games.insert(game_id.to_string());
        self.difficulty.entry(game_id.to_string()).or_default();
    }

    /// Difficulty state for a game, if the learner has one.
    pub fn difficulty_for(&self, game_id: &str) -> Option<&GameDifficulty> {
        self.difficulty.get(game_id)
    }

    /// Difficulty state for a game, created on first use.
    pub fn difficulty_entry(&mut self, game_id: &str, starting_level: u8) -> &mut GameDifficulty {
        self.difficulty
            .entry(game_id.to_string())
            .or_insert_with(|| GameDifficulty::starting_at(starting_level))
    }
}

// ---------------------------------------------------------------------------
// Session records
// ---------------------------------------------------------------------------

/// Metrics of one completed play-through.
///
/// Created once when a session ends and never mutated afterwards. Counters are
/// signed so a damaged record still parses; consumers floor them at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Empty until the record is stored.
    #[serde(default)]
    pub id: String,
    /// Learner who played; `None` for anonymous play.
    #[serde(default)]
    pub learner_id: Option<String>,
    pub game_id: String,
    #[serde(default = "default_level")]
    pub difficulty_initial: u8,
    #[serde(default = "default_level")]
    pub difficulty_used: u8,
    #[serde(default = "default_level")]
    pub difficulty_final: u8,
    /// The adaptive controller changed the difficulty after this session.
    #[serde(default)]
    pub adapted: bool,
    #[serde(default)]
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: i64,
    /// Rounds the session was meant to have.
    #[serde(default)]
    pub rounds_total: i64,
    #[serde(default)]
    pub rounds_completed: i64,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub errors: i64,
    #[serde(default)]
    pub hints_used: i64,
    #[serde(default)]
    pub correct_total: i64,
    #[serde(default)]
    pub correct_first_attempt: i64,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub objective_id: Option<String>,
}

impl SessionRecord {
    /// A new record for `game_id` stamped with the current time.
    pub fn new(learner_id: Option<&str>, game_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            learner_id: learner_id.map(str::to_string),
            game_id: game_id.into(),
            difficulty_initial: MIN_DIFFICULTY,
            difficulty_used: MIN_DIFFICULTY,
            difficulty_final: MIN_DIFFICULTY,
            started_at: now,
            ended_at: now,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Learning plans
// ---------------------------------------------------------------------------

/// A single measurable goal within a learning plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Games whose sessions can work towards this objective.
    #[serde(default)]
    pub game_ids: Vec<String>,
    #[serde(default = "default_level")]
    pub min_difficulty: u8,
    #[serde(default = "max_level")]
    pub max_difficulty: u8,
    #[serde(default)]
    pub target_rounds_correct: u64,
    #[serde(default)]
    pub target_sessions: u64,
    /// Derived from session history by the progress tracker.
    #[serde(default)]
    pub rounds_correct: u64,
    /// Derived from session history by the progress tracker.
    #[serde(default)]
    pub sessions_completed: u64,
    #[serde(default)]
    pub completed: bool,
}

fn max_level() -> u8 {
    MAX_DIFFICULTY
}

impl Objective {
    pub fn new(
        description: impl Into<String>,
        target_rounds_correct: u64,
        target_sessions: u64,
    ) -> Self {
        Self {
            id: new_id(),
            description: description.into(),
            game_ids: Vec::new(),
            min_difficulty: MIN_DIFFICULTY,
            max_difficulty: MAX_DIFFICULTY,
            target_rounds_correct,
            target_sessions,
            rounds_correct: 0,
            sessions_completed: 0,
            completed: false,
        }
    }
}

/// A learner's individualized learning plan.
///
/// A learner may have many plans over time but at most one active plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPlan {
    pub id: String,
    pub learner_id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// Set when the plan is deactivated.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub general_objective: String,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    /// The objective currently emphasized in sessions.
    #[serde(default)]
    pub current_objective_id: Option<String>,
}

impl LearningPlan {
    /// A new active plan for `learner_id`.
    pub fn new(learner_id: impl Into<String>, general_objective: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            learner_id: learner_id.into(),
            active: true,
            created_at: Utc::now(),
            closed_at: None,
            general_objective: general_objective.into(),
            objectives: Vec::new(),
            current_objective_id: None,
        }
    }

    pub fn objective(&self, objective_id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == objective_id)
    }

    /// The emphasized objective, if the pointer resolves.
    pub fn current_objective(&self) -> Option<&Objective> {
        self.current_objective_id
            .as_deref()
            .and_then(|id| self.objective(id))
    }

    /// Deactivate the plan, stamping the closure time if it has none.
    pub fn close(&mut self, at: DateTime<Utc>) {
        self.active = false;
        if self.closed_at.is_none() {
            self.closed_at = Some(at);
        }
    }
}

// ---------------------------------------------------------------------------
// Classrooms and operators
// ---------------------------------------------------------------------------

/// A group of learners managed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: String,
    pub name: String,
}

impl Classroom {
    /// The classroom that always exists.
    pub fn default_classroom() -> Self {
        Self {
            id: DEFAULT_CLASSROOM_ID.to_string(),
            name: "General".to_string(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_CLASSROOM_ID
    }
}

/// Role of an operator account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorRole {
    Admin,
    #[default]
    Teacher,
}

impl fmt::Display for OperatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorRole::Admin => write!(f, "admin"),
            OperatorRole::Teacher => write!(f, "teacher"),
        }
    }
}

/// An adult account allowed onto the administration screens.
///
/// The password hash is produced and checked elsewhere; it is stored opaque.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorAccount {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: OperatorRole,
}

impl fmt::Debug for OperatorAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorAccount")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("password_hash", &"***")
            .field("role", &self.role)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_difficulty_bounds() {
        assert_eq!(clamp_difficulty(-3), 1);
        assert_eq!(clamp_difficulty(0), 1);
        assert_eq!(clamp_difficulty(3), 3);
        assert_eq!(clamp_difficulty(9), 5);
    }

    #[test]
    fn effective_level_prefers_manual() {
        let mut d = GameDifficulty::starting_at(2);
        assert_eq!(d.effective_level(), 2);
        d.manual_override = true;
        d.manual_level = 4;
        assert_eq!(d.effective_level(), 4);
    }

    #[test]
    fn profile_from_minimal_json() {
        let json = r#"{"id": "l1", "display_name": "Ana"}"#;
        let profile: LearnerProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.classroom_id, DEFAULT_CLASSROOM_ID);
        assert_eq!(profile.points, 0);
        assert!(profile.difficulty.is_empty());
    }

    #[test]
    fn session_with_negative_counters_still_parses() {
        let json = r#"{"id": "s1", "game_id": "memory", "attempts": -2}"#;
        let session: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(session.attempts, -2);
        assert_eq!(session.learner_id, None);
    }

    #[test]
    fn close_keeps_existing_timestamp() {
        let mut plan = LearningPlan::new("l1", "read");
        let first = Utc::now();
        plan.close(first);
        plan.close(first + chrono::Duration::days(1));
        assert!(!plan.active);
        assert_eq!(plan.closed_at, Some(first));
    }

    #[test]
    fn operator_debug_masks_hash() {
        let op = OperatorAccount {
            id: "o1".into(),
            username: "maria".into(),
            display_name: "Maria".into(),
            password_hash: "secret-hash".into(),
            role: OperatorRole::Admin,
        };
        let debug = format!("{op:?}");
        assert!(!debug.contains("secret-hash"));
        assert_eq!(op.role.to_string(), "admin");
    }
}
