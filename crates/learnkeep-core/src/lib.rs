//! learnkeep-core — Learner data model and the algorithms that consume it.
//!
//! This crate defines the records the durable store keeps (profiles, session
//! records, learning plans) together with the session scoring engine, the
//! adaptive difficulty controller and the goal progress tracker. Everything
//! here is pure; persistence lives in `learnkeep-store` and
//! `learnkeep-records`.

pub mod adaptive;
pub mod model;
pub mod progress;
pub mod scoring;

pub use adaptive::{AdaptationSettings, Decision, DifficultyController, Reason};
pub use model::{
    Classroom, GameDifficulty, LearnerProfile, LearningPlan, Objective, OperatorAccount,
    OperatorRole, SessionRecord,
};
pub use progress::{recompute_progress, ObjectiveProgress};
pub use scoring::{score, ScoreBreakdown};
