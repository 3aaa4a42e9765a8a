//! learnkeep-records — Repositories over the learnkeep data documents.
//!
//! Each repository owns one JSON document under the data root and goes
//! through `learnkeep-store` for every read and write. [`LearningService`]
//! combines them with the scoring, adaptation and progress algorithms from
//! `learnkeep-core`.

pub mod classrooms;
pub mod collection;
pub mod config;
pub mod error;
pub mod operators;
pub mod plans;
pub mod preferences;
pub mod profiles;
pub mod service;
pub mod sessions;

pub const PROFILES_FILE: &str = "profiles.json";
pub const SESSIONS_FILE: &str = "sessions.json";
pub const PLANS_FILE: &str = "plans.json";
pub const CLASSROOMS_FILE: &str = "classrooms.json";
pub const OPERATORS_FILE: &str = "operators.json";
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Every document a full snapshot covers.
pub const DATA_FILES: [&str; 6] = [
    PROFILES_FILE,
    SESSIONS_FILE,
    PLANS_FILE,
    CLASSROOMS_FILE,
    OPERATORS_FILE,
    PREFERENCES_FILE,
];

pub use classrooms::ClassroomRepository;
pub use collection::Collection;
pub use config::{load_config, load_config_from, LearnkeepConfig};
pub use error::{RecordsError, RecordsResult};
pub use operators::OperatorRepository;
pub use plans::PlanRepository;
pub use preferences::PreferencesRepository;
pub use profiles::ProfileRepository;
pub use service::{LearningService, SessionOutcome};
pub use sessions::SessionRepository;
