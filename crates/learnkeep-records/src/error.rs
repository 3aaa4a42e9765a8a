//! Repository error types.

use thiserror::Error;

use learnkeep_store::StoreError;

/// Errors returned by repositories and the learning service.
#[derive(Debug, Error)]
pub enum RecordsError {
    /// The underlying document could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The default classroom cannot be deleted.
    #[error("the default classroom cannot be deleted")]
    DefaultClassroomProtected,

    #[error("classroom not found: {0}")]
    ClassroomNotFound(String),

    #[error("learner not found: {0}")]
    LearnerNotFound(String),

    /// A session with this id is already in the history.
    #[error("session already stored: {0}")]
    SessionAlreadyStored(String),

    #[error("learning plan not found: {0}")]
    PlanNotFound(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type RecordsResult<T> = Result<T, RecordsError>;
