//! Classroom repository.

use learnkeep_core::model::{new_id, Classroom, DEFAULT_CLASSROOM_ID};
use learnkeep_store::DocumentStore;

use crate::collection::Collection;
use crate::error::{RecordsError, RecordsResult};
use crate::CLASSROOMS_FILE;

/// Classrooms stored in `classrooms.json`.
///
/// The default classroom is always listed, whether or not it has been
/// written to disk yet.
#[derive(Debug)]
pub struct ClassroomRepository {
    docs: Collection<Vec<Classroom>>,
}

fn ensure_default(all: &mut Vec<Classroom>) {
    if !all.iter().any(Classroom::is_default) {
        all.insert(0, Classroom::default_classroom());
    }
}

impl ClassroomRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            docs: Collection::new(store, CLASSROOMS_FILE),
        }
    }

    pub(crate) fn collection(&self) -> &Collection<Vec<Classroom>> {
        &self.docs
    }

    pub fn list(&self) -> Vec<Classroom> {
        let mut all = self.docs.snapshot();
        ensure_default(&mut all);
        all
    }

    pub fn get(&self, id: &str) -> Option<Classroom> {
        self.list().into_iter().find(|c| c.id == id)
    }

    pub fn exists(&self, id: &str) -> bool {
        id == DEFAULT_CLASSROOM_ID || self.docs.read(|all| all.iter().any(|c| c.id == id))
    }

    pub fn create(&self, name: &str) -> RecordsResult<Classroom> {
        let classroom = Classroom {
            id: new_id(),
            name: name.to_string(),
        };
        let created = classroom.clone();
        self.docs.update(|all| {
            ensure_default(all);
            all.push(classroom);
        })?;
        tracing::info!(classroom = %created.id, name, "created classroom");
        Ok(created)
    }

    pub fn rename(&self, id: &str, name: &str) -> RecordsResult<()> {
        self.docs
            .try_update(|all| {
                ensure_default(all);
                all.iter_mut()
                    .find(|c| c.id == id)
                    .map(|c| c.name = name.to_string())
            })?
            .ok_or_else(|| RecordsError::ClassroomNotFound(id.to_string()))
    }

    /// Delete a classroom. Its learners are not touched here; see
    /// `LearningService::delete_classroom`.
    pub fn delete(&self, id: &str) -> RecordsResult<()> {
        if id == DEFAULT_CLASSROOM_ID {
            return Err(RecordsError::DefaultClassroomProtected);
        }
        self.docs
            .try_update(|all| {
                let before = all.len();
                all.retain(|c| c.id != id);
                (all.len() != before).then(|| ensure_default(all))
            })?
            .ok_or_else(|| RecordsError::ClassroomNotFound(id.to_string()))
    }

    pub fn reload(&self) {
        self.docs.reload();
    }
}
