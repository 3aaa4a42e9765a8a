//! Session-end pipeline and cross-document operations.
//!
//! [`LearningService`] wires the repositories to the scoring engine, the
//! difficulty controller and the goal progress tracker. Operations touching
//! several documents take the per-path locks one document at a time, in the
//! order profiles, sessions, plans.

use serde::{Deserialize, Serialize};

use learnkeep_core::adaptive::{
    AdaptationSettings, Decision, DifficultyController, DEFAULT_RECENT_WINDOW,
};
use learnkeep_core::model::{clamp_difficulty, new_id, SessionRecord, DEFAULT_CLASSROOM_ID};
use learnkeep_core::progress::ObjectiveProgress;
use learnkeep_core::scoring::ScoreBreakdown;
use learnkeep_store::{DocumentStore, LoadOutcome, RestoreReport, SnapshotInfo};

use crate::classrooms::ClassroomRepository;
use crate::config::LearnkeepConfig;
use crate::error::{RecordsError, RecordsResult};
use crate::operators::OperatorRepository;
use crate::plans::PlanRepository;
use crate::preferences::PreferencesRepository;
use crate::profiles::ProfileRepository;
use crate::sessions::SessionRepository;
use crate::DATA_FILES;

/// Result of finishing a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub score: u8,
    pub breakdown: ScoreBreakdown,
    pub decision: Decision,
    /// The record as stored, with `difficulty_final` and `adapted` set.
    pub session: SessionRecord,
}

/// Repositories plus the algorithms that run over them.
#[derive(Debug)]
pub struct LearningService {
    store: DocumentStore,
    profiles: ProfileRepository,
    sessions: SessionRepository,
    plans: PlanRepository,
    classrooms: ClassroomRepository,
    operators: OperatorRepository,
    preferences: PreferencesRepository,
    controller: DifficultyController,
    recent_window: usize,
}

impl LearningService {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            profiles: ProfileRepository::new(store.clone()),
            sessions: SessionRepository::new(store.clone()),
            plans: PlanRepository::new(store.clone()),
            classrooms: ClassroomRepository::new(store.clone()),
            operators: OperatorRepository::new(store.clone()),
            preferences: PreferencesRepository::new(store.clone()),
            store,
            controller: DifficultyController::default(),
            recent_window: DEFAULT_RECENT_WINDOW,
        }
    }

    /// Open the data directory named by `config`.
    pub fn from_config(config: &LearnkeepConfig) -> RecordsResult<Self> {
        config.validate()?;
        let store = DocumentStore::open(&config.data_dir).with_retention(config.backup_retention);
        Ok(Self::new(store)
            .with_adaptation(config.adaptation_settings())
            .with_recent_window(config.recent_window))
    }

    pub fn with_adaptation(mut self, settings: AdaptationSettings) -> Self {
        self.controller = DifficultyController::new(settings);
        self
    }

    /// Number of sessions, including the finished one, fed to the controller.
    pub fn with_recent_window(mut self, window: usize) -> Self {
        self.recent_window = window.max(1);
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn profiles(&self) -> &ProfileRepository {
        &self.profiles
    }

    pub fn sessions(&self) -> &SessionRepository {
        &self.sessions
    }

    pub fn plans(&self) -> &PlanRepository {
        &self.plans
    }

    pub fn classrooms(&self) -> &ClassroomRepository {
        &self.classrooms
    }

    pub fn operators(&self) -> &OperatorRepository {
        &self.operators
    }

    pub fn preferences(&self) -> &PreferencesRepository {
        &self.preferences
    }

    /// Score, adapt and store a finished session.
    ///
    /// The score compares against the learner's earlier sessions of the same
    /// game. The controller sees the finished session plus up to
    /// `recent_window - 1` earlier ones, so the no-history rule never applies
    /// here. Anonymous sessions and sessions of unknown learners are stored
    /// without touching any profile.
    ///
    /// A session whose id is already stored is rejected with
    /// [`RecordsError::SessionAlreadyStored`] before any state changes.
    pub fn finish_session(&self, mut record: SessionRecord) -> RecordsResult<SessionOutcome> {
        if record.id.is_empty() {
            record.id = new_id();
        }
        record.difficulty_used = clamp_difficulty(record.difficulty_used as i64);
        record.difficulty_initial = clamp_difficulty(record.difficulty_initial as i64);

        let profiles_lock = self.profiles.lock();
        let _profiles_guard = profiles_lock.lock();

        if self.sessions.contains(&record.id) {
            return Err(RecordsError::SessionAlreadyStored(record.id));
        }

        let learner_id = record.learner_id.clone();
        let (history, recent) = match learner_id.as_deref() {
            Some(id) => {
                let history = self.sessions.history_for(id, &record.game_id, &record.id);
                let mut recent = vec![record.clone()];
                recent.extend(
                    self.sessions
                        .recent_for_game(id, &record.game_id, self.recent_window)
                        .into_iter()
                        .filter(|s| s.id != record.id)
                        .take(self.recent_window - 1),
                );
                (history, recent)
            }
            None => (Vec::new(), vec![record.clone()]),
        };

        let breakdown = ScoreBreakdown::compute(&record, &history);

        let mut profile = learner_id.as_deref().and_then(|id| self.profiles.get(id));
        if profile.is_none() {
            if let Some(id) = learner_id.as_deref() {
                tracing::warn!(
                    learner = id,
                    "session for unknown learner, storing without profile"
                );
            }
        }

        let decision = self.controller.evaluate(
            profile.as_mut(),
            &record.game_id,
            record.difficulty_used,
            &recent,
        );
        record.difficulty_final = decision.next_difficulty;
        record.adapted = decision.changed;

        if !self.sessions.append(record.clone())? {
            return Err(RecordsError::SessionAlreadyStored(record.id));
        }

        if let Some(mut profile) = profile {
            profile.points = profile.points.saturating_add(u64::from(breakdown.score));
            self.profiles.upsert(profile)?;
        }

        if record.plan_id.is_some() {
            self.recompute_progress()?;
        }

        tracing::info!(
            session = %record.id,
            learner = ?record.learner_id,
            game = %record.game_id,
            score = breakdown.score,
            reason = %decision.reason,
            next_difficulty = decision.next_difficulty,
            "session finished"
        );

        Ok(SessionOutcome {
            score: breakdown.score,
            breakdown,
            decision,
            session: record,
        })
    }

    /// Re-run the goal progress tracker over the full history and save.
    ///
    /// The sessions lock is held until the plans are saved, so no session
    /// appended meanwhile can be missed.
    pub fn recompute_progress(&self) -> RecordsResult<Vec<ObjectiveProgress>> {
        let sessions_lock = self.sessions.lock();
        let _sessions_guard = sessions_lock.lock();
        let sessions = self.sessions.all();
        self.plans.recompute(&sessions)
    }

    /// Remove a learner with their sessions and plans.
    ///
    /// Returns whether the profile existed.
    pub fn delete_learner(&self, id: &str) -> RecordsResult<bool> {
        let existed = self.profiles.delete(id)?;
        let sessions = self.sessions.delete_for_learner(id)?;
        let plans = self.plans.delete_for_learner(id)?;
        self.recompute_progress()?;
        tracing::info!(learner = id, existed, sessions, plans, "deleted learner");
        Ok(existed)
    }

    /// Bulk-append sessions and recompute progress. Returns how many were new.
    pub fn import_sessions(&self, records: Vec<SessionRecord>) -> RecordsResult<usize> {
        let added = self.sessions.import(records)?;
        if added > 0 {
            self.recompute_progress()?;
        }
        Ok(added)
    }

    /// Restore a snapshot, reload every cached document and recompute.
    pub fn restore_snapshot(&self, name: &str) -> RecordsResult<RestoreReport> {
        let report = self.store.restore(name);
        self.reload_all();
        if report.files_restored > 0 {
            self.recompute_progress()?;
        }
        Ok(report)
    }

    /// Take a snapshot of every data document.
    pub fn snapshot_now(&self) -> RecordsResult<Option<SnapshotInfo>> {
        let paths: Vec<_> = DATA_FILES
            .iter()
            .map(|name| self.store.path(name))
            .collect();
        Ok(self.store.snapshot_all(&paths)?)
    }

    /// Delete a classroom, moving its learners to the default classroom.
    pub fn delete_classroom(&self, id: &str) -> RecordsResult<usize> {
        if id == DEFAULT_CLASSROOM_ID {
            return Err(RecordsError::DefaultClassroomProtected);
        }
        if !self.classrooms.exists(id) {
            return Err(RecordsError::ClassroomNotFound(id.to_string()));
        }
        let moved = self.profiles.move_classroom(id, DEFAULT_CLASSROOM_ID)?;
        self.classrooms.delete(id)?;
        Ok(moved)
    }

    /// Move every learner of `from` into `to`. Returns how many moved.
    pub fn migrate_learners(&self, from: &str, to: &str) -> RecordsResult<usize> {
        if !self.classrooms.exists(to) {
            return Err(RecordsError::ClassroomNotFound(to.to_string()));
        }
        self.profiles.move_classroom(from, to)
    }

    /// Names of documents that were corrupt when loaded and have been reset.
    pub fn recovered_documents(&self) -> Vec<String> {
        let outcomes = [
            (self.profiles.collection().name(), self.profiles.collection().load_outcome()),
            (self.sessions.collection().name(), self.sessions.collection().load_outcome()),
            (self.plans.collection().name(), self.plans.collection().load_outcome()),
            (self.classrooms.collection().name(), self.classrooms.collection().load_outcome()),
            (self.operators.collection().name(), self.operators.collection().load_outcome()),
            (self.preferences.collection().name(), self.preferences.collection().load_outcome()),
        ];
        outcomes
            .into_iter()
            .filter(|(_, outcome)| matches!(outcome, LoadOutcome::Recovered { .. }))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn reload_all(&self) {
        self.profiles.reload();
        self.sessions.reload();
        self.plans.reload();
        self.classrooms.reload();
        self.operators.reload();
        self.preferences.reload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnkeep_core::adaptive::Reason;
    use learnkeep_core::model::{LearnerProfile, LearningPlan, Objective};

    fn service(dir: &std::path::Path) -> LearningService {
        LearningService::new(DocumentStore::open(dir))
    }

    fn strong_session(learner: &str, used: u8) -> SessionRecord {
        SessionRecord {
            difficulty_initial: used,
            difficulty_used: used,
            rounds_total: 10,
            rounds_completed: 10,
            attempts: 10,
            correct_total: 10,
            correct_first_attempt: 10,
            duration_ms: 40_000,
            ..SessionRecord::new(Some(learner), "memory")
        }
    }

    #[test]
    fn finish_session_scores_adapts_and_awards_points() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let mut ana = LearnerProfile::new("Ana");
        ana.assign_game("memory");
        svc.profiles().upsert(ana.clone()).unwrap();

        let outcome = svc.finish_session(strong_session(&ana.id, 2)).unwrap();
        assert!(outcome.decision.changed);
        assert_eq!(outcome.decision.next_difficulty, 3);
        assert_eq!(outcome.session.difficulty_final, 3);
        assert!(outcome.session.adapted);

        let stored = svc.profiles().get(&ana.id).unwrap();
        assert_eq!(stored.points, u64::from(outcome.score));
        assert_eq!(stored.difficulty["memory"].automatic_difficulty, 3);
        assert_eq!(stored.difficulty["memory"].cooldown_remaining, 2);
        assert_eq!(svc.sessions().len(), 1);

        // next session lands in the cooldown
        let outcome = svc.finish_session(strong_session(&ana.id, 3)).unwrap();
        assert_eq!(outcome.decision.reason, Reason::Cooldown);
        assert_eq!(svc.profiles().get(&ana.id).unwrap().difficulty["memory"].cooldown_remaining, 1);
    }

    #[test]
    fn anonymous_session_is_stored_without_profile() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let mut record = strong_session("x", 2);
        record.learner_id = None;
        let outcome = svc.finish_session(record).unwrap();
        assert_eq!(outcome.decision.reason, Reason::NoProfile);
        assert_eq!(outcome.session.difficulty_final, 2);
        assert_eq!(svc.sessions().len(), 1);
        assert!(svc.profiles().list().is_empty());
    }

    #[test]
    fn plan_sessions_trigger_recompute() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let ana = LearnerProfile::new("Ana");
        svc.profiles().upsert(ana.clone()).unwrap();
        let mut plan = LearningPlan::new(&ana.id, "Memory");
        let mut objective = Objective::new("Pairs", 15, 2);
        objective.id = "pairs".into();
        plan.objectives.push(objective);
        svc.plans().save_plan(plan.clone()).unwrap();

        for _ in 0..2 {
            let mut s = strong_session(&ana.id, 1);
            s.plan_id = Some(plan.id.clone());
            s.objective_id = Some("pairs".into());
            svc.finish_session(s).unwrap();
        }
        let objective = svc.plans().get(&plan.id).unwrap().objectives[0].clone();
        assert_eq!(objective.rounds_correct, 20);
        assert_eq!(objective.sessions_completed, 2);
        assert!(objective.completed);
    }

    #[test]
    fn delete_learner_removes_everything_and_recomputes() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let ana = LearnerProfile::new("Ana");
        let ben = LearnerProfile::new("Ben");
        svc.profiles().upsert(ana.clone()).unwrap();
        svc.profiles().upsert(ben.clone()).unwrap();
        svc.plans().save_plan(LearningPlan::new(&ana.id, "a")).unwrap();
        svc.finish_session(strong_session(&ana.id, 1)).unwrap();
        svc.finish_session(strong_session(&ben.id, 1)).unwrap();

        assert!(svc.delete_learner(&ana.id).unwrap());
        assert!(svc.profiles().get(&ana.id).is_none());
        assert!(svc.sessions().for_learner(&ana.id).is_empty());
        assert!(svc.plans().for_learner(&ana.id).is_empty());
        assert_eq!(svc.sessions().for_learner(&ben.id).len(), 1);
        assert!(!svc.delete_learner(&ana.id).unwrap());
    }

    #[test]
    fn delete_classroom_moves_members_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let room = svc.classrooms().create("Room A").unwrap();
        let mut ana = LearnerProfile::new("Ana");
        ana.classroom_id = room.id.clone();
        svc.profiles().upsert(ana.clone()).unwrap();

        assert_eq!(svc.delete_classroom(&room.id).unwrap(), 1);
        assert_eq!(svc.profiles().get(&ana.id).unwrap().classroom_id, DEFAULT_CLASSROOM_ID);
        assert!(!svc.classrooms().exists(&room.id));
        assert!(matches!(
            svc.delete_classroom(DEFAULT_CLASSROOM_ID),
            Err(RecordsError::DefaultClassroomProtected)
        ));
    }

    #[test]
    fn migrate_to_missing_classroom_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let ana = LearnerProfile::new("Ana");
        svc.profiles().upsert(ana.clone()).unwrap();

        assert!(matches!(
            svc.migrate_learners(DEFAULT_CLASSROOM_ID, "nowhere"),
            Err(RecordsError::ClassroomNotFound(_))
        ));
        assert_eq!(svc.profiles().get(&ana.id).unwrap().classroom_id, DEFAULT_CLASSROOM_ID);

        let room = svc.classrooms().create("Room B").unwrap();
        assert_eq!(svc.migrate_learners(DEFAULT_CLASSROOM_ID, &room.id).unwrap(), 1);
    }

    #[test]
    fn corrupt_documents_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(crate::PROFILES_FILE), "{{{").unwrap();
        let svc = service(dir.path());
        assert_eq!(svc.recovered_documents(), vec![crate::PROFILES_FILE.to_string()]);
    }
}
