use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingo_core::model::{
    Challenge, ChallengeId, ChallengeProgress, Course, CourseId, Lesson, LessonId, Unit, UnitId,
    UserId, UserProgress, UserSubscription,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::rules::{CorrectPlan, IncorrectPlan, plan_correct, plan_incorrect};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Failure of a heart-affecting write.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressWriteError {
    /// The learner has no hearts left and nothing waives the loss.
    #[error("not enough hearts")]
    InsufficientHearts,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// How a correct answer was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectOutcome {
    /// First completion: a completed record was inserted and points granted.
    Completed,
    /// Replay of an already recorded challenge: one heart restored and points granted.
    Practiced,
}

/// Why a wrong answer did not cost a heart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiveReason {
    Practice,
    Subscription,
}

/// How a wrong answer was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncorrectOutcome {
    Deducted,
    Waived(WaiveReason),
}

impl IncorrectOutcome {
    #[must_use]
    pub fn heart_deducted(self) -> bool {
        matches!(self, IncorrectOutcome::Deducted)
    }
}

/// Course catalogue: courses, units, lessons and challenges with options.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the unit cannot be stored.
    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Persist a challenge and replace its options.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the challenge cannot be stored.
    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Units of a course ordered by their `order` key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn units_for_course(&self, course_id: CourseId) -> Result<Vec<Unit>, StorageError>;

    /// Lessons of a unit ordered by their `order` key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn lessons_for_unit(&self, unit_id: UnitId) -> Result<Vec<Lesson>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Challenges of a lesson ordered by `order`, options attached,
    /// `completed` left false.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn challenges_for_lesson(&self, lesson_id: LessonId)
    -> Result<Vec<Challenge>, StorageError>;
}

#[async_trait]
pub trait UserProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_user_progress(&self, user: &UserId) -> Result<Option<UserProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the progress row cannot be stored.
    async fn upsert_user_progress(&self, progress: &UserProgress) -> Result<(), StorageError>;

    /// Learners ordered by points, highest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn top_users(&self, limit: u32) -> Result<Vec<UserProgress>, StorageError>;
}

#[async_trait]
pub trait ChallengeProgressRepository: Send + Sync {
    /// All records of a learner for the given challenges.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn progress_for_challenges(
        &self,
        user: &UserId,
        challenge_ids: &[ChallengeId],
    ) -> Result<Vec<ChallengeProgress>, StorageError>;

    /// Append a raw record. The scoring flow goes through `ProgressStore`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn insert_progress(&self, record: &ChallengeProgress) -> Result<(), StorageError>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_subscription(&self, user: &UserId)
    -> Result<Option<UserSubscription>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the subscription cannot be stored.
    async fn upsert_subscription(&self, subscription: &UserSubscription)
    -> Result<(), StorageError>;
}

/// Heart and point writes issued by the scoring engine.
///
/// Implementations are the authority on hearts: they never drive hearts
/// below zero, even under concurrent calls for the same learner.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Record a correct answer for `challenge`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressWriteError::InsufficientHearts` when the learner is at
    /// zero hearts on a first attempt without an active subscription.
    async fn record_correct(
        &self,
        user: &UserId,
        challenge: ChallengeId,
        now: DateTime<Utc>,
    ) -> Result<CorrectOutcome, ProgressWriteError>;

    /// Record a wrong answer for `challenge`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressWriteError::InsufficientHearts` when a heart is due
    /// but the learner has none left.
    async fn record_incorrect(
        &self,
        user: &UserId,
        challenge: ChallengeId,
        now: DateTime<Utc>,
    ) -> Result<IncorrectOutcome, ProgressWriteError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    courses: HashMap<CourseId, Course>,
    units: HashMap<UnitId, Unit>,
    lessons: HashMap<LessonId, Lesson>,
    challenges: HashMap<ChallengeId, Challenge>,
    user_progress: HashMap<UserId, UserProgress>,
    challenge_progress: Vec<ChallengeProgress>,
    subscriptions: HashMap<UserId, UserSubscription>,
}

impl InMemoryState {
    fn has_record(&self, user: &UserId, challenge: ChallengeId) -> bool {
        self.challenge_progress
            .iter()
            .any(|p| &p.user_id == user && p.challenge_id == challenge)
    }

    fn subscribed(&self, user: &UserId, now: DateTime<Utc>) -> bool {
        self.subscriptions
            .get(user)
            .is_some_and(|s| s.is_active(now))
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// A single lock guards every table so progress writes are atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        self.lock()?.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.courses.contains_key(&unit.course_id) {
            return Err(StorageError::Conflict);
        }
        guard.units.insert(unit.id, unit.clone());
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.units.contains_key(&lesson.unit_id) {
            return Err(StorageError::Conflict);
        }
        guard.lessons.insert(lesson.id, lesson.clone());
        Ok(())
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&challenge.lesson_id()) {
            return Err(StorageError::Conflict);
        }
        guard
            .challenges
            .insert(challenge.id(), challenge.clone().with_completed(false));
        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let mut courses: Vec<Course> = self.lock()?.courses.values().cloned().collect();
        courses.sort_by_key(|c| c.id);
        Ok(courses)
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.lock()?.courses.get(&id).cloned())
    }

    async fn units_for_course(&self, course_id: CourseId) -> Result<Vec<Unit>, StorageError> {
        let mut units: Vec<Unit> = self
            .lock()?
            .units
            .values()
            .filter(|u| u.course_id == course_id)
            .cloned()
            .collect();
        units.sort_by_key(|u| (u.order, u.id));
        Ok(units)
    }

    async fn lessons_for_unit(&self, unit_id: UnitId) -> Result<Vec<Lesson>, StorageError> {
        let mut lessons: Vec<Lesson> = self
            .lock()?
            .lessons
            .values()
            .filter(|l| l.unit_id == unit_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| (l.order, l.id));
        Ok(lessons)
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        Ok(self.lock()?.lessons.get(&id).cloned())
    }

    async fn challenges_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<Challenge>, StorageError> {
        let mut challenges: Vec<Challenge> = self
            .lock()?
            .challenges
            .values()
            .filter(|c| c.lesson_id() == lesson_id)
            .cloned()
            .collect();
        challenges.sort_by_key(|c| (c.order(), c.id()));
        Ok(challenges)
    }
}

#[async_trait]
impl UserProgressRepository for InMemoryRepository {
    async fn get_user_progress(&self, user: &UserId) -> Result<Option<UserProgress>, StorageError> {
        Ok(self.lock()?.user_progress.get(user).cloned())
    }

    async fn upsert_user_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        self.lock()?
            .user_progress
            .insert(progress.user_id.clone(), progress.clone());
        Ok(())
    }

    async fn top_users(&self, limit: u32) -> Result<Vec<UserProgress>, StorageError> {
        let mut users: Vec<UserProgress> = self.lock()?.user_progress.values().cloned().collect();
        users.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.user_id.cmp(&b.user_id)));
        users.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(users)
    }
}

#[async_trait]
impl ChallengeProgressRepository for InMemoryRepository {
    async fn progress_for_challenges(
        &self,
        user: &UserId,
        challenge_ids: &[ChallengeId],
    ) -> Result<Vec<ChallengeProgress>, StorageError> {
        Ok(self
            .lock()?
            .challenge_progress
            .iter()
            .filter(|p| &p.user_id == user && challenge_ids.contains(&p.challenge_id))
            .cloned()
            .collect())
    }

    async fn insert_progress(&self, record: &ChallengeProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.challenges.contains_key(&record.challenge_id) {
            return Err(StorageError::Conflict);
        }
        guard.challenge_progress.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryRepository {
    async fn get_subscription(
        &self,
        user: &UserId,
    ) -> Result<Option<UserSubscription>, StorageError> {
        Ok(self.lock()?.subscriptions.get(user).cloned())
    }

    async fn upsert_subscription(
        &self,
        subscription: &UserSubscription,
    ) -> Result<(), StorageError> {
        self.lock()?
            .subscriptions
            .insert(subscription.user_id.clone(), subscription.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for InMemoryRepository {
    async fn record_correct(
        &self,
        user: &UserId,
        challenge: ChallengeId,
        now: DateTime<Utc>,
    ) -> Result<CorrectOutcome, ProgressWriteError> {
        let mut guard = self.lock()?;
        if !guard.challenges.contains_key(&challenge) {
            return Err(StorageError::NotFound.into());
        }
        let has_record = guard.has_record(user, challenge);
        let subscribed = guard.subscribed(user, now);
        let hearts = guard
            .user_progress
            .get(user)
            .ok_or(StorageError::NotFound)?
            .hearts;

        let outcome = match plan_correct(hearts, has_record, subscribed) {
            CorrectPlan::Refuse => return Err(ProgressWriteError::InsufficientHearts),
            CorrectPlan::Apply(outcome) => outcome,
        };

        match outcome {
            CorrectOutcome::Practiced => {
                for record in guard
                    .challenge_progress
                    .iter_mut()
                    .filter(|p| &p.user_id == user && p.challenge_id == challenge)
                {
                    record.completed = true;
                }
            }
            CorrectOutcome::Completed => guard.challenge_progress.push(ChallengeProgress {
                user_id: user.clone(),
                challenge_id: challenge,
                completed: true,
            }),
        }

        let progress = guard
            .user_progress
            .get_mut(user)
            .ok_or(StorageError::NotFound)?;
        if outcome == CorrectOutcome::Practiced {
            progress.hearts = progress.hearts.gain();
        }
        progress.points = progress
            .points
            .saturating_add(lingo_core::model::POINTS_PER_CHALLENGE);
        Ok(outcome)
    }

    async fn record_incorrect(
        &self,
        user: &UserId,
        challenge: ChallengeId,
        now: DateTime<Utc>,
    ) -> Result<IncorrectOutcome, ProgressWriteError> {
        let mut guard = self.lock()?;
        if !guard.challenges.contains_key(&challenge) {
            return Err(StorageError::NotFound.into());
        }
        let has_record = guard.has_record(user, challenge);
        let subscribed = guard.subscribed(user, now);
        let progress = guard
            .user_progress
            .get_mut(user)
            .ok_or(StorageError::NotFound)?;

        match plan_incorrect(progress.hearts, has_record, subscribed) {
            IncorrectPlan::Refuse => Err(ProgressWriteError::InsufficientHearts),
            IncorrectPlan::Waive(reason) => Ok(reason.into()),
            IncorrectPlan::Deduct => {
                progress.hearts = progress.hearts.lose();
                Ok(IncorrectOutcome::Deducted)
            }
        }
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub user_progress: Arc<dyn UserProgressRepository>,
    pub challenge_progress: Arc<dyn ChallengeProgressRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub progress_store: Arc<dyn ProgressStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Share one repository value across every handle.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CourseRepository
            + UserProgressRepository
            + ChallengeProgressRepository
            + SubscriptionRepository
            + ProgressStore
            + Clone
            + 'static,
    {
        Self {
            courses: Arc::new(repo.clone()),
            user_progress: Arc::new(repo.clone()),
            challenge_progress: Arc::new(repo.clone()),
            subscriptions: Arc::new(repo.clone()),
            progress_store: Arc::new(repo),
        }
    }
}
