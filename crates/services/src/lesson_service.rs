use std::sync::Arc;

use serde::Serialize;

use lingo_core::model::{Challenge, Hearts, Lesson, LessonId, UserId, UserProgress};
use lingo_core::progress::{self, ChallengeRecords};
use storage::repository::{ChallengeProgressRepository, CourseRepository, UserProgressRepository};

use crate::error::LessonError;
use crate::records::{annotated_challenges, challenge_records, course_records};

/// A lesson ready to be played: ordered challenges with their completion
/// flags plus the learner's snapshot taken at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedLesson {
    pub lesson: Lesson,
    pub challenges: Vec<Challenge>,
    pub hearts: Hearts,
    /// Share of this lesson's challenges already completed.
    pub percentage: u8,
}

impl LoadedLesson {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        !self.challenges.is_empty() && self.challenges.iter().all(Challenge::completed)
    }
}

/// Loads lessons for play and reports lesson-level progress.
#[derive(Clone)]
pub struct LessonService {
    courses: Arc<dyn CourseRepository>,
    user_progress: Arc<dyn UserProgressRepository>,
    challenge_progress: Arc<dyn ChallengeProgressRepository>,
}

impl LessonService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        user_progress: Arc<dyn UserProgressRepository>,
        challenge_progress: Arc<dyn ChallengeProgressRepository>,
    ) -> Self {
        Self {
            courses,
            user_progress,
            challenge_progress,
        }
    }

    /// Loads `lesson_id`, or the learner's active lesson when `None`.
    ///
    /// Returns `Ok(None)` when the lesson does not exist or, without an
    /// explicit id, when there is no active lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::NoUserProgress` if the learner has not picked a
    /// course yet, or `LessonError::Storage` on repository failures.
    pub async fn load_lesson(
        &self,
        user: &UserId,
        lesson_id: Option<LessonId>,
    ) -> Result<Option<LoadedLesson>, LessonError> {
        let learner = self
            .user_progress
            .get_user_progress(user)
            .await?
            .ok_or_else(|| LessonError::NoUserProgress(user.clone()))?;

        let lesson = match lesson_id {
            Some(id) => self.courses.get_lesson(id).await?,
            None => self.active_lesson(user, &learner).await?,
        };
        let Some(lesson) = lesson else {
            return Ok(None);
        };

        let challenges = annotated_challenges(
            self.courses.as_ref(),
            self.challenge_progress.as_ref(),
            user,
            &lesson,
        )
        .await?;
        let completed = challenges.iter().filter(|c| c.completed()).count();

        tracing::debug!(
            user = %user,
            lesson = %lesson.id,
            challenges = challenges.len(),
            completed,
            "lesson loaded"
        );

        Ok(Some(LoadedLesson {
            percentage: progress::percentage(completed, challenges.len()),
            lesson,
            challenges,
            hearts: learner.hearts,
        }))
    }

    /// Completion percentage of the active lesson; 0 when there is none.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::Storage` on repository failures.
    pub async fn lesson_percentage(&self, user: &UserId) -> Result<u8, LessonError> {
        let Some(learner) = self.user_progress.get_user_progress(user).await? else {
            return Ok(0);
        };
        let Some(lesson) = self.active_lesson(user, &learner).await? else {
            return Ok(0);
        };
        let challenges = self.courses.challenges_for_lesson(lesson.id).await?;
        let records: Vec<ChallengeRecords> =
            challenge_records(self.challenge_progress.as_ref(), user, &challenges).await?;
        Ok(progress::lesson_percentage(&records))
    }

    async fn active_lesson(
        &self,
        user: &UserId,
        learner: &UserProgress,
    ) -> Result<Option<Lesson>, LessonError> {
        let Some(course_id) = learner.active_course_id else {
            return Ok(None);
        };
        let units = course_records(
            self.courses.as_ref(),
            self.challenge_progress.as_ref(),
            user,
            course_id,
        )
        .await?;
        Ok(progress::first_uncompleted_lesson(&units).map(|l| l.lesson.clone()))
    }
}
