use std::sync::Arc;

use serde::Serialize;

use lingo_core::model::{
    Course, CourseId, CourseOutline, LeaderboardEntry, Lesson, UserId, UserProgress,
    UserSubscription,
};
use lingo_core::progress::{self, UnitOverview};
use storage::repository::{
    ChallengeProgressRepository, CourseRepository, SubscriptionRepository,
    UserProgressRepository,
};

use crate::Clock;
use crate::error::LessonError;
use crate::records::course_records;

/// Default leaderboard size.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Where the learner stands in their active course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    /// First lesson that still has pending challenges; `None` once the
    /// course is finished.
    pub active_lesson: Option<Lesson>,
}

/// Subscription with its activity evaluated at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionStatus {
    pub subscription: UserSubscription,
    pub is_active: bool,
}

/// Read-side course queries and active-course selection.
#[derive(Clone)]
pub struct CourseService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    user_progress: Arc<dyn UserProgressRepository>,
    challenge_progress: Arc<dyn ChallengeProgressRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl CourseService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        user_progress: Arc<dyn UserProgressRepository>,
        challenge_progress: Arc<dyn ChallengeProgressRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            user_progress,
            challenge_progress,
            subscriptions,
        }
    }

    /// # Errors
    ///
    /// Returns `LessonError::Storage` on repository failures.
    pub async fn courses(&self) -> Result<Vec<Course>, LessonError> {
        Ok(self.courses.list_courses().await?)
    }

    /// A course with its units and lessons in display order.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::Storage` on repository failures.
    pub async fn course(&self, course_id: CourseId) -> Result<Option<CourseOutline>, LessonError> {
        let Some(course) = self.courses.get_course(course_id).await? else {
            return Ok(None);
        };
        let mut units = Vec::new();
        for unit in self.courses.units_for_course(course_id).await? {
            let lessons = self.courses.lessons_for_unit(unit.id).await?;
            units.push((unit, lessons));
        }
        Ok(Some(CourseOutline::new(course, units)))
    }

    /// # Errors
    ///
    /// Returns `LessonError::Storage` on repository failures.
    pub async fn user_progress(&self, user: &UserId) -> Result<Option<UserProgress>, LessonError> {
        Ok(self.user_progress.get_user_progress(user).await?)
    }

    /// Makes `course_id` the learner's active course, creating their progress
    /// row with full hearts and no points on first use.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::CourseNotFound` for an unknown course.
    pub async fn select_active_course(
        &self,
        user: &UserId,
        user_name: Option<&str>,
        course_id: CourseId,
    ) -> Result<UserProgress, LessonError> {
        if self.courses.get_course(course_id).await?.is_none() {
            return Err(LessonError::CourseNotFound(course_id));
        }

        let progress = match self.user_progress.get_user_progress(user).await? {
            Some(existing) => existing.with_active_course(course_id),
            None => UserProgress::new(user.clone())
                .with_name(user_name.unwrap_or_default())
                .with_active_course(course_id),
        };
        self.user_progress.upsert_user_progress(&progress).await?;
        tracing::info!(user = %user, course = %course_id, "active course selected");
        Ok(progress)
    }

    /// Units of the active course with a completion flag per lesson. Empty
    /// when the learner has no active course.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::Storage` on repository failures.
    pub async fn units(&self, user: &UserId) -> Result<Vec<UnitOverview>, LessonError> {
        let Some(course_id) = self.active_course(user).await? else {
            return Ok(Vec::new());
        };
        let units = course_records(
            self.courses.as_ref(),
            self.challenge_progress.as_ref(),
            user,
            course_id,
        )
        .await?;
        Ok(progress::overview(&units))
    }

    /// Active lesson of the learner's active course; `None` without an
    /// active course.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::Storage` on repository failures.
    pub async fn course_progress(
        &self,
        user: &UserId,
    ) -> Result<Option<CourseProgress>, LessonError> {
        let Some(course_id) = self.active_course(user).await? else {
            return Ok(None);
        };
        let units = course_records(
            self.courses.as_ref(),
            self.challenge_progress.as_ref(),
            user,
            course_id,
        )
        .await?;
        Ok(Some(CourseProgress {
            active_lesson: progress::first_uncompleted_lesson(&units).map(|l| l.lesson.clone()),
        }))
    }

    /// # Errors
    ///
    /// Returns `LessonError::Storage` on repository failures.
    pub async fn subscription(
        &self,
        user: &UserId,
    ) -> Result<Option<SubscriptionStatus>, LessonError> {
        let now = self.clock.now();
        Ok(self
            .subscriptions
            .get_subscription(user)
            .await?
            .map(|subscription| SubscriptionStatus {
                is_active: subscription.is_active(now),
                subscription,
            }))
    }

    /// # Errors
    ///
    /// Returns `LessonError::Storage` on repository failures.
    pub async fn top_users(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, LessonError> {
        let users = self.user_progress.top_users(limit).await?;
        Ok(users.iter().map(LeaderboardEntry::from).collect())
    }

    async fn active_course(&self, user: &UserId) -> Result<Option<CourseId>, LessonError> {
        Ok(self
            .user_progress
            .get_user_progress(user)
            .await?
            .and_then(|p| p.active_course_id))
    }
}
