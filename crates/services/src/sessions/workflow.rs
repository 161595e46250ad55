use std::sync::Arc;

use lingo_core::model::{LessonId, UserId};
use storage::repository::ProgressStore;

use super::quiz::QuizSession;
use crate::Clock;
use crate::course_service::CourseService;
use crate::error::SessionError;
use crate::lesson_service::LessonService;

/// Opens quiz sessions for lessons.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    lessons: Arc<LessonService>,
    courses: Arc<CourseService>,
    store: Arc<dyn ProgressStore>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<LessonService>,
        courses: Arc<CourseService>,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            clock,
            lessons,
            courses,
            store,
        }
    }

    /// Start a session for `lesson_id`, or for the active lesson when `None`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LessonNotFound` for an unknown lesson,
    /// `SessionError::NoActiveLesson` when nothing is left to resume, or
    /// `SessionError::Lesson` if loading fails.
    pub async fn start(
        &self,
        user: &UserId,
        lesson_id: Option<LessonId>,
    ) -> Result<QuizSession, SessionError> {
        let loaded = self
            .lessons
            .load_lesson(user, lesson_id)
            .await?
            .ok_or(match lesson_id {
                Some(id) => SessionError::LessonNotFound(id),
                None => SessionError::NoActiveLesson,
            })?;
        let subscribed = self
            .courses
            .subscription(user)
            .await?
            .is_some_and(|s| s.is_active);

        Ok(QuizSession::new(
            user.clone(),
            loaded,
            Arc::clone(&self.store),
            self.clock,
        )
        .with_subscription(subscribed))
    }
}
