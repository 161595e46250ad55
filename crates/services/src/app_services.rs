use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::course_service::CourseService;
use crate::error::AppServicesError;
use crate::lesson_service::LessonService;
use crate::sessions::QuizService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    courses: Arc<CourseService>,
    lessons: Arc<LessonService>,
    quizzes: Arc<QuizService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services backed by an in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let courses = Arc::new(CourseService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.user_progress),
            Arc::clone(&storage.challenge_progress),
            Arc::clone(&storage.subscriptions),
        ));
        let lessons = Arc::new(LessonService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.user_progress),
            Arc::clone(&storage.challenge_progress),
        ));
        let quizzes = Arc::new(QuizService::new(
            clock,
            Arc::clone(&lessons),
            Arc::clone(&courses),
            Arc::clone(&storage.progress_store),
        ));

        Self {
            courses,
            lessons,
            quizzes,
        }
    }

    #[must_use]
    pub fn courses(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }
}
