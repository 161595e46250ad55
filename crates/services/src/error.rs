//! Shared error types for the services crate.

use thiserror::Error;

use lingo_core::model::{CourseId, LessonId, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CourseService` and `LessonService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonError {
    #[error("no progress recorded for user {0}")]
    NoUserProgress(UserId),
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while opening a quiz session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("lesson {0} not found")]
    LessonNotFound(LessonId),
    #[error("no active lesson to resume")]
    NoActiveLesson,
    #[error(transparent)]
    Lesson(#[from] LessonError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
