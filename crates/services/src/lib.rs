#![forbid(unsafe_code)]

pub mod app_services;
pub mod course_service;
pub mod error;
pub mod lesson_service;
pub mod sessions;

mod records;

pub use lingo_core::Clock;

pub use app_services::AppServices;
pub use course_service::{
    CourseProgress, CourseService, DEFAULT_LEADERBOARD_LIMIT, SubscriptionStatus,
};
pub use error::{AppServicesError, LessonError, SessionError};
pub use lesson_service::{LessonService, LoadedLesson};
pub use sessions::{QuizService, QuizSession, QuizStep, QuizView};
