#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

mod rules;

pub use repository::{
    ChallengeProgressRepository, CorrectOutcome, CourseRepository, InMemoryRepository,
    IncorrectOutcome, ProgressStore, ProgressWriteError, Storage, StorageError,
    SubscriptionRepository, UserProgressRepository, WaiveReason,
};
