use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChallengeId, CourseId, UserId};

/// Upper bound of the heart counter.
pub const MAX_HEARTS: u8 = 5;

/// Points granted by the store for every confirmed correct answer.
pub const POINTS_PER_CHALLENGE: u32 = 10;

pub const DEFAULT_USER_NAME: &str = "User";
pub const DEFAULT_USER_IMAGE: &str = "/mascot.svg";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("hearts must be between 0 and {MAX_HEARTS}, got {0}")]
    InvalidHearts(i64),
}

//
// ─── HEARTS ────────────────────────────────────────────────────────────────────
//

/// Remaining lives of a learner, always within `0..=MAX_HEARTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Hearts(u8);

impl Hearts {
    pub const FULL: Hearts = Hearts(MAX_HEARTS);
    pub const EMPTY: Hearts = Hearts(0);

    /// Validates a raw heart count.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidHearts` when the value is out of range.
    pub fn new(value: i64) -> Result<Self, ProgressError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_HEARTS)
            .map(Self)
            .ok_or(ProgressError::InvalidHearts(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn is_full(self) -> bool {
        self.0 >= MAX_HEARTS
    }

    /// One more heart, capped at `MAX_HEARTS`.
    #[must_use]
    pub fn gain(self) -> Self {
        Self((self.0 + 1).min(MAX_HEARTS))
    }

    /// One heart less, floored at zero.
    #[must_use]
    pub fn lose(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl Default for Hearts {
    fn default() -> Self {
        Self::FULL
    }
}

impl TryFrom<i64> for Hearts {
    type Error = ProgressError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hearts> for i64 {
    fn from(value: Hearts) -> Self {
        i64::from(value.0)
    }
}

impl std::fmt::Display for Hearts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── USER PROGRESS ─────────────────────────────────────────────────────────────
//

/// Per-learner counters that outlive any single lesson session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub user_id: UserId,
    pub user_name: String,
    pub user_image_src: String,
    pub active_course_id: Option<CourseId>,
    pub hearts: Hearts,
    pub points: u32,
}

impl UserProgress {
    /// Fresh progress: full hearts, no points, no active course.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            user_name: DEFAULT_USER_NAME.to_owned(),
            user_image_src: DEFAULT_USER_IMAGE.to_owned(),
            active_course_id: None,
            hearts: Hearts::FULL,
            points: 0,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.user_name = name;
        }
        self
    }

    #[must_use]
    pub fn with_active_course(mut self, course_id: CourseId) -> Self {
        self.active_course_id = Some(course_id);
        self
    }
}

/// One completion record of a learner for a challenge.
///
/// A challenge may carry several records; it only counts as completed when
/// every one of them is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub user_id: UserId,
    pub challenge_id: ChallengeId,
    pub completed: bool,
}

/// Leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub user_name: String,
    pub user_image_src: String,
    pub points: u32,
}

impl From<&UserProgress> for LeaderboardEntry {
    fn from(progress: &UserProgress) -> Self {
        Self {
            user_id: progress.user_id.clone(),
            user_name: progress.user_name.clone(),
            user_image_src: progress.user_image_src.clone(),
            points: progress.points,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
