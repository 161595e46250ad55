mod challenge;
mod course;
mod ids;
mod progress;
mod subscription;

pub use ids::{ChallengeId, CourseId, LessonId, OptionId, ParseIdError, UnitId, UserId};

pub use challenge::{ASSIST_TITLE, Challenge, ChallengeError, ChallengeKind, ChallengeOption};
pub use course::{Course, CourseOutline, Lesson, Unit};
pub use progress::{
    ChallengeProgress, DEFAULT_USER_IMAGE, DEFAULT_USER_NAME, Hearts, LeaderboardEntry,
    MAX_HEARTS, POINTS_PER_CHALLENGE, ProgressError, UserProgress,
};
pub use subscription::UserSubscription;
