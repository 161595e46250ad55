use lingo_core::model::{
    ChallengeId, ChallengeKind, ChallengeOption, ChallengeProgress, Course, CourseId, Hearts,
    Lesson, LessonId, OptionId, Unit, UnitId, UserId, UserProgress, UserSubscription,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn db<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Ok(Course {
        id: CourseId::new(i64_to_u64("course_id", row.try_get("id").map_err(ser)?)?),
        title: row.try_get("title").map_err(ser)?,
        image_src: row.try_get("image_src").map_err(ser)?,
    })
}

pub(crate) fn map_unit_row(row: &SqliteRow) -> Result<Unit, StorageError> {
    Ok(Unit {
        id: UnitId::new(i64_to_u64("unit_id", row.try_get("id").map_err(ser)?)?),
        course_id: CourseId::new(i64_to_u64(
            "course_id",
            row.try_get("course_id").map_err(ser)?,
        )?),
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        order: i64_to_u32("sort_order", row.try_get("sort_order").map_err(ser)?)?,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Ok(Lesson {
        id: LessonId::new(i64_to_u64("lesson_id", row.try_get("id").map_err(ser)?)?),
        unit_id: UnitId::new(i64_to_u64("unit_id", row.try_get("unit_id").map_err(ser)?)?),
        title: row.try_get("title").map_err(ser)?,
        order: i64_to_u32("sort_order", row.try_get("sort_order").map_err(ser)?)?,
    })
}

/// Columns of a challenge row without its options.
pub(crate) struct ChallengeRow {
    pub id: ChallengeId,
    pub lesson_id: LessonId,
    pub kind: ChallengeKind,
    pub question: String,
    pub order: u32,
}

pub(crate) fn map_challenge_row(row: &SqliteRow) -> Result<ChallengeRow, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Ok(ChallengeRow {
        id: ChallengeId::new(i64_to_u64("challenge_id", row.try_get("id").map_err(ser)?)?),
        lesson_id: LessonId::new(i64_to_u64(
            "lesson_id",
            row.try_get("lesson_id").map_err(ser)?,
        )?),
        kind: ChallengeKind::parse(&kind).map_err(ser)?,
        question: row.try_get("question").map_err(ser)?,
        order: i64_to_u32("sort_order", row.try_get("sort_order").map_err(ser)?)?,
    })
}

pub(crate) fn map_option_row(row: &SqliteRow) -> Result<ChallengeOption, StorageError> {
    let mut option = ChallengeOption::new(
        OptionId::new(i64_to_u64("option_id", row.try_get("id").map_err(ser)?)?),
        ChallengeId::new(i64_to_u64(
            "challenge_id",
            row.try_get("challenge_id").map_err(ser)?,
        )?),
        row.try_get::<String, _>("text").map_err(ser)?,
        row.try_get::<bool, _>("correct").map_err(ser)?,
    );
    option.image_src = row.try_get("image_src").map_err(ser)?;
    option.audio_src = row.try_get("audio_src").map_err(ser)?;
    Ok(option)
}

pub(crate) fn map_user_progress_row(row: &SqliteRow) -> Result<UserProgress, StorageError> {
    let user_id = UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?;
    let active_course_id = row
        .try_get::<Option<i64>, _>("active_course_id")
        .map_err(ser)?
        .map(|v| i64_to_u64("active_course_id", v).map(CourseId::new))
        .transpose()?;
    let points: i64 = row.try_get("points").map_err(ser)?;

    Ok(UserProgress {
        user_id,
        user_name: row.try_get("user_name").map_err(ser)?,
        user_image_src: row.try_get("user_image_src").map_err(ser)?,
        active_course_id,
        hearts: Hearts::new(row.try_get::<i64, _>("hearts").map_err(ser)?).map_err(ser)?,
        points: i64_to_u32("points", points)?,
    })
}

pub(crate) fn map_challenge_progress_row(
    row: &SqliteRow,
) -> Result<ChallengeProgress, StorageError> {
    Ok(ChallengeProgress {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?,
        challenge_id: ChallengeId::new(i64_to_u64(
            "challenge_id",
            row.try_get("challenge_id").map_err(ser)?,
        )?),
        completed: row.try_get("completed").map_err(ser)?,
    })
}

pub(crate) fn map_subscription_row(row: &SqliteRow) -> Result<UserSubscription, StorageError> {
    Ok(UserSubscription {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?,
        customer_id: row.try_get("customer_id").map_err(ser)?,
        subscription_id: row.try_get("subscription_id").map_err(ser)?,
        price_id: row.try_get("price_id").map_err(ser)?,
        current_period_end: row.try_get("current_period_end").map_err(ser)?,
    })
}

/// Maps write failures, reporting constraint violations as `Conflict`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(d) if d.is_foreign_key_violation() || d.is_unique_violation() => {
            StorageError::Conflict
        }
        _ => StorageError::Connection(e.to_string()),
    }
}
