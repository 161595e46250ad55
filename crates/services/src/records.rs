//! Loads catalogue rows together with a learner's progress records.

use std::collections::HashMap;

use lingo_core::model::{Challenge, ChallengeId, CourseId, Lesson, UserId};
use lingo_core::progress::{ChallengeRecords, LessonRecords, UnitRecords};
use storage::repository::{ChallengeProgressRepository, CourseRepository, StorageError};

/// Progress records of `user` grouped per challenge, one entry per challenge
/// in the given order.
pub(crate) async fn challenge_records(
    progress: &dyn ChallengeProgressRepository,
    user: &UserId,
    challenges: &[Challenge],
) -> Result<Vec<ChallengeRecords>, StorageError> {
    let ids: Vec<ChallengeId> = challenges.iter().map(Challenge::id).collect();
    let mut grouped: HashMap<ChallengeId, Vec<bool>> = HashMap::new();
    for record in progress.progress_for_challenges(user, &ids).await? {
        grouped
            .entry(record.challenge_id)
            .or_default()
            .push(record.completed);
    }

    Ok(ids
        .into_iter()
        .map(|id| ChallengeRecords::new(id, grouped.remove(&id).unwrap_or_default()))
        .collect())
}

/// Challenges of `lesson` with `completed` derived from the learner's records.
pub(crate) async fn annotated_challenges(
    courses: &dyn CourseRepository,
    progress: &dyn ChallengeProgressRepository,
    user: &UserId,
    lesson: &Lesson,
) -> Result<Vec<Challenge>, StorageError> {
    let challenges = courses.challenges_for_lesson(lesson.id).await?;
    let records = challenge_records(progress, user, &challenges).await?;
    Ok(challenges
        .into_iter()
        .zip(records)
        .map(|(challenge, records)| challenge.with_completed(records.is_completed()))
        .collect())
}

/// Every unit of a course with its lessons and their challenge records.
pub(crate) async fn course_records(
    courses: &dyn CourseRepository,
    progress: &dyn ChallengeProgressRepository,
    user: &UserId,
    course_id: CourseId,
) -> Result<Vec<UnitRecords>, StorageError> {
    let mut units = Vec::new();
    for unit in courses.units_for_course(course_id).await? {
        let mut lessons = Vec::new();
        for lesson in courses.lessons_for_unit(unit.id).await? {
            let challenges = courses.challenges_for_lesson(lesson.id).await?;
            let records = challenge_records(progress, user, &challenges).await?;
            lessons.push(LessonRecords {
                lesson,
                challenges: records,
            });
        }
        units.push(UnitRecords { unit, lessons });
    }
    Ok(units)
}
