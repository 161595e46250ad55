//! Completion derivations over already-fetched progress records.
//!
//! Everything here is pure: the same records always produce the same flags,
//! whether they were just read from storage or accumulated during a session.

use serde::Serialize;

use crate::model::{ChallengeId, Lesson, Unit};

/// A challenge id with the `completed` flags of every progress record the
/// learner has for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRecords {
    pub challenge_id: ChallengeId,
    pub completions: Vec<bool>,
}

impl ChallengeRecords {
    #[must_use]
    pub fn new(challenge_id: ChallengeId, completions: Vec<bool>) -> Self {
        Self {
            challenge_id,
            completions,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        challenge_completed(&self.completions)
    }
}

/// A lesson and the progress records of its challenges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRecords {
    pub lesson: Lesson,
    pub challenges: Vec<ChallengeRecords>,
}

/// A unit and its lessons with their progress records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRecords {
    pub unit: Unit,
    pub lessons: Vec<LessonRecords>,
}

/// Lesson with its derived completion flag, as shown on the learn page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonOverview {
    pub lesson: Lesson,
    pub completed: bool,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitOverview {
    pub unit: Unit,
    pub lessons: Vec<LessonOverview>,
}

/// A challenge is completed iff it has at least one record and all of them
/// are completed.
#[must_use]
pub fn challenge_completed(completions: &[bool]) -> bool {
    !completions.is_empty() && completions.iter().all(|c| *c)
}

/// A challenge still needs work when its records are missing or any of them
/// is not completed.
#[must_use]
pub fn challenge_pending(completions: &[bool]) -> bool {
    !challenge_completed(completions)
}

/// `round(100 * completed / total)`, or 0 for an empty lesson.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    (completed as f64 / total as f64 * 100.0).round() as u8
}

#[must_use]
pub fn lesson_percentage(challenges: &[ChallengeRecords]) -> u8 {
    let completed = challenges.iter().filter(|c| c.is_completed()).count();
    percentage(completed, challenges.len())
}

/// A lesson without challenges is never completed.
#[must_use]
pub fn lesson_completed(challenges: &[ChallengeRecords]) -> bool {
    !challenges.is_empty() && challenges.iter().all(ChallengeRecords::is_completed)
}

/// Annotates every lesson with its completion flag and percentage.
#[must_use]
pub fn overview(units: &[UnitRecords]) -> Vec<UnitOverview> {
    units
        .iter()
        .map(|u| UnitOverview {
            unit: u.unit.clone(),
            lessons: u
                .lessons
                .iter()
                .map(|l| LessonOverview {
                    lesson: l.lesson.clone(),
                    completed: lesson_completed(&l.challenges),
                    percentage: lesson_percentage(&l.challenges),
                })
                .collect(),
        })
        .collect()
}

/// First lesson, in unit order then lesson order, that still contains a
/// pending challenge. Lessons without challenges are skipped.
#[must_use]
pub fn first_uncompleted_lesson(units: &[UnitRecords]) -> Option<&LessonRecords> {
    let mut ordered: Vec<&UnitRecords> = units.iter().collect();
    ordered.sort_by_key(|u| (u.unit.order, u.unit.id));

    ordered.into_iter().find_map(|unit| {
        let mut lessons: Vec<&LessonRecords> = unit.lessons.iter().collect();
        lessons.sort_by_key(|l| (l.lesson.order, l.lesson.id));
        lessons.into_iter().find(|lesson| {
            lesson
                .challenges
                .iter()
                .any(|c| challenge_pending(&c.completions))
        })
    })
}
