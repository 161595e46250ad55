use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, LessonId, UnitId};

/// A learning path, e.g. "XRP Basics".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub image_src: String,
}

/// An ordered chapter of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub course_id: CourseId,
    pub title: String,
    pub description: String,
    pub order: u32,
}

/// An ordered group of challenges within a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub unit_id: UnitId,
    pub title: String,
    pub order: u32,
}

/// A course with its units and their lessons, both sorted by `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseOutline {
    pub course: Course,
    pub units: Vec<(Unit, Vec<Lesson>)>,
}

impl CourseOutline {
    /// Builds an outline, sorting units and lessons by their `order` keys.
    #[must_use]
    pub fn new(course: Course, mut units: Vec<(Unit, Vec<Lesson>)>) -> Self {
        units.sort_by_key(|(unit, _)| (unit.order, unit.id));
        for (_, lessons) in &mut units {
            lessons.sort_by_key(|l| (l.order, l.id));
        }
        Self { course, units }
    }

    /// Number of lessons across all units.
    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.units.iter().map(|(_, lessons)| lessons.len()).sum()
    }
}
