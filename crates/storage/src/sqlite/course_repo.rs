use std::collections::HashMap;

use lingo_core::model::{
    Challenge, ChallengeId, ChallengeOption, Course, CourseId, Lesson, LessonId, Unit, UnitId,
};

use super::SqliteRepository;
use super::mapping::{
    db, id_i64, map_challenge_row, map_course_row, map_lesson_row, map_option_row, map_unit_row,
    ser, write_err,
};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, image_src)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                image_src = excluded.image_src
            ",
        )
        .bind(id_i64("course_id", course.id.value())?)
        .bind(&course.title)
        .bind(&course.image_src)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO units (id, course_id, title, description, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                description = excluded.description,
                sort_order = excluded.sort_order
            ",
        )
        .bind(id_i64("unit_id", unit.id.value())?)
        .bind(id_i64("course_id", unit.course_id.value())?)
        .bind(&unit.title)
        .bind(&unit.description)
        .bind(i64::from(unit.order))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, unit_id, title, sort_order)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                unit_id = excluded.unit_id,
                title = excluded.title,
                sort_order = excluded.sort_order
            ",
        )
        .bind(id_i64("lesson_id", lesson.id.value())?)
        .bind(id_i64("unit_id", lesson.unit_id.value())?)
        .bind(&lesson.title)
        .bind(i64::from(lesson.order))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        let challenge_id = id_i64("challenge_id", challenge.id().value())?;
        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query(
            r"
            INSERT INTO challenges (id, lesson_id, kind, question, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                lesson_id = excluded.lesson_id,
                kind = excluded.kind,
                question = excluded.question,
                sort_order = excluded.sort_order
            ",
        )
        .bind(challenge_id)
        .bind(id_i64("lesson_id", challenge.lesson_id().value())?)
        .bind(challenge.kind().as_str())
        .bind(challenge.question())
        .bind(i64::from(challenge.order()))
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        sqlx::query("DELETE FROM challenge_options WHERE challenge_id = ?1")
            .bind(challenge_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        for option in challenge.options() {
            sqlx::query(
                r"
                INSERT INTO challenge_options (id, challenge_id, text, correct, image_src, audio_src)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(id_i64("option_id", option.id.value())?)
            .bind(challenge_id)
            .bind(&option.text)
            .bind(option.correct)
            .bind(option.image_src.as_deref())
            .bind(option.audio_src.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query("SELECT id, title, image_src FROM courses ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(map_course_row).collect()
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query("SELECT id, title, image_src FROM courses WHERE id = ?1")
            .bind(id_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.as_ref().map(map_course_row).transpose()
    }

    async fn units_for_course(&self, course_id: CourseId) -> Result<Vec<Unit>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, description, sort_order
            FROM units
            WHERE course_id = ?1
            ORDER BY sort_order ASC, id ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        rows.iter().map(map_unit_row).collect()
    }

    async fn lessons_for_unit(&self, unit_id: UnitId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, unit_id, title, sort_order
            FROM lessons
            WHERE unit_id = ?1
            ORDER BY sort_order ASC, id ASC
            ",
        )
        .bind(id_i64("unit_id", unit_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        rows.iter().map(map_lesson_row).collect()
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query("SELECT id, unit_id, title, sort_order FROM lessons WHERE id = ?1")
            .bind(id_i64("lesson_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn challenges_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<Challenge>, StorageError> {
        let lesson = id_i64("lesson_id", lesson_id.value())?;

        let challenge_rows = sqlx::query(
            r"
            SELECT id, lesson_id, kind, question, sort_order
            FROM challenges
            WHERE lesson_id = ?1
            ORDER BY sort_order ASC, id ASC
            ",
        )
        .bind(lesson)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let option_rows = sqlx::query(
            r"
            SELECT o.id, o.challenge_id, o.text, o.correct, o.image_src, o.audio_src
            FROM challenge_options o
            JOIN challenges c ON c.id = o.challenge_id
            WHERE c.lesson_id = ?1
            ORDER BY o.id ASC
            ",
        )
        .bind(lesson)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut options: HashMap<ChallengeId, Vec<ChallengeOption>> = HashMap::new();
        for row in &option_rows {
            let option = map_option_row(row)?;
            options.entry(option.challenge_id).or_default().push(option);
        }

        let mut challenges = Vec::with_capacity(challenge_rows.len());
        for row in &challenge_rows {
            let c = map_challenge_row(row)?;
            let opts = options.remove(&c.id).unwrap_or_default();
            challenges.push(
                Challenge::new(c.id, c.lesson_id, c.kind, c.question, c.order, opts).map_err(ser)?,
            );
        }
        Ok(challenges)
    }
}
