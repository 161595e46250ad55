use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            image_src TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS units (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            sort_order INTEGER NOT NULL CHECK (sort_order >= 0),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY,
            unit_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            sort_order INTEGER NOT NULL CHECK (sort_order >= 0),
            FOREIGN KEY (unit_id) REFERENCES units(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS challenges (
            id INTEGER PRIMARY KEY,
            lesson_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('SELECT', 'ASSIST')),
            question TEXT NOT NULL,
            sort_order INTEGER NOT NULL CHECK (sort_order >= 0),
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS challenge_options (
            id INTEGER PRIMARY KEY,
            challenge_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            correct INTEGER NOT NULL CHECK (correct IN (0, 1)),
            image_src TEXT,
            audio_src TEXT,
            FOREIGN KEY (challenge_id) REFERENCES challenges(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_progress (
            user_id TEXT PRIMARY KEY,
            user_name TEXT NOT NULL,
            user_image_src TEXT NOT NULL,
            active_course_id INTEGER,
            hearts INTEGER NOT NULL CHECK (hearts BETWEEN 0 AND 5),
            points INTEGER NOT NULL CHECK (points >= 0),
            FOREIGN KEY (active_course_id) REFERENCES courses(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS challenge_progress (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            challenge_id INTEGER NOT NULL,
            completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
            FOREIGN KEY (challenge_id) REFERENCES challenges(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_subscription (
            user_id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL,
            subscription_id TEXT NOT NULL,
            price_id TEXT NOT NULL,
            current_period_end TEXT NOT NULL
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_units_course_order
            ON units(course_id, sort_order, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_lessons_unit_order
            ON lessons(unit_id, sort_order, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_challenges_lesson_order
            ON challenges(lesson_id, sort_order, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_challenge_progress_user_challenge
            ON challenge_progress(user_id, challenge_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_user_progress_points
            ON user_progress(points DESC);
    ",
];

/// Runs the versioned migrations recorded in `schema_migrations`.
///
/// Version 1 creates the catalogue (courses, units, lessons, challenges,
/// options) and the per-learner tables (progress, challenge records,
/// subscriptions).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
