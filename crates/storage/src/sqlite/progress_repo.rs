use chrono::{DateTime, Utc};
use lingo_core::model::{
    ChallengeId, ChallengeProgress, Hearts, POINTS_PER_CHALLENGE, UserId, UserProgress,
};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{
    db, id_i64, map_challenge_progress_row, map_subscription_row, map_user_progress_row, ser,
    write_err,
};
use crate::repository::{
    ChallengeProgressRepository, CorrectOutcome, IncorrectOutcome, ProgressStore,
    ProgressWriteError, StorageError, UserProgressRepository,
};
use crate::rules::{CorrectPlan, IncorrectPlan, plan_correct, plan_incorrect};

/// Learner state the heart rules are decided on, read inside the write transaction.
struct WriteContext {
    hearts: Hearts,
    has_record: bool,
    subscribed: bool,
}

async fn load_context(
    conn: &mut SqliteConnection,
    user: &UserId,
    challenge: i64,
    now: DateTime<Utc>,
) -> Result<WriteContext, StorageError> {
    let exists = sqlx::query("SELECT 1 FROM challenges WHERE id = ?1")
        .bind(challenge)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db)?;
    if exists.is_none() {
        return Err(StorageError::NotFound);
    }

    let hearts: i64 = sqlx::query("SELECT hearts FROM user_progress WHERE user_id = ?1")
        .bind(user.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(db)?
        .ok_or(StorageError::NotFound)?
        .try_get("hearts")
        .map_err(ser)?;

    let has_record = sqlx::query(
        "SELECT 1 FROM challenge_progress WHERE user_id = ?1 AND challenge_id = ?2 LIMIT 1",
    )
    .bind(user.as_str())
    .bind(challenge)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db)?
    .is_some();

    let subscribed = match sqlx::query(
        r"
        SELECT user_id, customer_id, subscription_id, price_id, current_period_end
        FROM user_subscription WHERE user_id = ?1
        ",
    )
    .bind(user.as_str())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db)?
    {
        Some(row) => map_subscription_row(&row)?.is_active(now),
        None => false,
    };

    Ok(WriteContext {
        hearts: Hearts::new(hearts).map_err(ser)?,
        has_record,
        subscribed,
    })
}

#[async_trait::async_trait]
impl UserProgressRepository for SqliteRepository {
    async fn get_user_progress(&self, user: &UserId) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, user_name, user_image_src, active_course_id, hearts, points
            FROM user_progress WHERE user_id = ?1
            ",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        row.as_ref().map(map_user_progress_row).transpose()
    }

    async fn upsert_user_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        let active_course = progress
            .active_course_id
            .map(|c| id_i64("course_id", c.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO user_progress (user_id, user_name, user_image_src, active_course_id, hearts, points)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id) DO UPDATE SET
                user_name = excluded.user_name,
                user_image_src = excluded.user_image_src,
                active_course_id = excluded.active_course_id,
                hearts = excluded.hearts,
                points = excluded.points
            ",
        )
        .bind(progress.user_id.as_str())
        .bind(&progress.user_name)
        .bind(&progress.user_image_src)
        .bind(active_course)
        .bind(i64::from(progress.hearts))
        .bind(i64::from(progress.points))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn top_users(&self, limit: u32) -> Result<Vec<UserProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, user_name, user_image_src, active_course_id, hearts, points
            FROM user_progress
            ORDER BY points DESC, user_id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        rows.iter().map(map_user_progress_row).collect()
    }
}

#[async_trait::async_trait]
impl ChallengeProgressRepository for SqliteRepository {
    async fn progress_for_challenges(
        &self,
        user: &UserId,
        challenge_ids: &[ChallengeId],
    ) -> Result<Vec<ChallengeProgress>, StorageError> {
        if challenge_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
            SELECT user_id, challenge_id, completed
            FROM challenge_progress
            WHERE user_id = ?1 AND challenge_id IN (
            ",
        );
        for i in 0..challenge_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 2).to_string());
        }
        sql.push_str(")\nORDER BY id ASC\n");

        let mut q = sqlx::query(&sql).bind(user.as_str());
        for id in challenge_ids {
            q = q.bind(id_i64("challenge_id", id.value())?);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(db)?;
        rows.iter().map(map_challenge_progress_row).collect()
    }

    async fn insert_progress(&self, record: &ChallengeProgress) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO challenge_progress (user_id, challenge_id, completed) VALUES (?1, ?2, ?3)",
        )
        .bind(record.user_id.as_str())
        .bind(id_i64("challenge_id", record.challenge_id.value())?)
        .bind(record.completed)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProgressStore for SqliteRepository {
    async fn record_correct(
        &self,
        user: &UserId,
        challenge: ChallengeId,
        now: DateTime<Utc>,
    ) -> Result<CorrectOutcome, ProgressWriteError> {
        let challenge_id = id_i64("challenge_id", challenge.value())?;
        // Write lock up front: concurrent writers queue on BEGIN.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(db)?;
        let ctx = load_context(&mut *tx, user, challenge_id, now).await?;

        let outcome = match plan_correct(ctx.hearts, ctx.has_record, ctx.subscribed) {
            CorrectPlan::Refuse => return Err(ProgressWriteError::InsufficientHearts),
            CorrectPlan::Apply(outcome) => outcome,
        };

        match outcome {
            CorrectOutcome::Practiced => {
                sqlx::query(
                    "UPDATE challenge_progress SET completed = 1 WHERE user_id = ?1 AND challenge_id = ?2",
                )
                .bind(user.as_str())
                .bind(challenge_id)
                .execute(&mut *tx)
                .await
                .map_err(db)?;

                sqlx::query(
                    r"
                    UPDATE user_progress
                    SET hearts = MIN(hearts + 1, ?2), points = points + ?3
                    WHERE user_id = ?1
                    ",
                )
                .bind(user.as_str())
                .bind(i64::from(Hearts::FULL))
                .bind(i64::from(POINTS_PER_CHALLENGE))
                .execute(&mut *tx)
                .await
                .map_err(db)?;
            }
            CorrectOutcome::Completed => {
                sqlx::query(
                    "INSERT INTO challenge_progress (user_id, challenge_id, completed) VALUES (?1, ?2, 1)",
                )
                .bind(user.as_str())
                .bind(challenge_id)
                .execute(&mut *tx)
                .await
                .map_err(write_err)?;

                sqlx::query("UPDATE user_progress SET points = points + ?2 WHERE user_id = ?1")
                    .bind(user.as_str())
                    .bind(i64::from(POINTS_PER_CHALLENGE))
                    .execute(&mut *tx)
                    .await
                    .map_err(db)?;
            }
        }

        tx.commit().await.map_err(db)?;
        Ok(outcome)
    }

    async fn record_incorrect(
        &self,
        user: &UserId,
        challenge: ChallengeId,
        now: DateTime<Utc>,
    ) -> Result<IncorrectOutcome, ProgressWriteError> {
        let challenge_id = id_i64("challenge_id", challenge.value())?;
        // Write lock up front: concurrent writers queue on BEGIN.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(db)?;
        let ctx = load_context(&mut *tx, user, challenge_id, now).await?;

        let outcome = match plan_incorrect(ctx.hearts, ctx.has_record, ctx.subscribed) {
            IncorrectPlan::Refuse => return Err(ProgressWriteError::InsufficientHearts),
            IncorrectPlan::Waive(reason) => reason.into(),
            IncorrectPlan::Deduct => {
                // The hearts guard keeps concurrent deductions from going below zero.
                let res = sqlx::query(
                    "UPDATE user_progress SET hearts = hearts - 1 WHERE user_id = ?1 AND hearts > 0",
                )
                .bind(user.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db)?;
                if res.rows_affected() == 0 {
                    return Err(ProgressWriteError::InsufficientHearts);
                }
                IncorrectOutcome::Deducted
            }
        };

        tx.commit().await.map_err(db)?;
        Ok(outcome)
    }
}
