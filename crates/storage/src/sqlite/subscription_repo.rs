use lingo_core::model::{UserId, UserSubscription};

use super::SqliteRepository;
use super::mapping::{db, map_subscription_row, write_err};
use crate::repository::{StorageError, SubscriptionRepository};

#[async_trait::async_trait]
impl SubscriptionRepository for SqliteRepository {
    async fn get_subscription(
        &self,
        user: &UserId,
    ) -> Result<Option<UserSubscription>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, customer_id, subscription_id, price_id, current_period_end
            FROM user_subscription WHERE user_id = ?1
            ",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        row.as_ref().map(map_subscription_row).transpose()
    }

    async fn upsert_subscription(
        &self,
        subscription: &UserSubscription,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_subscription (user_id, customer_id, subscription_id, price_id, current_period_end)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                customer_id = excluded.customer_id,
                subscription_id = excluded.subscription_id,
                price_id = excluded.price_id,
                current_period_end = excluded.current_period_end
            ",
        )
        .bind(subscription.user_id.as_str())
        .bind(&subscription.customer_id)
        .bind(&subscription.subscription_id)
        .bind(&subscription.price_id)
        .bind(subscription.current_period_end)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }
}
