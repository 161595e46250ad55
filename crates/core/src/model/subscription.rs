use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

/// Billing subscription of a learner.
///
/// An active subscription waives heart loss on wrong answers and lets a
/// learner keep answering at zero hearts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSubscription {
    pub user_id: UserId,
    pub customer_id: String,
    pub subscription_id: String,
    pub price_id: String,
    pub current_period_end: DateTime<Utc>,
}

impl UserSubscription {
    /// Grace period granted after `current_period_end`.
    #[must_use]
    pub fn grace() -> Duration {
        Duration::days(1)
    }

    /// True when a price is attached and the period (plus grace) has not elapsed.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.price_id.trim().is_empty() && self.current_period_end + Self::grace() > now
    }
}
