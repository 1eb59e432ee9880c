use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_RELIABILITY_SCORE: i32 = 0;
pub const MAX_RELIABILITY_SCORE: i32 = 100;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    PendingReview,
    Suspended,
    Deactivated,
}

/// The parts of a worker account the job engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: Uuid,
    pub account_status: AccountStatus,
    pub reliability_score: i32,
    pub tenant_token: Option<String>,
}

impl Worker {
    pub fn is_active(&self) -> bool {
        self.account_status == AccountStatus::Active
    }

    pub fn clamped_score(&self) -> i32 {
        self.reliability_score
            .clamp(MIN_RELIABILITY_SCORE, MAX_RELIABILITY_SCORE)
    }
}
