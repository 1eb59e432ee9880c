use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failed attempts after which a unit can no longer be re-photographed.
pub const MAX_PHOTO_ATTEMPTS: i32 = 3;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitVerificationStatus {
    Pending,
    Verified,
    Failed,
    Dumped,
}

/// Why a photo was rejected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    TrashCanNotVisible,
    TrashBagVisible,
    DoorNumberMismatch,
    DoorNumberMissing,
}

/// Photo verification state for one unit of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitVerification {
    pub id: Uuid,
    pub job_instance_id: Uuid,
    pub unit_id: Uuid,
    pub status: UnitVerificationStatus,
    pub attempt_count: i32,
    pub failure_reasons: Vec<FailureReason>,
    /// Append-only across attempts.
    pub failure_reason_history: Vec<FailureReason>,
    pub permanent_failure: bool,
    pub missing_trash_can: bool,
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnitVerification {
    pub fn pending(job_instance_id: Uuid, unit_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_instance_id,
            unit_id,
            status: UnitVerificationStatus::Pending,
            attempt_count: 0,
            failure_reasons: Vec::new(),
            failure_reason_history: Vec::new(),
            permanent_failure: false,
            missing_trash_can: false,
            row_version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// DUMPED, or FAILED with no attempts left.
    pub fn is_terminal(&self) -> bool {
        self.status == UnitVerificationStatus::Dumped
            || (self.status == UnitVerificationStatus::Failed && self.permanent_failure)
    }

    pub fn record_pass(&mut self) {
        self.status = UnitVerificationStatus::Verified;
        self.attempt_count = 0;
        self.failure_reasons.clear();
    }

    pub fn record_failure(&mut self, reasons: Vec<FailureReason>) {
        self.status = UnitVerificationStatus::Failed;
        self.attempt_count += 1;
        self.failure_reason_history.extend(reasons.iter().copied());
        self.failure_reasons = reasons;
        if self.attempt_count >= MAX_PHOTO_ATTEMPTS {
            self.permanent_failure = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_third_failure_is_permanent() {
        let mut v = UnitVerification::pending(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        v.record_failure(vec![FailureReason::TrashBagVisible]);
        v.record_failure(vec![FailureReason::DoorNumberMissing]);
        assert!(!v.permanent_failure);
        assert!(!v.is_terminal());
        v.record_failure(vec![FailureReason::TrashCanNotVisible]);
        assert!(v.permanent_failure);
        assert!(v.is_terminal());
        assert_eq!(v.failure_reasons, vec![FailureReason::TrashCanNotVisible]);
        assert_eq!(v.failure_reason_history.len(), 3);
    }

    #[test]
    fn test_pass_resets_attempts() {
        let mut v = UnitVerification::pending(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        v.record_failure(vec![FailureReason::DoorNumberMismatch]);
        v.record_pass();
        assert_eq!(v.status, UnitVerificationStatus::Verified);
        assert_eq!(v.attempt_count, 0);
        assert!(v.failure_reasons.is_empty());
        assert_eq!(v.failure_reason_history, vec![FailureReason::DoorNumberMismatch]);
    }
}
