use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Assign/unassign count above which an instance is flagged for review.
pub const REVIEW_FLAG_THRESHOLD: i32 = 2;

/// Lifecycle state of a dated job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Open,
    Assigned,
    InProgress,
    Completed,
    Canceled,
    /// Service date passed without the job being worked.
    Retired,
}

impl InstanceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InstanceStatus::Completed | InstanceStatus::Canceled | InstanceStatus::Retired
        )
    }
}

/// One dated occurrence of a job definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInstance {
    pub id: Uuid,
    pub definition_id: Uuid,
    /// Calendar date in the owning property's timezone.
    pub service_date: NaiveDate,
    pub status: InstanceStatus,
    pub assigned_worker_id: Option<Uuid>,
    pub effective_pay: f64,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    /// Grows only. An excluded worker can never be assigned again.
    pub excluded_worker_ids: Vec<Uuid>,
    pub assign_unassign_count: i32,
    pub flagged_for_review: bool,
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobInstance {
    /// A fresh OPEN instance at version 1.
    pub fn open(definition_id: Uuid, service_date: NaiveDate, pay: f64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            definition_id,
            service_date,
            status: InstanceStatus::Open,
            assigned_worker_id: None,
            effective_pay: pay,
            check_in_at: None,
            check_out_at: None,
            excluded_worker_ids: Vec::new(),
            assign_unassign_count: 0,
            flagged_for_review: false,
            row_version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// The worker has checked in on site.
    pub fn is_started(&self) -> bool {
        self.check_in_at.is_some()
    }

    pub fn is_assigned_to(&self, worker_id: Uuid) -> bool {
        self.assigned_worker_id == Some(worker_id)
    }

    pub fn is_excluded(&self, worker_id: Uuid) -> bool {
        self.excluded_worker_ids.contains(&worker_id)
    }

    pub fn exclude(&mut self, worker_id: Uuid) {
        if !self.is_excluded(worker_id) {
            self.excluded_worker_ids.push(worker_id);
        }
    }

    /// Count an assignment change and raise the review flag past the threshold.
    pub fn bump_assignment_churn(&mut self) {
        self.assign_unassign_count += 1;
        if self.assign_unassign_count > REVIEW_FLAG_THRESHOLD {
            self.flagged_for_review = true;
        }
    }

    /// Back to OPEN with no worker and no check-in.
    pub fn reopen(&mut self) {
        self.status = InstanceStatus::Open;
        self.assigned_worker_id = None;
        self.check_in_at = None;
        self.bump_assignment_churn();
    }

    /// Terminal cancel. Whoever held the job is excluded and released.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        if let Some(worker_id) = self.assigned_worker_id.take() {
            self.exclude(worker_id);
        }
        self.status = InstanceStatus::Canceled;
        self.check_out_at = Some(now);
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = InstanceStatus::Completed;
        self.check_out_at = Some(now);
    }

    /// Minutes between check-in and check-out, at least one.
    pub fn worked_minutes(&self) -> Option<i64> {
        let (start, end) = (self.check_in_at?, self.check_out_at?);
        let seconds = (end - start).num_seconds().max(60);
        Some(((seconds as f64) / 60.0).round() as i64)
    }
}
