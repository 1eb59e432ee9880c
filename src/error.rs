//! Error taxonomy for the job engine.

use serde::Serialize;
use uuid::Uuid;

use crate::models::definition::JobDefinition;
use crate::models::instance::{InstanceStatus, JobInstance};
use crate::models::verification::UnitVerification;

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

/// The row that won a concurrent write.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "row", rename_all = "snake_case")]
pub enum LatestRow {
    Instance(Box<JobInstance>),
    Verification(Box<UnitVerification>),
    Definition(Box<JobDefinition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    WrongState,
    NotAssignedWorker,
    ExcludedWorker,
    WorkerNotActive,
    NotReleasedYet,
    OutsideTimeWindow,
    LocationOutOfBounds,
    DumpLocationOutOfBounds,
    RowVersionConflict,
    InvalidPayload,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("job instance is {actual}, cannot {action}")]
    WrongState {
        action: &'static str,
        actual: InstanceStatus,
    },

    #[error("worker is not assigned to this job")]
    NotAssignedWorker,

    #[error("worker is excluded from this job")]
    ExcludedWorker,

    #[error("worker account is not active")]
    WorkerNotActive,

    #[error("job is not released to this worker yet")]
    NotReleasedYet,

    #[error("outside time window: {0}")]
    OutsideTimeWindow(&'static str),

    #[error("location rejected: {0}")]
    LocationOutOfBounds(String),

    #[error("not within range of an assigned dumpster")]
    DumpLocationOutOfBounds,

    #[error("row was modified concurrently")]
    RowVersionConflict { latest: LatestRow },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl JobError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        JobError::NotFound { entity, id }
    }

    pub fn instance_conflict(latest: JobInstance) -> Self {
        JobError::RowVersionConflict {
            latest: LatestRow::Instance(Box::new(latest)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::NotFound { .. } => ErrorKind::NotFound,
            JobError::WrongState { .. } => ErrorKind::WrongState,
            JobError::NotAssignedWorker => ErrorKind::NotAssignedWorker,
            JobError::ExcludedWorker => ErrorKind::ExcludedWorker,
            JobError::WorkerNotActive => ErrorKind::WorkerNotActive,
            JobError::NotReleasedYet => ErrorKind::NotReleasedYet,
            JobError::OutsideTimeWindow(_) => ErrorKind::OutsideTimeWindow,
            JobError::LocationOutOfBounds(_) => ErrorKind::LocationOutOfBounds,
            JobError::DumpLocationOutOfBounds => ErrorKind::DumpLocationOutOfBounds,
            JobError::RowVersionConflict { .. } => ErrorKind::RowVersionConflict,
            JobError::InvalidPayload(_) => ErrorKind::InvalidPayload,
            JobError::Internal(_) | JobError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Conflicts and state races clear up after the caller re-reads.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RowVersionConflict | ErrorKind::WrongState
        )
    }
}

pub type JobResult<T> = Result<T, JobError>;
