use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ErrorKind, JobError, LatestRow};

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<LatestRow>,
}

/// A service error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub JobError);

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        ApiError(e)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::WrongState | ErrorKind::RowVersionConflict => StatusCode::CONFLICT,
        ErrorKind::NotAssignedWorker
        | ErrorKind::ExcludedWorker
        | ErrorKind::WorkerNotActive
        | ErrorKind::NotReleasedYet => StatusCode::FORBIDDEN,
        ErrorKind::OutsideTimeWindow
        | ErrorKind::LocationOutOfBounds
        | ErrorKind::DumpLocationOutOfBounds => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidPayload => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let retryable = self.0.is_retryable();
        let message = if status.is_server_error() {
            "internal error".to_string()
        } else {
            self.0.to_string()
        };
        let current = match self.0 {
            JobError::RowVersionConflict { latest } => Some(latest),
            _ => None,
        };
        let body = ErrorBody {
            error: kind,
            message,
            retryable,
            current,
        };
        (status, Json(body)).into_response()
    }
}

fn header_uuid(parts: &Parts, name: &'static str) -> Result<Uuid, (StatusCode, String)> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, format!("missing or invalid {name} header")))
}

/// The calling worker, from the `X-Worker-Id` header set by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct WorkerId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for WorkerId {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_uuid(parts, "x-worker-id").map(WorkerId)
    }
}

/// The calling manager, from the `X-Manager-Id` header set by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct ManagerId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for ManagerId {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_uuid(parts, "x-manager-id").map(ManagerId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::RowVersionConflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::ExcludedWorker), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(ErrorKind::DumpLocationOutOfBounds),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(ErrorKind::InvalidPayload), StatusCode::BAD_REQUEST);
    }
}
