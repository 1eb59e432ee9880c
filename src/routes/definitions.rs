use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::definition::JobDefinition;
use crate::models::view::{DefinitionRequest, StatusChangeRequest};
use crate::routes::error::{ApiError, ManagerId};

/// POST /api/v1/job-definitions
pub async fn create(
    State(state): State<AppState>,
    ManagerId(manager_id): ManagerId,
    Json(req): Json<DefinitionRequest>,
) -> Result<(StatusCode, Json<JobDefinition>), ApiError> {
    let def = state.jobs.create_definition(manager_id, &req).await?;
    Ok((StatusCode::CREATED, Json(def)))
}

/// PUT /api/v1/job-definitions/{definition_id}
pub async fn update(
    State(state): State<AppState>,
    ManagerId(_): ManagerId,
    Path(definition_id): Path<Uuid>,
    Json(req): Json<DefinitionRequest>,
) -> Result<Json<JobDefinition>, ApiError> {
    Ok(Json(state.jobs.update_definition(definition_id, &req).await?))
}

/// DELETE /api/v1/job-definitions/{definition_id}
pub async fn delete(
    State(state): State<AppState>,
    ManagerId(manager_id): ManagerId,
    Path(definition_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.jobs.delete_definition(definition_id).await?;
    tracing::info!(definition_id = %definition_id, manager_id = %manager_id, "Job definition deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/job-definitions/{definition_id}/status
pub async fn change_status(
    State(state): State<AppState>,
    ManagerId(_): ManagerId,
    Path(definition_id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<JobDefinition>, ApiError> {
    let def = state
        .jobs
        .set_definition_status(definition_id, req.row_version, req.status)
        .await?;
    Ok(Json(def))
}
