use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::JobError;
use crate::models::location::LocationReport;
use crate::models::verification::UnitVerification;
use crate::models::view::{JobInstanceView, JobPage, ListJobsQuery};
use crate::routes::error::{ApiError, WorkerId};
use crate::services::completion::UnitPhoto;
use crate::services::geo::Coordinates;

#[derive(Debug, Default, Deserialize)]
pub struct OriginQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl OriginQuery {
    fn origin(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.lat?, self.lng?))
    }
}

/// GET /api/v1/jobs/open
pub async fn list_open(
    State(state): State<AppState>,
    WorkerId(worker_id): WorkerId,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobPage>, ApiError> {
    Ok(Json(state.jobs.list_open_jobs(worker_id, &query).await?))
}

/// GET /api/v1/jobs/mine
pub async fn list_mine(
    State(state): State<AppState>,
    WorkerId(worker_id): WorkerId,
    Query(query): Query<OriginQuery>,
) -> Result<Json<Vec<JobInstanceView>>, ApiError> {
    Ok(Json(state.jobs.list_my_jobs(worker_id, query.origin()).await?))
}

/// POST /api/v1/jobs/{instance_id}/accept
pub async fn accept(
    State(state): State<AppState>,
    WorkerId(worker_id): WorkerId,
    Path(instance_id): Path<Uuid>,
    Json(location): Json<LocationReport>,
) -> Result<Json<JobInstanceView>, ApiError> {
    let instance = state.jobs.accept_job(worker_id, instance_id, &location).await?;
    tracing::info!(instance_id = %instance_id, worker_id = %worker_id, "Job accepted");
    let view = state
        .jobs
        .instance_view(&instance, Some(location.coordinates()))
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/jobs/{instance_id}/start
pub async fn start(
    State(state): State<AppState>,
    WorkerId(worker_id): WorkerId,
    Path(instance_id): Path<Uuid>,
    Json(location): Json<LocationReport>,
) -> Result<Json<JobInstanceView>, ApiError> {
    let instance = state.jobs.start_job(worker_id, instance_id, &location).await?;
    tracing::info!(instance_id = %instance_id, worker_id = %worker_id, "Job started");
    Ok(Json(state.jobs.instance_view(&instance, None).await?))
}

/// POST /api/v1/jobs/{instance_id}/unaccept
pub async fn unaccept(
    State(state): State<AppState>,
    WorkerId(worker_id): WorkerId,
    Path(instance_id): Path<Uuid>,
) -> Result<Json<JobInstanceView>, ApiError> {
    let instance = state.jobs.unaccept_job(worker_id, instance_id).await?;
    Ok(Json(state.jobs.instance_view(&instance, None).await?))
}

/// POST /api/v1/jobs/{instance_id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    WorkerId(worker_id): WorkerId,
    Path(instance_id): Path<Uuid>,
) -> Result<Json<JobInstanceView>, ApiError> {
    let instance = state.jobs.cancel_job(worker_id, instance_id).await?;
    Ok(Json(state.jobs.instance_view(&instance, None).await?))
}

/// POST /api/v1/jobs/{instance_id}/dump
pub async fn dump(
    State(state): State<AppState>,
    WorkerId(worker_id): WorkerId,
    Path(instance_id): Path<Uuid>,
    Json(location): Json<LocationReport>,
) -> Result<Json<JobInstanceView>, ApiError> {
    let instance = state
        .jobs
        .process_dump_trip(worker_id, instance_id, &location)
        .await?;
    Ok(Json(state.jobs.instance_view(&instance, None).await?))
}

/// Multipart fields of a unit photo upload, collected before validation.
#[derive(Default)]
struct PhotoForm {
    image: Option<Vec<u8>>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy_meters: Option<f64>,
    timestamp_ms: Option<i64>,
    is_mock: bool,
    missing_trash_can: bool,
}

fn parse_field<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, JobError> {
    raw.trim()
        .parse()
        .map_err(|_| JobError::InvalidPayload(format!("{name} is not valid")))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

impl PhotoForm {
    fn location(&self) -> Result<LocationReport, JobError> {
        let missing = |name: &str| JobError::InvalidPayload(format!("{name} is required"));
        Ok(LocationReport {
            latitude: self.latitude.ok_or_else(|| missing("latitude"))?,
            longitude: self.longitude.ok_or_else(|| missing("longitude"))?,
            accuracy_meters: self.accuracy_meters.ok_or_else(|| missing("accuracy_meters"))?,
            timestamp_ms: self.timestamp_ms.ok_or_else(|| missing("timestamp_ms"))?,
            is_mock: self.is_mock,
        })
    }
}

/// POST /api/v1/jobs/{instance_id}/units/{unit_id}/photo
///
/// Multipart upload: an `image` part plus the location fields as text parts.
pub async fn upload_unit_photo(
    State(state): State<AppState>,
    WorkerId(worker_id): WorkerId,
    Path((instance_id, unit_id)): Path<(Uuid, Uuid)>,
    mut multipart: Multipart,
) -> Result<Json<UnitVerification>, Response> {
    let mut form = PhotoForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST.into_response())?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let data = field
                .bytes()
                .await
                .map_err(|_| StatusCode::BAD_REQUEST.into_response())?;
            image::guess_format(&data)
                .map_err(|_| StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response())?;
            form.image = Some(data.to_vec());
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|_| StatusCode::BAD_REQUEST.into_response())?;
        let parsed = match name.as_str() {
            "latitude" => parse_field(&name, &text).map(|v| form.latitude = Some(v)),
            "longitude" => parse_field(&name, &text).map(|v| form.longitude = Some(v)),
            "accuracy_meters" => parse_field(&name, &text).map(|v| form.accuracy_meters = Some(v)),
            "timestamp_ms" => parse_field(&name, &text).map(|v| form.timestamp_ms = Some(v)),
            "is_mock" => {
                form.is_mock = parse_flag(&text);
                Ok(())
            }
            "missing_trash_can" => {
                form.missing_trash_can = parse_flag(&text);
                Ok(())
            }
            _ => Ok(()),
        };
        parsed.map_err(|e| ApiError(e).into_response())?;
    }

    let image = form
        .image
        .as_deref()
        .ok_or_else(|| ApiError(JobError::InvalidPayload("image is required".into())).into_response())?;
    let location = form.location().map_err(|e| ApiError(e).into_response())?;

    let photo = UnitPhoto {
        unit_id,
        image,
        missing_trash_can: form.missing_trash_can,
    };
    let record = state
        .jobs
        .verify_unit_photo(worker_id, instance_id, &location, photo)
        .await
        .map_err(|e| ApiError(e).into_response())?;
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_form_requires_location() {
        let mut form = PhotoForm {
            latitude: Some(41.88),
            longitude: Some(-87.63),
            accuracy_meters: Some(8.0),
            ..PhotoForm::default()
        };
        assert!(matches!(form.location(), Err(JobError::InvalidPayload(_))));

        form.timestamp_ms = Some(1_700_000_000_000);
        let location = form.location().unwrap();
        assert_eq!(location.accuracy_meters, 8.0);
        assert!(!location.is_mock);
    }

    #[test]
    fn test_flags_and_numbers() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("off"));
        assert_eq!(parse_field::<f64>("latitude", " 41.5 ").unwrap(), 41.5);
        assert!(parse_field::<i64>("timestamp_ms", "soon").is_err());
    }
}
