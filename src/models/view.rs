use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::definition::{DefinitionStatus, Frequency};
use crate::models::instance::InstanceStatus;
use crate::models::verification::{FailureReason, UnitVerificationStatus};
use crate::services::geo::Coordinates;

#[derive(Debug, Clone, Serialize)]
pub struct PropertySummary {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A unit with its verification state on this instance.
#[derive(Debug, Clone, Serialize)]
pub struct UnitView {
    pub unit_id: Uuid,
    pub unit_number: String,
    pub floor: Option<i16>,
    pub status: UnitVerificationStatus,
    pub attempt_count: i32,
    pub failure_reasons: Vec<FailureReason>,
    pub permanent_failure: bool,
    pub missing_trash_can: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildingView {
    pub building_id: Uuid,
    pub name: String,
    pub units: Vec<UnitView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DumpsterView {
    pub dumpster_id: Uuid,
    pub dumpster_number: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// What a worker's app renders for one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobInstanceView {
    pub instance_id: Uuid,
    pub definition_id: Uuid,
    pub property: PropertySummary,
    pub service_date: NaiveDate,
    pub status: InstanceStatus,
    pub pay: f64,
    pub estimated_time_minutes: Option<i32>,
    /// Property-local "HH:MM".
    pub window_start: String,
    /// The no-show time, property-local "HH:MM".
    pub window_end: String,
    pub start_hint: String,
    pub buildings: Vec<BuildingView>,
    pub dumpsters: Vec<DumpsterView>,
    pub distance_miles: Option<f64>,
    pub travel_minutes: Option<i64>,
    pub assigned_worker_id: Option<Uuid>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub flagged_for_review: bool,
    pub row_version: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobPage {
    pub items: Vec<JobInstanceView>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
}

/// Query for the job listings. Pages are 1-based.
#[derive(Debug, Clone, Deserialize)]
pub struct ListJobsQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

impl ListJobsQuery {
    /// The worker's position, when both coordinates are present and in range.
    pub fn origin(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng))
                if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) =>
            {
                Some(Coordinates::new(lat, lng))
            }
            _ => None,
        }
    }
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    50
}

/// Pay and time for one weekday, 0 = Sunday.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeekdayEstimateInput {
    pub weekday: i16,
    pub base_pay: f64,
    pub estimated_time_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingAssignmentInput {
    pub building_id: Uuid,
    pub unit_ids: Vec<Uuid>,
    #[serde(default)]
    pub floors: Vec<i16>,
}

/// Full definition payload for create and update.
///
/// Pay comes from `daily_estimates` or, when absent, from the global pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionRequest {
    pub property_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub assigned_units_by_building: Vec<BuildingAssignmentInput>,
    #[serde(default)]
    pub dumpster_ids: Vec<Uuid>,
    pub frequency: Frequency,
    /// CUSTOM only, 0 = Sunday.
    #[serde(default)]
    pub weekdays: Vec<i16>,
    #[serde(default)]
    pub interval_weeks: Option<i32>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub skip_holidays: bool,
    #[serde(default)]
    pub holiday_exceptions: Vec<NaiveDate>,
    /// "HH:MM"
    pub earliest_start_time: String,
    pub latest_start_time: String,
    #[serde(default)]
    pub start_time_hint: Option<String>,
    #[serde(default)]
    pub daily_estimates: Option<Vec<WeekdayEstimateInput>>,
    #[serde(default)]
    pub global_base_pay: Option<f64>,
    #[serde(default)]
    pub global_estimated_time_minutes: Option<i32>,
    #[serde(default)]
    pub status: Option<DefinitionStatus>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatusChangeRequest {
    pub status: DefinitionStatus,
    /// The definition version the caller last read.
    pub row_version: i64,
}
