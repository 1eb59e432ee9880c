//! Creating and changing job definitions, and seeding their instances.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use uuid::Uuid;

use crate::error::{JobError, JobResult, LatestRow};
use crate::models::definition::{
    weekday_from_number, BuildingAssignment, DailyPayEstimate, DefinitionStatus, Frequency,
    JobDefinition, ALL_WEEKDAYS,
};
use crate::models::instance::JobInstance;
use crate::models::property::Property;
use crate::models::view::{DefinitionRequest, WeekdayEstimateInput};
use crate::services::engine::JobService;
use crate::services::recurrence::dates_in_horizon;
use crate::services::time_window::{local_today, resolve_start_window, JobWindow};

const UPDATE_ATTEMPTS: usize = 3;

/// A request that passed validation, with wire formats parsed.
#[derive(Debug, Clone)]
struct DefinitionDraft {
    weekdays: Vec<Weekday>,
    interval_weeks: Option<i32>,
    earliest_start: NaiveTime,
    latest_start: NaiveTime,
    start_time_hint: NaiveTime,
    estimates: Vec<DailyPayEstimate>,
    groups: Vec<BuildingAssignment>,
}

fn invalid(msg: impl Into<String>) -> JobError {
    JobError::InvalidPayload(msg.into())
}

/// Accepts "HH:MM" or "HH:MM:SS".
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| format!("invalid time of day {raw:?}, expected HH:MM"))
}

/// Per-weekday estimates from either the explicit list or the global pair.
fn resolve_estimates(
    req: &DefinitionRequest,
    required: &[Weekday],
) -> Result<Vec<DailyPayEstimate>, String> {
    match req.daily_estimates.as_deref() {
        Some(list) if !list.is_empty() => estimates_from_list(list, required),
        _ => match (req.global_base_pay, req.global_estimated_time_minutes) {
            (Some(pay), Some(minutes)) => {
                if pay <= 0.0 || minutes <= 0 {
                    return Err("global pay and time must be positive".to_string());
                }
                Ok(ALL_WEEKDAYS
                    .iter()
                    .map(|day| DailyPayEstimate::new(*day, pay, minutes))
                    .collect())
            }
            _ => Err("missing pay estimate input".to_string()),
        },
    }
}

fn estimates_from_list(
    list: &[WeekdayEstimateInput],
    required: &[Weekday],
) -> Result<Vec<DailyPayEstimate>, String> {
    let mut seen = HashSet::new();
    let mut estimates = Vec::with_capacity(list.len());
    for input in list {
        let day = weekday_from_number(input.weekday)
            .ok_or_else(|| format!("weekday {} is out of range 0..=6", input.weekday))?;
        if !seen.insert(day) {
            return Err(format!("duplicate estimate for {day}"));
        }
        if input.base_pay <= 0.0 {
            return Err(format!("base pay for {day} must be positive"));
        }
        if input.estimated_time_minutes <= 0 {
            return Err(format!("estimated time for {day} must be positive"));
        }
        estimates.push(DailyPayEstimate::new(
            day,
            input.base_pay,
            input.estimated_time_minutes,
        ));
    }
    if let Some(missing) = required.iter().find(|day| !seen.contains(*day)) {
        return Err(format!("pay estimate weekdays do not match the schedule: missing {missing}"));
    }
    Ok(estimates)
}

fn validate_request(req: &DefinitionRequest) -> JobResult<DefinitionDraft> {
    if req.title.trim().is_empty() {
        return Err(invalid("title is required"));
    }
    if let Some(end) = req.end_date {
        if end < req.start_date {
            return Err(invalid("end date is before start date"));
        }
    }

    let earliest_start = parse_time_of_day(&req.earliest_start_time).map_err(invalid)?;
    let latest_start = parse_time_of_day(&req.latest_start_time).map_err(invalid)?;
    let hint = req
        .start_time_hint
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(parse_time_of_day)
        .transpose()
        .map_err(invalid)?;
    let start_time_hint = resolve_start_window(earliest_start, latest_start, hint).map_err(invalid)?;

    let (weekdays, interval_weeks) = if req.frequency == Frequency::Custom {
        if req.weekdays.is_empty() {
            return Err(invalid("custom schedules need at least one weekday"));
        }
        let interval = req.interval_weeks.unwrap_or(0);
        if interval < 1 {
            return Err(invalid("custom schedules need an interval of at least one week"));
        }
        let mut days = Vec::new();
        for n in &req.weekdays {
            let day = weekday_from_number(*n)
                .ok_or_else(|| invalid(format!("weekday {n} is out of range 0..=6")))?;
            if !days.contains(&day) {
                days.push(day);
            }
        }
        (days, Some(interval))
    } else {
        (Vec::new(), None)
    };

    let required = req.frequency.required_weekdays(&weekdays);
    let estimates = resolve_estimates(req, &required).map_err(invalid)?;

    let groups: Vec<BuildingAssignment> = req
        .assigned_units_by_building
        .iter()
        .map(|g| BuildingAssignment {
            building_id: g.building_id,
            unit_ids: g.unit_ids.clone(),
            floors: g.floors.clone(),
        })
        .collect();
    if groups.iter().all(|g| g.unit_ids.is_empty()) {
        return Err(invalid("at least one unit must be assigned"));
    }

    Ok(DefinitionDraft {
        weekdays,
        interval_weeks,
        earliest_start,
        latest_start,
        start_time_hint,
        estimates,
        groups,
    })
}

fn apply_draft(def: &mut JobDefinition, req: &DefinitionRequest, draft: DefinitionDraft) {
    def.property_id = req.property_id;
    def.title = req.title.trim().to_string();
    def.description = req.description.clone();
    def.assigned_units_by_building = draft.groups;
    def.dumpster_ids = req.dumpster_ids.clone();
    def.frequency = req.frequency;
    def.weekdays = draft.weekdays;
    def.interval_weeks = draft.interval_weeks;
    def.start_date = req.start_date;
    def.end_date = req.end_date;
    def.skip_holidays = req.skip_holidays;
    def.holiday_exceptions = req.holiday_exceptions.clone();
    def.earliest_start = draft.earliest_start;
    def.latest_start = draft.latest_start;
    def.start_time_hint = draft.start_time_hint;
    def.daily_pay_estimates = draft.estimates;
    def.derive_assignment_fields();
}

impl JobService {
    pub async fn create_definition(
        &self,
        manager_id: Uuid,
        req: &DefinitionRequest,
    ) -> JobResult<JobDefinition> {
        let draft = validate_request(req)?;
        let property = self.load_property(req.property_id).await?;
        let now = self.now();

        let mut def = JobDefinition {
            id: Uuid::new_v4(),
            manager_id,
            property_id: property.id,
            title: String::new(),
            description: None,
            assigned_units_by_building: Vec::new(),
            dumpster_ids: Vec::new(),
            floors: Vec::new(),
            total_units: 0,
            frequency: req.frequency,
            weekdays: Vec::new(),
            interval_weeks: None,
            start_date: req.start_date,
            end_date: None,
            skip_holidays: false,
            holiday_exceptions: Vec::new(),
            earliest_start: draft.earliest_start,
            latest_start: draft.latest_start,
            start_time_hint: draft.start_time_hint,
            daily_pay_estimates: Vec::new(),
            status: req.status.unwrap_or(DefinitionStatus::Active),
            row_version: 1,
            created_at: now,
            updated_at: now,
        };
        apply_draft(&mut def, req, draft);
        self.store.insert_definition(&def).await?;
        tracing::info!(
            definition_id = %def.id,
            property_id = %def.property_id,
            frequency = %def.frequency,
            status = %def.status,
            "Job definition created"
        );

        if def.is_active() {
            self.seed_horizon(&def, &property, now).await?;
        }
        Ok(def)
    }

    /// Replace a definition's contents. Estimates restart from the new values.
    pub async fn update_definition(
        &self,
        definition_id: Uuid,
        req: &DefinitionRequest,
    ) -> JobResult<JobDefinition> {
        let draft = validate_request(req)?;
        self.load_property(req.property_id).await?;

        for attempt in 1..=UPDATE_ATTEMPTS {
            let current = self.load_definition(definition_id).await?;
            let mut next = current.clone();
            apply_draft(&mut next, req, draft.clone());
            if let Some(saved) = self
                .store
                .update_definition_if_version(&next, current.row_version)
                .await?
            {
                tracing::info!(definition_id = %definition_id, attempt, "Job definition updated");
                return Ok(saved);
            }
            tracing::debug!(definition_id = %definition_id, attempt, "Definition update lost a race, retrying");
        }

        let latest = self.load_definition(definition_id).await?;
        Err(JobError::RowVersionConflict {
            latest: LatestRow::Definition(Box::new(latest)),
        })
    }

    /// Soft delete.
    pub async fn delete_definition(&self, definition_id: Uuid) -> JobResult<JobDefinition> {
        let current = self.load_definition(definition_id).await?;
        self.set_definition_status(definition_id, current.row_version, DefinitionStatus::Deleted)
            .await
    }

    /// Move a definition to `status` if it is still at `expected_version`.
    ///
    /// Leaving ACTIVE drops OPEN instances from today on. Entering ACTIVE
    /// seeds the horizon again.
    pub async fn set_definition_status(
        &self,
        definition_id: Uuid,
        expected_version: i64,
        status: DefinitionStatus,
    ) -> JobResult<JobDefinition> {
        let current = self.load_definition(definition_id).await?;
        if current.status == status && current.row_version == expected_version {
            return Ok(current);
        }

        let mut next = current.clone();
        next.status = status;
        let Some(saved) = self
            .store
            .update_definition_if_version(&next, expected_version)
            .await?
        else {
            let latest = self.load_definition(definition_id).await?;
            return Err(JobError::RowVersionConflict {
                latest: LatestRow::Definition(Box::new(latest)),
            });
        };
        tracing::info!(
            definition_id = %definition_id,
            from = %current.status,
            to = %status,
            "Job definition status changed"
        );

        let was_active = current.status == DefinitionStatus::Active;
        let property = self.load_property(saved.property_id).await?;
        let now = self.now();
        if was_active && !saved.is_active() {
            let today = local_today(property.zone(), now);
            let removed = self
                .store
                .delete_future_open_instances(definition_id, today)
                .await?;
            tracing::info!(definition_id = %definition_id, removed, "Future open instances removed");
        } else if !was_active && saved.is_active() {
            self.seed_horizon(&saved, &property, now).await?;
        }
        Ok(saved)
    }

    /// Create the next week of instances, skipping today once its no-show time is past.
    pub(crate) async fn seed_horizon(
        &self,
        def: &JobDefinition,
        property: &Property,
        now: DateTime<Utc>,
    ) -> JobResult<usize> {
        let tz = property.zone();
        let today = local_today(tz, now);
        let mut created = 0;
        for date in dates_in_horizon(def, today, self.deps.holidays.as_ref()) {
            if date == today && now > JobWindow::for_date(def, date, tz).no_show {
                continue;
            }
            if self.ensure_instance(def, date, now).await? {
                created += 1;
            }
        }
        tracing::info!(definition_id = %def.id, created, "Instances seeded");
        Ok(created)
    }

    /// Create the instance for `date` unless one exists. Returns whether it was created.
    pub(crate) async fn ensure_instance(
        &self,
        def: &JobDefinition,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> JobResult<bool> {
        let Some(estimate) = def.estimate_for(date.weekday()) else {
            return Ok(false);
        };
        let instance = JobInstance::open(def.id, date, estimate.base_pay, now);
        let created = self.store.insert_instance_if_absent(&instance).await?;
        if created {
            metrics::counter!("maintenance_instances_created_total").increment(1);
            tracing::debug!(definition_id = %def.id, service_date = %date, "Instance created");
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::view::BuildingAssignmentInput;

    fn request() -> DefinitionRequest {
        DefinitionRequest {
            property_id: Uuid::new_v4(),
            title: "Tower A evening".to_string(),
            description: None,
            assigned_units_by_building: vec![BuildingAssignmentInput {
                building_id: Uuid::new_v4(),
                unit_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
                floors: vec![2, 1],
            }],
            dumpster_ids: vec![Uuid::new_v4()],
            frequency: Frequency::Weekdays,
            weekdays: Vec::new(),
            interval_weeks: None,
            start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            end_date: None,
            skip_holidays: true,
            holiday_exceptions: Vec::new(),
            earliest_start_time: "18:00".to_string(),
            latest_start_time: "21:00".to_string(),
            start_time_hint: None,
            daily_estimates: None,
            global_base_pay: Some(40.0),
            global_estimated_time_minutes: Some(60),
            status: None,
        }
    }

    fn estimate(weekday: i16) -> WeekdayEstimateInput {
        WeekdayEstimateInput {
            weekday,
            base_pay: 30.0,
            estimated_time_minutes: 45,
        }
    }

    #[test]
    fn test_global_pay_covers_every_day() {
        let draft = validate_request(&request()).unwrap();
        assert_eq!(draft.estimates.len(), 7);
        assert_eq!(draft.start_time_hint, NaiveTime::from_hms_opt(19, 30, 0).unwrap());
    }

    #[test]
    fn test_missing_pay_input() {
        let mut req = request();
        req.global_base_pay = None;
        let err = validate_request(&req).unwrap_err();
        assert!(err.to_string().contains("missing pay estimate input"));
    }

    #[test]
    fn test_weekday_estimates_must_cover_schedule() {
        let mut req = request();
        req.daily_estimates = Some((1..=4).map(estimate).collect());
        assert!(matches!(validate_request(&req), Err(JobError::InvalidPayload(_))));

        req.daily_estimates = Some((1..=5).map(estimate).collect());
        assert_eq!(validate_request(&req).unwrap().estimates.len(), 5);
    }

    #[test]
    fn test_duplicate_weekday_rejected() {
        let mut req = request();
        let mut list: Vec<_> = (1..=5).map(estimate).collect();
        list.push(estimate(3));
        req.daily_estimates = Some(list);
        assert!(matches!(validate_request(&req), Err(JobError::InvalidPayload(_))));
    }

    #[test]
    fn test_custom_needs_weekdays_and_interval() {
        let mut req = request();
        req.frequency = Frequency::Custom;
        assert!(validate_request(&req).is_err());

        req.weekdays = vec![2, 4];
        req.interval_weeks = Some(0);
        assert!(validate_request(&req).is_err());

        req.interval_weeks = Some(2);
        let draft = validate_request(&req).unwrap();
        assert_eq!(draft.weekdays, vec![Weekday::Tue, Weekday::Thu]);
        assert_eq!(draft.interval_weeks, Some(2));
    }

    #[test]
    fn test_short_window_rejected() {
        let mut req = request();
        req.latest_start_time = "19:00".to_string();
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("07:05"),
            Ok(NaiveTime::from_hms_opt(7, 5, 0).unwrap())
        );
        assert_eq!(
            parse_time_of_day("07:05:30"),
            Ok(NaiveTime::from_hms_opt(7, 5, 30).unwrap())
        );
        assert!(parse_time_of_day("7pm").is_err());
    }
}
