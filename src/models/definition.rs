use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a definition repeats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekdays,
    Weekly,
    Biweekly,
    Monthly,
    Custom,
}

impl Frequency {
    /// Weekdays that must carry a pay estimate for this frequency.
    /// `Custom` defers to the definition's own weekday set.
    pub fn required_weekdays(self, custom: &[Weekday]) -> Vec<Weekday> {
        match self {
            Frequency::Daily | Frequency::Weekly | Frequency::Biweekly | Frequency::Monthly => {
                ALL_WEEKDAYS.to_vec()
            }
            Frequency::Weekdays => vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            Frequency::Custom => custom.to_vec(),
        }
    }
}

/// Sunday-first, matching the 0..=6 weekday numbering used on the wire.
pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DefinitionStatus {
    Active,
    Paused,
    Archived,
    Deleted,
}

/// Units covered in one building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingAssignment {
    pub building_id: Uuid,
    pub unit_ids: Vec<Uuid>,
    #[serde(default)]
    pub floors: Vec<i16>,
}

/// Per-weekday pay and time estimate.
///
/// `initial_*` values are set when the estimate is first written and anchor the
/// pay rescaling done after each completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPayEstimate {
    pub weekday: Weekday,
    pub base_pay: f64,
    pub estimated_time_minutes: i32,
    pub initial_base_pay: f64,
    pub initial_estimated_time_minutes: i32,
}

impl DailyPayEstimate {
    pub fn new(weekday: Weekday, base_pay: f64, estimated_time_minutes: i32) -> Self {
        Self {
            weekday,
            base_pay,
            estimated_time_minutes,
            initial_base_pay: base_pay,
            initial_estimated_time_minutes: estimated_time_minutes,
        }
    }
}

/// A recurring job template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub property_id: Uuid,
    pub title: String,
    pub description: Option<String>,

    pub assigned_units_by_building: Vec<BuildingAssignment>,
    pub dumpster_ids: Vec<Uuid>,
    /// Sorted, de-duplicated union of the building floors.
    pub floors: Vec<i16>,
    pub total_units: i32,

    pub frequency: Frequency,
    /// Only meaningful for `Frequency::Custom`.
    pub weekdays: Vec<Weekday>,
    /// Only meaningful for `Frequency::Custom`.
    pub interval_weeks: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub skip_holidays: bool,
    pub holiday_exceptions: Vec<NaiveDate>,

    /// Property-local, date-agnostic start window.
    pub earliest_start: NaiveTime,
    pub latest_start: NaiveTime,
    pub start_time_hint: NaiveTime,

    pub daily_pay_estimates: Vec<DailyPayEstimate>,

    pub status: DefinitionStatus,
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobDefinition {
    pub fn estimate_for(&self, weekday: Weekday) -> Option<&DailyPayEstimate> {
        self.daily_pay_estimates.iter().find(|e| e.weekday == weekday)
    }

    pub fn estimate_for_mut(&mut self, weekday: Weekday) -> Option<&mut DailyPayEstimate> {
        self.daily_pay_estimates
            .iter_mut()
            .find(|e| e.weekday == weekday)
    }

    pub fn is_active(&self) -> bool {
        self.status == DefinitionStatus::Active
    }

    pub fn includes_unit(&self, unit_id: Uuid) -> bool {
        self.assigned_units_by_building
            .iter()
            .any(|group| group.unit_ids.contains(&unit_id))
    }

    /// Recompute `floors` and `total_units` from the building groups.
    pub fn derive_assignment_fields(&mut self) {
        let mut floors: Vec<i16> = self
            .assigned_units_by_building
            .iter()
            .flat_map(|group| group.floors.iter().copied())
            .collect();
        floors.sort_unstable();
        floors.dedup();
        self.floors = floors;
        self.total_units = self
            .assigned_units_by_building
            .iter()
            .map(|group| group.unit_ids.len() as i32)
            .sum();
    }
}

/// Weekday as 0 (Sunday) ..= 6 (Saturday).
pub fn weekday_number(day: Weekday) -> i16 {
    day.num_days_from_sunday() as i16
}

pub fn weekday_from_number(n: i16) -> Option<Weekday> {
    usize::try_from(n).ok().and_then(|i| ALL_WEEKDAYS.get(i).copied())
}

/// Daily 18:00-21:00 definition with a $40 / 60 minute estimate on every weekday.
#[cfg(test)]
pub(crate) fn sample_definition() -> JobDefinition {
    let now = Utc::now();
    JobDefinition {
        id: Uuid::new_v4(),
        manager_id: Uuid::new_v4(),
        property_id: Uuid::new_v4(),
        title: "Evening run".to_string(),
        description: None,
        assigned_units_by_building: Vec::new(),
        dumpster_ids: Vec::new(),
        floors: Vec::new(),
        total_units: 0,
        frequency: Frequency::Daily,
        weekdays: Vec::new(),
        interval_weeks: None,
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        end_date: None,
        skip_holidays: false,
        holiday_exceptions: Vec::new(),
        earliest_start: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        latest_start: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        start_time_hint: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
        daily_pay_estimates: ALL_WEEKDAYS
            .iter()
            .map(|d| DailyPayEstimate::new(*d, 40.0, 60))
            .collect(),
        status: DefinitionStatus::Active,
        row_version: 1,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_assignment_fields() {
        let mut def = sample_definition();
        def.assigned_units_by_building = vec![
            BuildingAssignment {
                building_id: Uuid::new_v4(),
                unit_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
                floors: vec![3, 1],
            },
            BuildingAssignment {
                building_id: Uuid::new_v4(),
                unit_ids: vec![Uuid::new_v4()],
                floors: vec![1, 2],
            },
        ];
        def.derive_assignment_fields();
        assert_eq!(def.floors, vec![1, 2, 3]);
        assert_eq!(def.total_units, 3);
    }

    #[test]
    fn test_weekday_numbering() {
        assert_eq!(weekday_number(Weekday::Sun), 0);
        assert_eq!(weekday_number(Weekday::Sat), 6);
        assert_eq!(weekday_from_number(2), Some(Weekday::Tue));
        assert_eq!(weekday_from_number(7), None);
        assert_eq!(weekday_from_number(-1), None);
    }
}
