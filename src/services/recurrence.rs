//! Which calendar dates a definition produces a job on.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::models::definition::{Frequency, JobDefinition};
use crate::services::holidays::HolidayCalendar;

/// Days of instances kept ahead, counting today.
pub const SEED_HORIZON_DAYS: i64 = 7;

pub fn occurs_on(def: &JobDefinition, date: NaiveDate, holidays: &dyn HolidayCalendar) -> bool {
    if date < def.start_date {
        return false;
    }
    if def.end_date.is_some_and(|end| date > end) {
        return false;
    }
    if def.skip_holidays && holidays.is_holiday(date) && !def.holiday_exceptions.contains(&date) {
        return false;
    }
    let weekday = date.weekday();
    if def.estimate_for(weekday).is_none() {
        return false;
    }

    match def.frequency {
        Frequency::Daily => true,
        Frequency::Weekdays => !matches!(weekday, Weekday::Sat | Weekday::Sun),
        Frequency::Weekly => weekday == def.start_date.weekday(),
        Frequency::Biweekly => {
            weekday == def.start_date.weekday() && weeks_between(def.start_date, date) % 2 == 0
        }
        Frequency::Monthly => matches_day_of_month(def.start_date, date),
        Frequency::Custom => {
            if !def.weekdays.contains(&weekday) {
                return false;
            }
            let Some(interval) = def.interval_weeks.filter(|i| *i > 0) else {
                return false;
            };
            let weeks = weeks_between(def.start_date, date);
            weeks >= 0 && weeks % i64::from(interval) == 0
        }
    }
}

/// Whole weeks between the Sunday-starting weeks containing `from` and `to`.
fn weeks_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (week_start(to) - week_start(from)).num_days() / 7
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Same day of month; definitions started after the 28th land on the last
/// day of shorter months.
fn matches_day_of_month(start: NaiveDate, date: NaiveDate) -> bool {
    let start_day = start.day();
    if start_day > 28 && date.day() < start_day {
        return is_last_day_of_month(date);
    }
    date.day() == start_day
}

fn is_last_day_of_month(date: NaiveDate) -> bool {
    date
        .succ_opt()
        .map_or(true, |next| next.month() != date.month())
}

/// Dates from `from` through the seed horizon that the definition selects.
pub fn dates_in_horizon(
    def: &JobDefinition,
    from: NaiveDate,
    holidays: &dyn HolidayCalendar,
) -> Vec<NaiveDate> {
    (0..SEED_HORIZON_DAYS)
        .map(|offset| from + Duration::days(offset))
        .filter(|date| occurs_on(def, *date, holidays))
        .collect()
}
