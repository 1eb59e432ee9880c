//! Property-local time anchors.
//!
//! Definitions store wall-clock times without a date or zone. They only become
//! instants once combined with a service date and the property's zone.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::definition::JobDefinition;

/// No-show time is this long before latest start.
pub const NO_SHOW_LEAD_MINUTES: i64 = 20;
/// Acceptance closes this long before the no-show time.
pub const ACCEPTANCE_LEAD_MINUTES: i64 = 20;
/// Unclaimed OPEN jobs are cancelled inside this many minutes of latest start.
pub const DISPATCH_CANCEL_LEAD_MINUTES: i64 = 20;

pub const MIN_WINDOW_MINUTES: i64 = 90;
pub const MIN_AUTO_HINT_WINDOW_MINUTES: i64 = 100;
pub const HINT_LEAD_MINUTES: i64 = 50;

/// Resolve a local date and wall-clock time to an instant.
///
/// Ambiguous times take the earlier mapping. Times inside a DST gap are pushed
/// forward an hour.
pub fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}

/// Start of the local day.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    localize(tz, date, NaiveTime::MIN)
}

/// The calendar date in `tz` at `now`.
pub fn local_today(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// All time anchors for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobWindow {
    pub earliest_start: DateTime<Utc>,
    pub latest_start: DateTime<Utc>,
    pub start_hint: DateTime<Utc>,
    pub no_show: DateTime<Utc>,
    pub acceptance_cutoff: DateTime<Utc>,
}

impl JobWindow {
    pub fn for_date(def: &JobDefinition, service_date: NaiveDate, tz: Tz) -> Self {
        let earliest_start = localize(tz, service_date, def.earliest_start);
        let latest_start = localize(tz, service_date, def.latest_start);
        let start_hint = localize(tz, service_date, def.start_time_hint);
        let no_show = latest_start - Duration::minutes(NO_SHOW_LEAD_MINUTES);
        let acceptance_cutoff = no_show - Duration::minutes(ACCEPTANCE_LEAD_MINUTES);
        Self {
            earliest_start,
            latest_start,
            start_hint,
            no_show,
            acceptance_cutoff,
        }
    }

    pub fn can_start_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.earliest_start && now <= self.latest_start
    }

    /// Still OPEN this close to latest start means nobody is coming.
    pub fn in_dispatch_cancel_window(&self, now: DateTime<Utc>) -> bool {
        now > self.latest_start - Duration::minutes(DISPATCH_CANCEL_LEAD_MINUTES)
            && now < self.latest_start
    }
}

/// Check a definition's time-of-day window and settle its start hint.
///
/// Returns the hint to store: the given one, or the window midpoint.
pub fn resolve_start_window(
    earliest: NaiveTime,
    latest: NaiveTime,
    hint: Option<NaiveTime>,
) -> Result<NaiveTime, String> {
    if latest <= earliest {
        return Err("latest start must be after earliest start".to_string());
    }
    let span = latest - earliest;
    if span < Duration::minutes(MIN_WINDOW_MINUTES) {
        return Err(format!(
            "start window must be at least {MIN_WINDOW_MINUTES} minutes"
        ));
    }

    match hint {
        Some(hint) => {
            if hint < earliest {
                return Err("start time hint is before earliest start".to_string());
            }
            if hint > latest - Duration::minutes(HINT_LEAD_MINUTES) {
                return Err(format!(
                    "start time hint must be at least {HINT_LEAD_MINUTES} minutes before latest start"
                ));
            }
            Ok(hint)
        }
        None => {
            if span < Duration::minutes(MIN_AUTO_HINT_WINDOW_MINUTES) {
                return Err(format!(
                    "start window must be at least {MIN_AUTO_HINT_WINDOW_MINUTES} minutes to derive a hint"
                ));
            }
            Ok(earliest + span / 2)
        }
    }
}

/// Render an instant as property-local "HH:MM".
pub fn format_local_hhmm(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::definition::sample_definition;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_window_anchors_in_property_zone() {
        let def = sample_definition();
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let window = JobWindow::for_date(&def, date, chrono_tz::America::Chicago);

        // 21:00 CDT is 02:00 UTC the next day
        assert_eq!(
            window.latest_start,
            Utc.with_ymd_and_hms(2025, 7, 2, 2, 0, 0).unwrap()
        );
        assert_eq!(
            window.no_show,
            Utc.with_ymd_and_hms(2025, 7, 2, 1, 40, 0).unwrap()
        );
        assert_eq!(
            window.acceptance_cutoff,
            Utc.with_ymd_and_hms(2025, 7, 2, 1, 20, 0).unwrap()
        );
        assert_eq!(
            window.earliest_start,
            Utc.with_ymd_and_hms(2025, 7, 1, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_dst_gap_moves_forward() {
        // 02:30 does not exist in New York on 2025-03-09
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let instant = localize(chrono_tz::America::New_York, date, t(2, 30));
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 3, 9, 7, 30, 0).unwrap());
    }

    #[test]
    fn test_resolve_start_window() {
        assert_eq!(resolve_start_window(t(18, 0), t(21, 0), None), Ok(t(19, 30)));
        assert_eq!(
            resolve_start_window(t(18, 0), t(21, 0), Some(t(20, 10))),
            Ok(t(20, 10))
        );
        assert!(resolve_start_window(t(18, 0), t(21, 0), Some(t(20, 11))).is_err());
        assert!(resolve_start_window(t(18, 0), t(21, 0), Some(t(17, 59))).is_err());
        assert!(resolve_start_window(t(18, 0), t(19, 29), None).is_err());
        assert!(resolve_start_window(t(21, 0), t(18, 0), None).is_err());
    }

    #[test]
    fn test_auto_hint_needs_longer_window() {
        // 95 minutes is long enough for an explicit hint but not a derived one
        assert!(resolve_start_window(t(18, 0), t(19, 35), None).is_err());
        assert!(resolve_start_window(t(18, 0), t(19, 35), Some(t(18, 30))).is_ok());
    }

    #[test]
    fn test_start_window_is_inclusive() {
        let def = sample_definition();
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let window = JobWindow::for_date(&def, date, Tz::UTC);
        assert!(window.can_start_at(window.earliest_start));
        assert!(window.can_start_at(window.latest_start));
        assert!(!window.can_start_at(window.earliest_start - Duration::seconds(1)));
        assert!(!window.can_start_at(window.latest_start + Duration::seconds(1)));
    }

    #[test]
    fn test_dispatch_cancel_window() {
        let def = sample_definition();
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let window = JobWindow::for_date(&def, date, Tz::UTC);
        assert!(!window.in_dispatch_cancel_window(window.latest_start - Duration::minutes(20)));
        assert!(window.in_dispatch_cancel_window(window.latest_start - Duration::minutes(19)));
        assert!(!window.in_dispatch_cancel_window(window.latest_start));
    }
}
