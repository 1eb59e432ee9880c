//! Trust-weighted release of newly unlocked job days.
//!
//! Near-term dates are visible to everyone. Each later date unlocks at local
//! midnight of its release day, delayed per worker by reliability score and
//! pulled forward an hour for residents of the property.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::models::worker::{MAX_RELIABILITY_SCORE, MIN_RELIABILITY_SCORE};
use crate::services::time_window::{local_midnight, local_today};

/// Days the open-jobs listing covers ahead of today.
pub const LISTING_WINDOW_DAYS: i64 = 8;
/// Dates before today + this many days are always visible.
pub const GUARANTEED_WINDOW_DAYS: i64 = LISTING_WINDOW_DAYS - 2;

pub const MAX_SHADOW_DELAY_MINUTES: i64 = 120;
pub const TENANT_BOOST_MINUTES: i64 = 60;

/// What the gate needs to know about the viewing worker.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseViewer {
    pub reliability_score: i32,
    /// Property the worker is a resident tenant of, if any.
    pub tenant_property_id: Option<Uuid>,
}

/// Extra wait imposed on lower-scored workers.
pub fn shadow_delay(score: i32) -> Duration {
    let score = i64::from(score.clamp(MIN_RELIABILITY_SCORE, MAX_RELIABILITY_SCORE));
    let shortfall = i64::from(MAX_RELIABILITY_SCORE) - score;
    Duration::minutes(MAX_SHADOW_DELAY_MINUTES * shortfall / 100)
}

/// The instant `viewer` may first see a job for `service_date`, or `None` when
/// the date is inside the guaranteed window.
pub fn release_instant(
    service_date: NaiveDate,
    property_id: Uuid,
    tz: Tz,
    now: DateTime<Utc>,
    viewer: &ReleaseViewer,
) -> Option<DateTime<Utc>> {
    let today = local_today(tz, now);
    let days_ahead = (service_date - today).num_days();
    if days_ahead < GUARANTEED_WINDOW_DAYS {
        return None;
    }

    let release_day = today + Duration::days(days_ahead - GUARANTEED_WINDOW_DAYS);
    let mut release = local_midnight(tz, release_day);
    if viewer.tenant_property_id == Some(property_id) {
        release -= Duration::minutes(TENANT_BOOST_MINUTES);
    }
    Some(release + shadow_delay(viewer.reliability_score))
}

pub fn is_released(
    service_date: NaiveDate,
    property_id: Uuid,
    tz: Tz,
    now: DateTime<Utc>,
    viewer: &ReleaseViewer,
) -> bool {
    match release_instant(service_date, property_id, tz, now, viewer) {
        None => true,
        Some(at) => now >= at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn viewer(score: i32) -> ReleaseViewer {
        ReleaseViewer {
            reliability_score: score,
            tenant_property_id: None,
        }
    }

    #[test]
    fn test_shadow_delay() {
        assert_eq!(shadow_delay(100), Duration::zero());
        assert_eq!(shadow_delay(70), Duration::minutes(36));
        assert_eq!(shadow_delay(0), Duration::minutes(120));
        assert_eq!(shadow_delay(150), Duration::zero());
        assert_eq!(shadow_delay(-5), Duration::minutes(120));
        // 120 * 33 / 100 truncates
        assert_eq!(shadow_delay(67), Duration::minutes(39));
    }

    #[test]
    fn test_guaranteed_window_always_visible() {
        let tz = chrono_tz::America::Denver;
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap();
        let today = local_today(tz, now);
        let property = Uuid::new_v4();
        for offset in 0..GUARANTEED_WINDOW_DAYS {
            let date = today + Duration::days(offset);
            assert!(is_released(date, property, tz, now, &viewer(0)));
        }
    }

    #[test]
    fn test_day_six_rollout() {
        let tz = chrono_tz::America::Denver;
        let property = Uuid::new_v4();
        // Local midnight 2025-06-10 in Denver (MDT, UTC-6)
        let midnight = Utc.with_ymd_and_hms(2025, 6, 10, 6, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();

        assert!(is_released(date, property, tz, midnight, &viewer(100)));
        // A second earlier the date is still a day beyond the batch
        assert!(!is_released(
            date,
            property,
            tz,
            midnight - Duration::seconds(1),
            &viewer(100)
        ));

        let plus_35 = midnight + Duration::minutes(35);
        let plus_36 = midnight + Duration::minutes(36);
        assert!(!is_released(date, property, tz, plus_35, &viewer(70)));
        assert!(is_released(date, property, tz, plus_36, &viewer(70)));
    }

    #[test]
    fn test_tenant_sees_an_hour_earlier() {
        let tz = chrono_tz::America::Denver;
        let property = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 17).unwrap();
        let tenant = ReleaseViewer {
            reliability_score: 70,
            tenant_property_id: Some(property),
        };

        let plain = release_instant(date, property, tz, now, &viewer(70)).unwrap();
        let boosted = release_instant(date, property, tz, now, &tenant).unwrap();
        assert_eq!(plain - boosted, Duration::hours(1));
    }

    #[test]
    fn test_tenant_of_other_property_gets_no_boost() {
        let tz = Tz::UTC;
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 17).unwrap();
        let elsewhere = ReleaseViewer {
            reliability_score: 100,
            tenant_property_id: Some(Uuid::new_v4()),
        };
        let property = Uuid::new_v4();
        assert_eq!(
            release_instant(date, property, tz, now, &elsewhere),
            release_instant(date, property, tz, now, &viewer(100))
        );
    }
}
