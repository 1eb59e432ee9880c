use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::models::location::LocationReport;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
pub const METERS_PER_MILE: f64 = 1609.344;

/// Radius a worker must be inside to accept a job.
pub const ACCEPT_RADIUS_MILES: f64 = 75.0;
/// On-site radius for start, unit photos, and dumpster drops.
pub const ON_SITE_RADIUS_METERS: f64 = 200.0;

pub const MAX_ACCURACY_METERS: f64 = 30.0;
pub const MAX_CLOCK_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in meters.
    pub fn distance_meters(&self, other: &Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlng = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_METERS * c
    }

    pub fn distance_miles(&self, other: &Coordinates) -> f64 {
        self.distance_meters(other) / METERS_PER_MILE
    }

    pub fn within_meters(&self, other: &Coordinates, radius: f64) -> bool {
        self.distance_meters(other) <= radius
    }
}

/// Reject a location fix that is malformed, imprecise, stale, or spoofed.
///
/// Out-of-range coordinates are a payload error; everything else is a
/// location rejection.
pub fn check_location_report(report: &LocationReport, now: DateTime<Utc>) -> Result<(), JobError> {
    report
        .validate()
        .map_err(|e| JobError::InvalidPayload(e.to_string()))?;

    if report.is_mock {
        return Err(JobError::LocationOutOfBounds(
            "mock locations are not accepted".to_string(),
        ));
    }
    if report.accuracy_meters > MAX_ACCURACY_METERS {
        return Err(JobError::LocationOutOfBounds(format!(
            "GPS accuracy {:.0}m exceeds {:.0}m",
            report.accuracy_meters, MAX_ACCURACY_METERS
        )));
    }
    let skew_ms = (now.timestamp_millis() - report.timestamp_ms).abs();
    if skew_ms > MAX_CLOCK_SKEW_SECS * 1000 {
        return Err(JobError::LocationOutOfBounds(
            "location timestamp is stale".to_string(),
        ));
    }
    Ok(())
}

/// Validate the fix and require it within `radius` meters of `target`.
pub fn require_on_site(
    report: &LocationReport,
    target: &Coordinates,
    radius: f64,
    now: DateTime<Utc>,
) -> Result<(), JobError> {
    check_location_report(report, now)?;
    if !report.coordinates().within_meters(target, radius) {
        return Err(JobError::LocationOutOfBounds(format!(
            "more than {radius:.0}m from the property"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn report_at(lat: f64, lng: f64, now: DateTime<Utc>) -> LocationReport {
        LocationReport {
            latitude: lat,
            longitude: lng,
            accuracy_meters: 8.0,
            timestamp_ms: now.timestamp_millis(),
            is_mock: false,
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // Austin to Dallas is roughly 182 miles
        let austin = Coordinates::new(30.2672, -97.7431);
        let dallas = Coordinates::new(32.7767, -96.7970);
        let miles = austin.distance_miles(&dallas);
        assert!((miles - 182.0).abs() < 3.0, "got {miles}");
    }

    #[test]
    fn test_zero_distance() {
        let p = Coordinates::new(40.0, -74.0);
        assert!(p.distance_meters(&p) < 1e-6);
    }

    #[test]
    fn test_on_site_radius() {
        let now = Utc::now();
        let property = Coordinates::new(30.0, -97.0);
        // ~111m north
        assert!(require_on_site(&report_at(30.001, -97.0, now), &property, 200.0, now).is_ok());
        // ~333m north
        let err = require_on_site(&report_at(30.003, -97.0, now), &property, 200.0, now).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LocationOutOfBounds);
    }

    #[test]
    fn test_rejects_mock_and_inaccurate() {
        let now = Utc::now();
        let mut report = report_at(30.0, -97.0, now);
        report.is_mock = true;
        assert_eq!(
            check_location_report(&report, now).unwrap_err().kind(),
            ErrorKind::LocationOutOfBounds
        );

        let mut report = report_at(30.0, -97.0, now);
        report.accuracy_meters = 45.0;
        assert_eq!(
            check_location_report(&report, now).unwrap_err().kind(),
            ErrorKind::LocationOutOfBounds
        );
    }

    #[test]
    fn test_rejects_stale_timestamp() {
        let now = Utc::now();
        let mut report = report_at(30.0, -97.0, now);
        report.timestamp_ms -= 31_000;
        assert!(check_location_report(&report, now).is_err());
        report.timestamp_ms += 2_000;
        assert!(check_location_report(&report, now).is_ok());
    }

    #[test]
    fn test_out_of_range_latitude_is_invalid_payload() {
        let now = Utc::now();
        let report = report_at(91.0, -97.0, now);
        assert_eq!(
            check_location_report(&report, now).unwrap_err().kind(),
            ErrorKind::InvalidPayload
        );
    }
}
