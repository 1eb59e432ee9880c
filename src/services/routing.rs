use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::services::geo::{Coordinates, METERS_PER_MILE};

/// Drive-time minutes per crow-flies mile when no routing API answers.
pub const CROW_FLIES_MINUTES_PER_MILE: f64 = 2.0;
const ROUTING_TIMEOUT: Duration = Duration::from_secs(3);
const ROUTES_URL: &str = "https://routes.googleapis.com/directions/v2:computeRoutes";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteEstimate {
    pub distance_miles: f64,
    pub travel_minutes: i64,
}

impl RouteEstimate {
    pub fn crow_flies(origin: &Coordinates, destination: &Coordinates) -> Self {
        let miles = origin.distance_miles(destination);
        Self {
            distance_miles: miles,
            travel_minutes: (miles * CROW_FLIES_MINUTES_PER_MILE).round() as i64,
        }
    }
}

/// Driving distance between two points. Never fails: implementations fall
/// back to a crow-flies estimate.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(&self, origin: Coordinates, destination: Coordinates) -> RouteEstimate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CrowFliesRouting;

#[async_trait]
impl RoutingProvider for CrowFliesRouting {
    async fn route(&self, origin: Coordinates, destination: Coordinates) -> RouteEstimate {
        RouteEstimate::crow_flies(&origin, &destination)
    }
}

/// Google Routes API client.
pub struct RoutesApiClient {
    http: Client,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRoutesRequest {
    origin: Waypoint,
    destination: Waypoint,
    travel_mode: &'static str,
}

#[derive(Serialize)]
struct Waypoint {
    location: WaypointLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WaypointLocation {
    lat_lng: LatLng,
}

#[derive(Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct ComputeRoutesResponse {
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRoute {
    distance_meters: Option<f64>,
    /// Seconds with an "s" suffix, e.g. "754s".
    duration: Option<String>,
}

impl Waypoint {
    fn at(point: Coordinates) -> Self {
        Self {
            location: WaypointLocation {
                lat_lng: LatLng {
                    latitude: point.latitude,
                    longitude: point.longitude,
                },
            },
        }
    }
}

impl RoutesApiClient {
    pub fn new(api_key: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(ROUTING_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
        })
    }

    async fn compute(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Option<RouteEstimate>, reqwest::Error> {
        let body = ComputeRoutesRequest {
            origin: Waypoint::at(origin),
            destination: Waypoint::at(destination),
            travel_mode: "DRIVE",
        };
        let response: ComputeRoutesResponse = self
            .http
            .post(ROUTES_URL)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", "routes.distanceMeters,routes.duration")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.routes.first().and_then(|route| {
            let meters = route.distance_meters?;
            let seconds = parse_duration_secs(route.duration.as_deref()?)?;
            Some(RouteEstimate {
                distance_miles: meters / METERS_PER_MILE,
                travel_minutes: (seconds / 60.0).round() as i64,
            })
        }))
    }
}

fn parse_duration_secs(raw: &str) -> Option<f64> {
    raw.trim_end_matches('s').parse::<f64>().ok()
}

#[async_trait]
impl RoutingProvider for RoutesApiClient {
    async fn route(&self, origin: Coordinates, destination: Coordinates) -> RouteEstimate {
        match self.compute(origin, destination).await {
            Ok(Some(estimate)) => estimate,
            Ok(None) => {
                tracing::debug!("Routes API returned no route, using crow-flies estimate");
                RouteEstimate::crow_flies(&origin, &destination)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Routes API request failed, using crow-flies estimate");
                RouteEstimate::crow_flies(&origin, &destination)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crow_flies_fallback() {
        let a = Coordinates::new(30.2672, -97.7431);
        let b = Coordinates::new(30.2672, -97.6431);
        let estimate = RouteEstimate::crow_flies(&a, &b);
        assert!((estimate.distance_miles - 5.96).abs() < 0.1);
        assert_eq!(
            estimate.travel_minutes,
            (estimate.distance_miles * 2.0).round() as i64
        );
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_secs("754s"), Some(754.0));
        assert_eq!(parse_duration_secs("bogus"), None);
    }
}
