use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::geo::Coordinates;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone identifier, e.g. "America/Chicago".
    pub timezone: String,
}

impl Property {
    /// The property's zone. Unknown or empty identifiers fall back to UTC.
    pub fn zone(&self) -> Tz {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!(
                    property_id = %self.id,
                    timezone = %self.timezone,
                    "Unrecognized property timezone, using UTC"
                );
                Tz::UTC
            }
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub property_id: Uuid,
    pub building_id: Uuid,
    pub unit_number: String,
    pub floor: Option<i16>,
    /// Resident token a worker can present to claim tenancy.
    pub tenant_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dumpster {
    pub id: Uuid,
    pub property_id: Uuid,
    pub dumpster_number: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Dumpster {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
