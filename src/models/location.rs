use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::services::geo::Coordinates;

/// A device location fix sent with every on-site action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LocationReport {
    #[garde(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[garde(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    /// Horizontal accuracy radius reported by the device, in meters.
    #[garde(range(min = 0.0))]
    pub accuracy_meters: f64,

    /// Device clock at the time of the fix, milliseconds since the epoch.
    #[garde(skip)]
    pub timestamp_ms: i64,

    #[garde(skip)]
    #[serde(default)]
    pub is_mock: bool,
}

impl LocationReport {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
