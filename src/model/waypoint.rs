//! Waypoint types: the points a route is made of.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A waypoint as handed over by the route-file decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointInput {
    pub latitude: f64,
    pub longitude: f64,

    /// Display name. Unnamed points are called "Waypoint".
    #[serde(default = "default_name")]
    pub name: String,

    /// Elevation in meters, when the route file has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,

    /// The route file's own timestamp for this point, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

fn default_name() -> String {
    "Waypoint".to_string()
}

/// A waypoint on the live route.
///
/// Identity is its index in the route; there is no separate ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub elevation: Option<f64>,
    pub source_timestamp: Option<String>,
    pub status: WaypointStatus,
    pub reached_at: Option<Timestamp>,
}

impl Waypoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn is_pending(&self) -> bool {
        self.status == WaypointStatus::Pending
    }
}

impl From<WaypointInput> for Waypoint {
    fn from(input: WaypointInput) -> Self {
        Self {
            latitude: input.latitude,
            longitude: input.longitude,
            name: input.name,
            elevation: input.elevation,
            source_timestamp: input.time,
            status: WaypointStatus::Pending,
            reached_at: None,
        }
    }
}

/// Where a waypoint stands. `Reached` and `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaypointStatus {
    Pending,
    Reached,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_defaults_missing_name() {
        let input: WaypointInput =
            serde_json::from_str(r#"{"latitude": 41.9, "longitude": 12.5}"#).unwrap();
        assert_eq!(input.name, "Waypoint");
        assert!(input.elevation.is_none());
        assert!(input.time.is_none());
    }

    #[test]
    fn conversion_starts_pending() {
        let input = WaypointInput {
            latitude: 41.9,
            longitude: 12.5,
            name: "Colosseo".into(),
            elevation: Some(21.0),
            time: Some("2024-05-01T08:00:00Z".into()),
        };
        let waypoint = Waypoint::from(input);

        assert!(waypoint.is_pending());
        assert!(waypoint.reached_at.is_none());
        assert_eq!(waypoint.source_timestamp.as_deref(), Some("2024-05-01T08:00:00Z"));
    }
}
