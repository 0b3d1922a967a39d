//! Position fixes delivered by a location source.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// One reading from the location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,

    /// Reported horizontal accuracy in meters.
    #[serde(default)]
    pub accuracy: f64,

    /// Unix epoch milliseconds at which the fix was taken.
    pub timestamp_ms: i64,
}

impl PositionFix {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// The fix time, or `None` when `timestamp_ms` is outside the representable range.
    pub fn timestamp(&self) -> Option<Timestamp> {
        Timestamp::from_millisecond(self.timestamp_ms).ok()
    }
}
