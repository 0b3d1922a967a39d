//! Proximity zones around the current target.

use serde::{Deserialize, Serialize};

/// The three concentric radii, in meters.
///
/// `arrival <= mid <= outer` is expected; the core does not enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneThresholds {
    pub outer: f64,
    pub mid: f64,
    pub arrival: f64,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            outer: 200.0,
            mid: 100.0,
            arrival: 50.0,
        }
    }
}

impl ZoneThresholds {
    pub fn is_ordered(&self) -> bool {
        self.arrival <= self.mid && self.mid <= self.outer
    }
}

/// Which ring the user is in, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Zone {
    Arrival,
    Mid,
    Outer,
    Outside,
}

impl Zone {
    /// Classify a distance. Bounds are inclusive.
    pub fn classify(distance: f64, thresholds: &ZoneThresholds) -> Self {
        if distance <= thresholds.arrival {
            Self::Arrival
        } else if distance <= thresholds.mid {
            Self::Mid
        } else if distance <= thresholds.outer {
            Self::Outer
        } else {
            Self::Outside
        }
    }
}
