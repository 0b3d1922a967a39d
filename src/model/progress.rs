//! Progress types: counters and the reached log.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Waypoint;

/// Per-status waypoint counts.
///
/// `reached + skipped + remaining == total` after every mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total: usize,
    pub reached: usize,
    pub remaining: usize,
    pub skipped: usize,
}

impl ProgressStats {
    /// Fresh counters for a route of `total` waypoints.
    pub fn for_route(total: usize) -> Self {
        Self {
            total,
            reached: 0,
            remaining: total,
            skipped: 0,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.reached + self.skipped + self.remaining == self.total
    }
}

/// A snapshot of a waypoint at the moment it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachedEntry {
    /// Route index at the time of reaching.
    pub index: usize,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<String>,
    pub reached_at: Timestamp,
}

impl ReachedEntry {
    pub fn snapshot(index: usize, waypoint: &Waypoint, reached_at: Timestamp) -> Self {
        Self {
            index,
            name: waypoint.name.clone(),
            latitude: waypoint.latitude,
            longitude: waypoint.longitude,
            elevation: waypoint.elevation,
            source_timestamp: waypoint.source_timestamp.clone(),
            reached_at,
        }
    }
}

/// The reached log of one session, as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachedLogExport {
    pub session: Uuid,
    pub exported_at: Timestamp,
    pub stats: ProgressStats,
    pub entries: Vec<ReachedEntry>,
}
