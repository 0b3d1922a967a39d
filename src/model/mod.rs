//! Core data model for Waymark.
//!
//! These types describe a tracking session from the outside:
//! waypoints and the route they form, position fixes, proximity zones,
//! progress counters, the reached log, and the events a session emits.

mod position;
mod progress;
mod waypoint;
mod zone;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use position::PositionFix;
pub use progress::{ProgressStats, ReachedEntry, ReachedLogExport};
pub use waypoint::{Waypoint, WaypointInput, WaypointStatus};
pub use zone::{Zone, ZoneThresholds};

/// Something a presentation layer should render.
///
/// Tagged enum so each event is self-describing when written as a JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TrackerEvent {
    /// A new route replaced whatever was live before.
    RouteLoaded { session: Uuid, total: usize },

    /// The current-target pointer moved, or the target at the pointer changed.
    TargetChanged {
        index: usize,
        name: String,
        thresholds: ZoneThresholds,
    },

    /// The user crossed into a different ring around the current target.
    ZoneChanged {
        index: usize,
        zone: Zone,
        distance_meters: f64,
    },

    WaypointReached { entry: ReachedEntry },

    WaypointSkipped { index: usize, name: String },

    /// Counter snapshot, emitted after every mutation.
    Stats(ProgressStats),

    /// A closer pending waypoint was found; switching is offered.
    PromptOffered {
        offer_id: Uuid,
        candidate_index: usize,
        candidate_name: String,
        deadline_ms: i64,
    },

    PromptResolved {
        offer_id: Uuid,
        resolution: Resolution,
    },

    /// The pointer moved past the last pending waypoint.
    RouteCompleted,

    /// The location source reported an error. Tracking state is unchanged.
    PositionLost { message: String },
}

/// How a switch offer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// The user accepted; the route was re-sequenced.
    Accepted,

    /// The user declined; nothing changed.
    Declined,

    /// Nobody answered before the deadline; resolved like `Accepted`.
    TimedOut,

    /// The offer no longer applied (the target moved on or a new route was loaded).
    Withdrawn,
}
