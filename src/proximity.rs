//! Proximity evaluation: how far the user is from the route.
//!
//! Pure functions over a position fix and the store. The scan over pending
//! waypoints is linear; routes hold tens of waypoints, not millions.

use serde::Serialize;

use crate::geo::{Coordinate, haversine};
use crate::model::{Zone, ZoneThresholds};
use crate::store::WaypointStore;

/// Distance to the current target and the ring it falls in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDistance {
    pub index: usize,
    pub distance_meters: f64,
    pub zone: Zone,
}

/// The closest pending waypoint that is not the current target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub index: usize,
    pub distance_meters: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityResult {
    /// `None` when no route is loaded or the route is completed.
    pub current: Option<TargetDistance>,
    pub arrived_at_current: bool,
    pub nearest_pending_other: Option<Candidate>,
}

impl ProximityResult {
    /// The nearest other pending waypoint, if it lies inside the arrival radius.
    pub fn candidate_within(&self, radius: f64) -> Option<&Candidate> {
        self.nearest_pending_other
            .as_ref()
            .filter(|c| c.distance_meters <= radius)
    }
}

/// Evaluate one position against the route.
pub fn evaluate(
    position: Coordinate,
    store: &WaypointStore,
    thresholds: &ZoneThresholds,
) -> ProximityResult {
    let current_index = store.current_target_index();

    let current = current_index.and_then(|index| {
        let waypoint = store.waypoint_at(index).ok()?;
        let distance_meters = haversine(position, waypoint.coordinate());
        Some(TargetDistance {
            index,
            distance_meters,
            zone: Zone::classify(distance_meters, thresholds),
        })
    });

    let arrived_at_current = current.is_some_and(|c| c.distance_meters <= thresholds.arrival);

    let mut nearest: Option<(usize, f64)> = None;
    for (index, waypoint) in store.waypoints().iter().enumerate() {
        if Some(index) == current_index || !waypoint.is_pending() {
            continue;
        }
        let distance = haversine(position, waypoint.coordinate());
        // Strictly less keeps the lowest index on ties.
        if nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((index, distance));
        }
    }

    let nearest_pending_other = nearest.map(|(index, distance_meters)| Candidate {
        index,
        distance_meters,
        name: store.waypoints()[index].name.clone(),
    });

    ProximityResult {
        current,
        arrived_at_current,
        nearest_pending_other,
    }
}
