//! Great-circle distance on a spherical Earth.
//!
//! Arrival detection and route-length display both go through [`haversine`]
//! so the two always agree.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Haversine distance between two coordinates, in meters.
pub fn haversine(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Sum of consecutive leg lengths, in meters.
pub fn route_length(points: impl IntoIterator<Item = Coordinate>) -> f64 {
    let mut total = 0.0;
    let mut previous: Option<Coordinate> = None;
    for point in points {
        if let Some(prev) = previous {
            total += haversine(prev, point);
        }
        previous = Some(point);
    }
    total
}
