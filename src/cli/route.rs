//! Route file commands and the route-file reader.
//!
//! A route file is a JSON array of waypoints as produced by an external
//! decoder (e.g. from the `<wpt>` elements of a GPX file):
//!
//! ```json
//! [{"latitude": 41.8902, "longitude": 12.4922, "name": "Colosseo", "elevation": 21.0}]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::geo;
use crate::model::{Waypoint, WaypointInput};

use super::format::{format_distance, format_waypoint};

#[derive(Debug, Subcommand)]
pub enum RouteCommand {
    /// Show a route: waypoint count, total length, and each waypoint.
    Show {
        /// Route file (JSON array of waypoints).
        file: PathBuf,
    },
}

/// Read and decode a route file.
///
/// An empty array is reported here, with one explanatory message, rather
/// than handed to the tracker.
pub(super) fn read_route(path: &Path) -> Result<Vec<WaypointInput>, String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let waypoints: Vec<WaypointInput> = serde_json::from_str(&json)
        .map_err(|e| format!("invalid route file {}: {e}", path.display()))?;
    if waypoints.is_empty() {
        return Err(format!(
            "no waypoints found in {}\n\
             The route file must contain at least one waypoint.",
            path.display()
        ));
    }
    Ok(waypoints)
}

pub(super) fn cmd_show(file: &Path) -> Result<(), String> {
    let waypoints: Vec<Waypoint> = read_route(file)?
        .into_iter()
        .map(Waypoint::from)
        .collect();

    let length = geo::route_length(waypoints.iter().map(Waypoint::coordinate));
    println!(
        "{} waypoints, {} total",
        waypoints.len(),
        format_distance(length)
    );
    for (i, wp) in waypoints.iter().enumerate() {
        println!("{}", format_waypoint(i, wp));
    }

    Ok(())
}
