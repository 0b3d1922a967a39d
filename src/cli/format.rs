//! Output formatting for CLI display.

use crate::model::{ProgressStats, ReachedEntry, Waypoint, WaypointStatus};

/// Meters below one kilometer, kilometers with one decimal above.
pub(super) fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

pub(super) fn format_stats(stats: &ProgressStats) -> String {
    format!(
        "{} of {} reached, {} skipped, {} remaining",
        stats.reached, stats.total, stats.skipped, stats.remaining
    )
}

pub(super) fn format_waypoint(index: usize, waypoint: &Waypoint) -> String {
    let status = match waypoint.status {
        WaypointStatus::Pending => "pending",
        WaypointStatus::Reached => "reached",
        WaypointStatus::Skipped => "skipped",
    };
    let elevation = waypoint
        .elevation
        .map_or_else(|| "N/A".to_string(), |e| format!("{e:.0} m"));
    format!(
        "{index:>3}  [{status}]  {:<24} {:>10.5} {:>10.5}  ele {elevation}",
        waypoint.name, waypoint.latitude, waypoint.longitude
    )
}

pub(super) fn format_entry(entry: &ReachedEntry) -> String {
    format!(
        "{}  #{:<3} {}",
        entry.reached_at, entry.index, entry.name
    )
}
