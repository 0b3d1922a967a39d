//! Errors raised by the tracking core.

/// Errors that can occur while tracking a route.
///
/// All of them are local and recoverable; none leave the tracker in a
/// half-applied state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackerError {
    #[error("route has no waypoints")]
    EmptyRoute,

    #[error("waypoint index {index} out of range (route has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("waypoint {index} is already reached or skipped")]
    WaypointResolved { index: usize },

    #[error("no active target: the route is completed or not loaded")]
    NoActiveTarget,
}

/// Errors reported by a location source.
///
/// Kept apart from [`TrackerError`]: a source error never touches tracking state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PositionSourceError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("timed out waiting for a position")]
    Timeout,

    #[error("malformed position input: {0}")]
    Decode(String),
}

pub type Result<T> = core::result::Result<T, TrackerError>;
