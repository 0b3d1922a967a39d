//! Waypoint store: the live route and the current-target pointer.
//!
//! The store holds exactly one route. Statuses and the pointer are only
//! changed through the crate-private setters, which the progression engine
//! and the switch-prompt coordinator call.

use crate::error::{Result, TrackerError};
use crate::model::{Waypoint, WaypointInput, WaypointStatus};

#[derive(Debug, Default)]
pub struct WaypointStore {
    route: Vec<Waypoint>,
    current: Option<usize>,
}

impl WaypointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the route. Every waypoint starts pending and the pointer sits at 0.
    ///
    /// An empty input means the decoder found nothing usable; it is rejected
    /// and the previous route stays live.
    pub fn load_route(&mut self, waypoints: Vec<WaypointInput>) -> Result<()> {
        if waypoints.is_empty() {
            return Err(TrackerError::EmptyRoute);
        }
        self.route = waypoints.into_iter().map(Waypoint::from).collect();
        self.current = Some(0);
        Ok(())
    }

    /// Drops the route entirely.
    pub fn clear(&mut self) {
        self.route.clear();
        self.current = None;
    }

    pub fn current_target_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_target(&self) -> Option<&Waypoint> {
        self.current.and_then(|i| self.route.get(i))
    }

    pub fn waypoint_at(&self, index: usize) -> Result<&Waypoint> {
        self.route.get(index).ok_or(TrackerError::IndexOutOfRange {
            index,
            len: self.route.len(),
        })
    }

    /// Exchanges two waypoints in the route. Statuses travel with the waypoints.
    pub fn swap_positions(&mut self, i: usize, j: usize) -> Result<()> {
        self.check_index(i)?;
        self.check_index(j)?;
        self.route.swap(i, j);
        Ok(())
    }

    /// First pending waypoint strictly after `index`, in current route order.
    pub fn next_pending_after(&self, index: usize) -> Option<usize> {
        self.route
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, wp)| wp.is_pending())
            .map(|(i, _)| i)
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.route
    }

    pub fn len(&self) -> usize {
        self.route.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.route.iter().filter(|wp| wp.is_pending()).count()
    }

    pub(crate) fn set_current(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            self.check_index(i)?;
        }
        self.current = index;
        Ok(())
    }

    /// Points at an index this store produced, e.g. from [`Self::next_pending_after`].
    pub(crate) fn point_at(&mut self, index: Option<usize>) {
        debug_assert!(index.is_none_or(|i| i < self.route.len()));
        self.current = index;
    }

    pub(crate) fn set_status(&mut self, index: usize, status: WaypointStatus) -> Result<&Waypoint> {
        let len = self.route.len();
        let waypoint = self
            .route
            .get_mut(index)
            .ok_or(TrackerError::IndexOutOfRange { index, len })?;
        waypoint.status = status;
        Ok(waypoint)
    }

    pub(crate) fn stamp_reached(&mut self, index: usize, at: jiff::Timestamp) -> Result<&Waypoint> {
        let len = self.route.len();
        let waypoint = self
            .route
            .get_mut(index)
            .ok_or(TrackerError::IndexOutOfRange { index, len })?;
        waypoint.status = WaypointStatus::Reached;
        waypoint.reached_at = Some(at);
        Ok(waypoint)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.route.len() {
            Ok(())
        } else {
            Err(TrackerError::IndexOutOfRange {
                index,
                len: self.route.len(),
            })
        }
    }
}
