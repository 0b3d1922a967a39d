//! Progression engine: the state machine that walks the route.
//!
//! The engine owns the waypoint store, the progress counters and the reached
//! log. Each waypoint goes `pending -> reached` or `pending -> skipped`, both
//! terminal. The current-target pointer only ever moves forward: after a
//! waypoint is resolved it jumps to the first pending waypoint at a higher
//! index, or the route is completed.

use jiff::Timestamp;
use tracing::info;

use crate::error::{Result, TrackerError};
use crate::model::{ProgressStats, ReachedEntry, WaypointInput, WaypointStatus};
use crate::store::WaypointStore;

/// Where the pointer stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// No route loaded.
    Idle,
    Tracking(usize),
    Completed,
}

/// Result of moving the pointer off a resolved waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next { from: usize, to: usize },
    Completed { from: usize },
}

#[derive(Debug, Default)]
pub struct ProgressionEngine {
    store: WaypointStore,
    stats: ProgressStats,
    log: Vec<ReachedEntry>,
    loaded: bool,
}

impl ProgressionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a route and resets counters and the reached log.
    ///
    /// On error nothing changes.
    pub fn load_route(&mut self, waypoints: Vec<WaypointInput>) -> Result<()> {
        self.store.load_route(waypoints)?;
        self.stats = ProgressStats::for_route(self.store.len());
        self.log.clear();
        self.loaded = true;
        info!(total = self.stats.total, "route loaded");
        Ok(())
    }

    /// Drops the route and everything derived from it.
    pub fn unload(&mut self) {
        self.store.clear();
        self.stats = ProgressStats::default();
        self.log.clear();
        self.loaded = false;
    }

    pub fn state(&self) -> TargetState {
        match self.store.current_target_index() {
            Some(i) => TargetState::Tracking(i),
            None if self.loaded => TargetState::Completed,
            None => TargetState::Idle,
        }
    }

    /// Marks the current target reached at `now` and advances.
    pub fn mark_reached(&mut self, now: Timestamp) -> Result<(ReachedEntry, Advance)> {
        let index = self.active_index()?;
        let waypoint = self.store.stamp_reached(index, now)?;
        let entry = ReachedEntry::snapshot(index, waypoint, now);

        self.log.push(entry.clone());
        self.stats.reached += 1;
        self.stats.remaining -= 1;
        info!(index, name = %entry.name, "waypoint reached");

        Ok((entry, self.advance(index)))
    }

    /// Skips the current target and advances. Returns the skipped index.
    pub fn skip(&mut self) -> Result<(usize, Advance)> {
        let index = self.active_index()?;
        self.store.set_status(index, WaypointStatus::Skipped)?;

        self.stats.skipped += 1;
        self.stats.remaining -= 1;
        info!(index, "waypoint skipped");

        Ok((index, self.advance(index)))
    }

    /// Points the engine at `index`, which must be a pending waypoint.
    pub fn set_current_target(&mut self, index: usize) -> Result<()> {
        if !self.store.waypoint_at(index)?.is_pending() {
            return Err(TrackerError::WaypointResolved { index });
        }
        self.store.set_current(Some(index))
    }

    pub fn stats(&self) -> ProgressStats {
        self.stats
    }

    pub fn reached_log(&self) -> &[ReachedEntry] {
        &self.log
    }

    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut WaypointStore {
        &mut self.store
    }

    fn active_index(&self) -> Result<usize> {
        match self.state() {
            TargetState::Tracking(i) => Ok(i),
            TargetState::Idle | TargetState::Completed => Err(TrackerError::NoActiveTarget),
        }
    }

    /// Moves the pointer from the just-resolved `from` to the next pending waypoint.
    fn advance(&mut self, from: usize) -> Advance {
        let next = self.store.next_pending_after(from);
        self.store.point_at(next);
        match next {
            Some(to) => Advance::Next { from, to },
            None => {
                info!("route completed");
                Advance::Completed { from }
            }
        }
    }
}
