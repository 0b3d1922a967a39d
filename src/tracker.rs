//! The tracker: one owned aggregate for a tracking session.
//!
//! Route loads, position fixes and user decisions go through `&mut self`
//! one at a time, and each call applies its whole transition before
//! returning the events it produced. Nothing outside ever sees a route
//! halfway through a swap.

use jiff::Timestamp;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ThresholdSource;
use crate::engine::{Advance, ProgressionEngine};
use crate::error::{PositionSourceError, Result};
use crate::feed::FeedInput;
use crate::model::{
    PositionFix, ProgressStats, ReachedEntry, ReachedLogExport, Resolution, TrackerEvent,
    WaypointInput, Zone, ZoneThresholds,
};
use crate::prompt::{Offer, Resolved, SwitchPrompt};
use crate::proximity;
use crate::store::WaypointStore;

pub struct Tracker {
    engine: ProgressionEngine,
    prompt: SwitchPrompt,
    source: Box<dyn ThresholdSource>,

    /// Radii for the current target, read when it became the target.
    thresholds: ZoneThresholds,
    zone: Option<Zone>,
    session: Option<Uuid>,
}

impl Tracker {
    pub fn new(source: Box<dyn ThresholdSource>, prompt: SwitchPrompt) -> Self {
        Self {
            engine: ProgressionEngine::new(),
            prompt,
            source,
            thresholds: ZoneThresholds::default(),
            zone: None,
            session: None,
        }
    }

    /// Replaces the live route and starts a new session.
    ///
    /// On error the previous session is left exactly as it was.
    pub fn load_route(&mut self, waypoints: Vec<WaypointInput>) -> Result<Vec<TrackerEvent>> {
        self.engine.load_route(waypoints)?;

        let mut events = Vec::new();
        if let Some(resolved) = self.prompt.withdraw() {
            events.push(resolved_event(&resolved));
        }
        self.prompt.reset();

        let session = Uuid::new_v4();
        self.session = Some(session);
        events.push(TrackerEvent::RouteLoaded {
            session,
            total: self.engine.stats().total,
        });
        self.enter_target(0, &mut events);
        events.push(TrackerEvent::Stats(self.engine.stats()));
        Ok(events)
    }

    /// Drops the route and everything derived from it.
    pub fn unload(&mut self) {
        self.engine.unload();
        self.prompt.reset();
        self.zone = None;
        self.session = None;
    }

    /// Routes one feed input to the matching operation.
    pub fn handle(&mut self, input: FeedInput) -> Result<Vec<TrackerEvent>> {
        match input {
            FeedInput::Position(fix) => Ok(self.on_position(fix)),
            FeedInput::Skip { at } => self.skip(at),
            FeedInput::Reached { at } => self.mark_reached(at),
            FeedInput::Accept { at, offer_id } => self.accept(offer_id, at),
            FeedInput::Decline { at, offer_id } => self.decline(offer_id, at),
            FeedInput::Tick { at } => self.tick(at),
        }
    }

    /// Processes one reading from the location source.
    ///
    /// Source errors are reported as [`TrackerEvent::PositionLost`] and leave
    /// all state untouched.
    pub fn on_position(
        &mut self,
        fix: core::result::Result<PositionFix, PositionSourceError>,
    ) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        let fix = match fix {
            Ok(fix) => fix,
            Err(e) => {
                warn!(error = %e, "position source error");
                events.push(TrackerEvent::PositionLost {
                    message: e.to_string(),
                });
                return events;
            }
        };
        let Some(now) = fix.timestamp() else {
            events.push(TrackerEvent::PositionLost {
                message: PositionSourceError::Decode("timestampMs out of range".into())
                    .to_string(),
            });
            return events;
        };

        if let Err(e) = self.expire_into(now, &mut events) {
            // The swap is validated before it runs, so this is a logic error.
            warn!(error = %e, "failed to resolve expired switch offer");
        }

        let result = proximity::evaluate(fix.coordinate(), self.engine.store(), &self.thresholds);
        debug!(
            current = ?result.current,
            nearest = ?result.nearest_pending_other,
            "position evaluated"
        );

        if let Some(current) = result.current
            && self.zone != Some(current.zone)
        {
            self.zone = Some(current.zone);
            events.push(TrackerEvent::ZoneChanged {
                index: current.index,
                zone: current.zone,
                distance_meters: current.distance_meters,
            });
        }

        if result.arrived_at_current {
            if let Err(e) = self.reach_into(now, &mut events) {
                warn!(error = %e, "failed to mark waypoint reached");
            }
            return events;
        }

        if let Some(offer) = self.prompt.consider(&result, self.thresholds.arrival, now) {
            events.push(TrackerEvent::PromptOffered {
                offer_id: offer.id,
                candidate_index: offer.candidate_index,
                candidate_name: offer.candidate_name.clone(),
                deadline_ms: offer.deadline.as_millisecond(),
            });
        }

        events
    }

    /// Marks the current target reached by hand.
    pub fn mark_reached(&mut self, now: Timestamp) -> Result<Vec<TrackerEvent>> {
        let mut events = Vec::new();
        self.expire_into(now, &mut events)?;
        self.reach_into(now, &mut events)?;
        Ok(events)
    }

    /// Skips the current target.
    pub fn skip(&mut self, now: Timestamp) -> Result<Vec<TrackerEvent>> {
        let mut events = Vec::new();
        self.expire_into(now, &mut events)?;

        let (index, advance) = self.engine.skip()?;
        if let Some(resolved) = self.prompt.withdraw() {
            events.push(resolved_event(&resolved));
        }
        let name = self.engine.store().waypoint_at(index)?.name.clone();
        events.push(TrackerEvent::WaypointSkipped { index, name });
        events.push(TrackerEvent::Stats(self.engine.stats()));
        self.after_advance(advance, &mut events);
        Ok(events)
    }

    /// Accepts the outstanding switch offer.
    ///
    /// `offer_id` pins the answer to one offer; answering an offer that has
    /// already been resolved does nothing.
    pub fn accept(&mut self, offer_id: Option<Uuid>, now: Timestamp) -> Result<Vec<TrackerEvent>> {
        let mut events = Vec::new();
        self.expire_into(now, &mut events)?;
        if let Some(resolved) = self.prompt.accept(&mut self.engine, offer_id)? {
            self.after_resolution(&resolved, &mut events);
        }
        Ok(events)
    }

    /// Declines the outstanding switch offer.
    pub fn decline(&mut self, offer_id: Option<Uuid>, now: Timestamp) -> Result<Vec<TrackerEvent>> {
        let mut events = Vec::new();
        self.expire_into(now, &mut events)?;
        if let Some(resolved) = self.prompt.decline(offer_id) {
            events.push(resolved_event(&resolved));
        }
        Ok(events)
    }

    /// Lets time pass: resolves the outstanding offer if its deadline is due.
    pub fn tick(&mut self, now: Timestamp) -> Result<Vec<TrackerEvent>> {
        let mut events = Vec::new();
        self.expire_into(now, &mut events)?;
        Ok(events)
    }

    pub fn stats(&self) -> ProgressStats {
        self.engine.stats()
    }

    pub fn reached_log(&self) -> &[ReachedEntry] {
        self.engine.reached_log()
    }

    pub fn store(&self) -> &WaypointStore {
        self.engine.store()
    }

    pub fn session(&self) -> Option<Uuid> {
        self.session
    }

    pub fn pending_offer(&self) -> Option<&Offer> {
        self.prompt.offer()
    }

    pub fn thresholds(&self) -> ZoneThresholds {
        self.thresholds
    }

    /// The reached log of the live session, or `None` when no route is loaded.
    pub fn export_log(&self, now: Timestamp) -> Option<ReachedLogExport> {
        Some(ReachedLogExport {
            session: self.session?,
            exported_at: now,
            stats: self.engine.stats(),
            entries: self.engine.reached_log().to_vec(),
        })
    }

    fn reach_into(&mut self, now: Timestamp, events: &mut Vec<TrackerEvent>) -> Result<()> {
        let (entry, advance) = self.engine.mark_reached(now)?;
        if let Some(resolved) = self.prompt.withdraw() {
            events.push(resolved_event(&resolved));
        }
        events.push(TrackerEvent::WaypointReached { entry });
        events.push(TrackerEvent::Stats(self.engine.stats()));
        self.after_advance(advance, events);
        Ok(())
    }

    fn expire_into(&mut self, now: Timestamp, events: &mut Vec<TrackerEvent>) -> Result<()> {
        if let Some(resolved) = self.prompt.expire(&mut self.engine, now)? {
            self.after_resolution(&resolved, events);
        }
        Ok(())
    }

    fn after_resolution(&mut self, resolved: &Resolved, events: &mut Vec<TrackerEvent>) {
        events.push(resolved_event(resolved));
        if matches!(resolved.resolution, Resolution::Accepted | Resolution::TimedOut) {
            self.enter_target(resolved.offer.original_index, events);
            events.push(TrackerEvent::Stats(self.engine.stats()));
        }
    }

    fn after_advance(&mut self, advance: Advance, events: &mut Vec<TrackerEvent>) {
        match advance {
            Advance::Next { to, .. } => self.enter_target(to, events),
            Advance::Completed { .. } => {
                self.zone = None;
                events.push(TrackerEvent::RouteCompleted);
            }
        }
    }

    /// A new waypoint became the current target: re-read the radii.
    fn enter_target(&mut self, index: usize, events: &mut Vec<TrackerEvent>) {
        self.thresholds = self.source.zone_thresholds();
        self.zone = None;
        let name = self
            .engine
            .store()
            .waypoint_at(index)
            .map(|wp| wp.name.clone())
            .unwrap_or_default();
        events.push(TrackerEvent::TargetChanged {
            index,
            name,
            thresholds: self.thresholds,
        });
    }
}

fn resolved_event(resolved: &Resolved) -> TrackerEvent {
    TrackerEvent::PromptResolved {
        offer_id: resolved.offer.id,
        resolution: resolved.resolution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::TrackerError;
    use crate::geo::Coordinate;
    use crate::model::WaypointStatus;
    use crate::proximity::tests::north_of;
    use crate::store::tests::input;

    const ARRIVAL: f64 = 50.0;

    fn thresholds() -> ZoneThresholds {
        ZoneThresholds {
            outer: 500.0,
            mid: 200.0,
            arrival: ARRIVAL,
        }
    }

    fn tracker() -> Tracker {
        let mut tracker = Tracker::new(Box::new(thresholds()), SwitchPrompt::default());
        tracker
            .load_route(vec![
                input("W0", 0.0, 0.0),
                input("W1", 0.0, 0.01),
                input("W2", 0.01, 0.0),
            ])
            .unwrap();
        tracker
    }

    fn ms(seconds: i64) -> i64 {
        1_700_000_000_000 + seconds * 1000
    }

    fn t(seconds: i64) -> Timestamp {
        Timestamp::from_millisecond(ms(seconds)).unwrap()
    }

    fn fix(at: Coordinate, seconds: i64) -> core::result::Result<PositionFix, PositionSourceError> {
        Ok(PositionFix {
            latitude: at.latitude,
            longitude: at.longitude,
            accuracy: 5.0,
            timestamp_ms: ms(seconds),
        })
    }

    fn stats(total: usize, reached: usize, remaining: usize, skipped: usize) -> ProgressStats {
        ProgressStats {
            total,
            reached,
            remaining,
            skipped,
        }
    }

    /// Reach W0 so W1 is the target, then stand next to W2 until an offer appears.
    fn tracker_with_offer() -> (Tracker, Uuid) {
        let mut tracker = tracker();
        tracker.on_position(fix(north_of(0.0, 0.0, 30.0), 0));
        let events = tracker.on_position(fix(north_of(0.01, 0.0, 10.0), 10));
        let offer_id = events
            .iter()
            .find_map(|e| match e {
                TrackerEvent::PromptOffered { offer_id, .. } => Some(*offer_id),
                _ => None,
            })
            .unwrap();
        (tracker, offer_id)
    }

    #[test]
    fn load_emits_session_target_and_stats() {
        let mut tracker = Tracker::new(Box::new(thresholds()), SwitchPrompt::default());
        let events = tracker.load_route(vec![input("A", 0.0, 0.0)]).unwrap();

        assert!(matches!(events[0], TrackerEvent::RouteLoaded { total: 1, .. }));
        assert!(matches!(events[1], TrackerEvent::TargetChanged { index: 0, .. }));
        assert_eq!(events[2], TrackerEvent::Stats(stats(1, 0, 1, 0)));
        assert!(tracker.session().is_some());
    }

    #[test]
    fn empty_load_keeps_previous_session() {
        let mut tracker = tracker();
        let session = tracker.session();

        assert_eq!(tracker.load_route(vec![]).unwrap_err(), TrackerError::EmptyRoute);
        assert_eq!(tracker.session(), session);
        assert_eq!(tracker.stats().total, 3);
    }

    #[test]
    fn arriving_marks_reached_and_advances() {
        let mut tracker = tracker();
        let events = tracker.on_position(fix(north_of(0.0, 0.0, 30.0), 0));

        assert!(events.iter().any(|e| matches!(
            e,
            TrackerEvent::ZoneChanged {
                index: 0,
                zone: Zone::Arrival,
                ..
            }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            TrackerEvent::WaypointReached { entry } if entry.name == "W0" && entry.reached_at == t(0)
        )));
        assert!(events.contains(&TrackerEvent::Stats(stats(3, 1, 2, 0))));
        assert!(matches!(
            events.last(),
            Some(TrackerEvent::TargetChanged { index: 1, .. })
        ));
        assert_eq!(tracker.store().current_target_index(), Some(1));
    }

    #[test]
    fn reach_then_skip_scenario() {
        let mut tracker = tracker();
        tracker.on_position(fix(north_of(0.0, 0.0, 30.0), 0));
        let events = tracker.skip(t(5)).unwrap();

        assert!(events.contains(&TrackerEvent::WaypointSkipped {
            index: 1,
            name: "W1".into()
        }));
        assert_eq!(tracker.stats(), stats(3, 1, 1, 1));
        assert_eq!(tracker.store().current_target_index(), Some(2));
    }

    #[test]
    fn zone_change_reported_once_per_ring() {
        let mut tracker = tracker();
        let first = tracker.on_position(fix(north_of(0.0, 0.0, 300.0), 0));
        let second = tracker.on_position(fix(north_of(0.0, 0.0, 250.0), 1));
        let third = tracker.on_position(fix(north_of(0.0, 0.0, 150.0), 2));

        assert!(matches!(first[0], TrackerEvent::ZoneChanged { zone: Zone::Outer, .. }));
        assert!(second.is_empty());
        assert!(matches!(third[0], TrackerEvent::ZoneChanged { zone: Zone::Mid, .. }));
    }

    #[test]
    fn completion_then_calls_have_no_effect() {
        let mut tracker = tracker();
        tracker.skip(t(0)).unwrap();
        tracker.skip(t(1)).unwrap();
        let events = tracker.mark_reached(t(2)).unwrap();
        assert_eq!(events.last(), Some(&TrackerEvent::RouteCompleted));

        let stats_before = tracker.stats();
        assert_eq!(tracker.skip(t(3)).unwrap_err(), TrackerError::NoActiveTarget);
        assert_eq!(
            tracker.mark_reached(t(4)).unwrap_err(),
            TrackerError::NoActiveTarget
        );
        assert_eq!(tracker.stats(), stats_before);
        assert_eq!(tracker.reached_log().len(), 1);
        assert!(tracker.on_position(fix(Coordinate::new(0.0, 0.0), 5)).is_empty());
    }

    #[test]
    fn source_error_changes_nothing() {
        let mut tracker = tracker();
        let events = tracker.on_position(Err(PositionSourceError::Timeout));

        assert_eq!(
            events,
            vec![TrackerEvent::PositionLost {
                message: "timed out waiting for a position".into()
            }]
        );
        assert_eq!(tracker.stats(), stats(3, 0, 3, 0));

        // Tracking resumes with the next good fix.
        tracker.on_position(fix(north_of(0.0, 0.0, 10.0), 1));
        assert_eq!(tracker.stats(), stats(3, 1, 2, 0));
    }

    #[test]
    fn decline_keeps_order_until_user_returns() {
        let (mut tracker, offer_id) = tracker_with_offer();
        let events = tracker.decline(Some(offer_id), t(11)).unwrap();
        assert_eq!(
            events,
            vec![TrackerEvent::PromptResolved {
                offer_id,
                resolution: Resolution::Declined
            }]
        );
        assert_eq!(tracker.store().current_target_index(), Some(1));
        assert_eq!(tracker.store().waypoint_at(2).unwrap().name, "W2");

        let still_there = tracker.on_position(fix(north_of(0.01, 0.0, 5.0), 12));
        assert!(!still_there
            .iter()
            .any(|e| matches!(e, TrackerEvent::PromptOffered { .. })));

        tracker.on_position(fix(north_of(0.01, 0.0, 300.0), 13));
        let back = tracker.on_position(fix(north_of(0.01, 0.0, 5.0), 14));
        assert!(back
            .iter()
            .any(|e| matches!(e, TrackerEvent::PromptOffered { candidate_index: 2, .. })));
    }

    #[test]
    fn unanswered_offer_switches_after_fifteen_seconds() {
        let (mut tracker, offer_id) = tracker_with_offer();
        assert_eq!(tracker.pending_offer().unwrap().deadline, t(25));

        assert!(tracker.tick(t(24)).unwrap().is_empty());
        let events = tracker.tick(t(25)).unwrap();

        assert_eq!(
            events[0],
            TrackerEvent::PromptResolved {
                offer_id,
                resolution: Resolution::TimedOut
            }
        );
        assert!(matches!(
            &events[1],
            TrackerEvent::TargetChanged { index: 1, name, .. } if name == "W2"
        ));
        assert_eq!(tracker.store().waypoint_at(2).unwrap().name, "W1");
        assert_eq!(tracker.stats(), stats(3, 1, 2, 0));
    }

    #[test]
    fn explicit_accept_after_timeout_is_a_no_op() {
        let (mut tracker, offer_id) = tracker_with_offer();
        tracker.tick(t(30)).unwrap();

        assert!(tracker.accept(Some(offer_id), t(31)).unwrap().is_empty());
        assert_eq!(tracker.store().waypoint_at(1).unwrap().name, "W2");
        assert_eq!(tracker.store().waypoint_at(2).unwrap().name, "W1");
    }

    #[test]
    fn late_accept_resolves_by_timeout_first() {
        let (mut tracker, offer_id) = tracker_with_offer();
        let events = tracker.accept(Some(offer_id), t(40)).unwrap();

        let resolutions: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TrackerEvent::PromptResolved { resolution, .. } => Some(*resolution),
                _ => None,
            })
            .collect();
        assert_eq!(resolutions, vec![Resolution::TimedOut]);
        assert_eq!(tracker.store().waypoint_at(1).unwrap().name, "W2");
    }

    #[test]
    fn accept_then_arrive_at_promoted_waypoint() {
        let (mut tracker, offer_id) = tracker_with_offer();
        tracker.accept(Some(offer_id), t(11)).unwrap();

        let events = tracker.on_position(fix(north_of(0.01, 0.0, 5.0), 12));
        assert!(events.iter().any(|e| matches!(
            e,
            TrackerEvent::WaypointReached { entry } if entry.name == "W2" && entry.index == 1
        )));
        assert_eq!(tracker.store().current_target().unwrap().name, "W1");
        assert_eq!(tracker.stats(), stats(3, 2, 1, 0));
    }

    #[test]
    fn skip_withdraws_outstanding_offer() {
        let (mut tracker, offer_id) = tracker_with_offer();
        let events = tracker.skip(t(11)).unwrap();

        assert_eq!(
            events[0],
            TrackerEvent::PromptResolved {
                offer_id,
                resolution: Resolution::Withdrawn
            }
        );
        assert!(tracker.pending_offer().is_none());
        assert_eq!(
            tracker.store().waypoint_at(1).unwrap().status,
            WaypointStatus::Skipped
        );
    }

    #[test]
    fn reload_withdraws_offer_and_resets_everything() {
        let (mut tracker, offer_id) = tracker_with_offer();
        let old_session = tracker.session();
        let events = tracker.load_route(vec![input("X", 5.0, 5.0)]).unwrap();

        assert_eq!(
            events[0],
            TrackerEvent::PromptResolved {
                offer_id,
                resolution: Resolution::Withdrawn
            }
        );
        assert_ne!(tracker.session(), old_session);
        assert_eq!(tracker.stats(), stats(1, 0, 1, 0));
        assert!(tracker.reached_log().is_empty());
    }

    #[test]
    fn thresholds_reread_on_each_target() {
        struct Stepping(Vec<f64>);
        impl ThresholdSource for Stepping {
            fn zone_thresholds(&mut self) -> ZoneThresholds {
                ZoneThresholds {
                    outer: 500.0,
                    mid: 200.0,
                    arrival: self.0.remove(0),
                }
            }
        }

        let mut tracker = Tracker::new(
            Box::new(Stepping(vec![50.0, 5.0])),
            SwitchPrompt::default(),
        );
        tracker
            .load_route(vec![input("W0", 0.0, 0.0), input("W1", 0.0, 0.01)])
            .unwrap();
        assert!((tracker.thresholds().arrival - 50.0).abs() < f64::EPSILON);

        tracker.on_position(fix(north_of(0.0, 0.0, 30.0), 0));
        assert!((tracker.thresholds().arrival - 5.0).abs() < f64::EPSILON);

        // 30 m is no longer close enough.
        tracker.on_position(fix(north_of(0.0, 0.01, 30.0), 1));
        assert_eq!(tracker.store().current_target_index(), Some(1));
    }

    #[test]
    fn stats_invariant_holds_through_mixed_session() {
        let (mut tracker, offer_id) = tracker_with_offer();
        let check = |tracker: &Tracker| assert!(tracker.stats().is_consistent());

        check(&tracker);
        tracker.accept(Some(offer_id), t(11)).unwrap();
        check(&tracker);
        tracker.skip(t(12)).unwrap();
        check(&tracker);
        tracker.mark_reached(t(13)).unwrap();
        check(&tracker);
        assert_eq!(tracker.stats(), stats(3, 2, 0, 1));
    }

    #[test]
    fn export_carries_session_and_entries() {
        let mut tracker = tracker();
        tracker.on_position(fix(north_of(0.0, 0.0, 30.0), 0));

        let export = tracker.export_log(t(60)).unwrap();
        assert_eq!(Some(export.session), tracker.session());
        assert_eq!(export.entries.len(), 1);
        assert_eq!(export.stats, stats(3, 1, 2, 0));

        tracker.unload();
        assert!(tracker.export_log(t(61)).is_none());
    }

    #[test]
    fn handle_dispatches_feed_inputs() {
        let mut tracker = tracker();
        let events = tracker.handle(FeedInput::Skip { at: t(0) }).unwrap();
        assert!(events.contains(&TrackerEvent::WaypointSkipped {
            index: 0,
            name: "W0".into()
        }));

        let events = tracker
            .handle(FeedInput::Position(Err(PositionSourceError::PermissionDenied)))
            .unwrap();
        assert!(matches!(events[0], TrackerEvent::PositionLost { .. }));
    }
}
