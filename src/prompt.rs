//! Switch-prompt coordinator: offering to re-sequence the route.
//!
//! When the user stands inside the arrival radius of a pending waypoint that
//! is not the current target, the coordinator offers to promote it. The offer
//! lives until it is accepted, declined, withdrawn, or its deadline passes;
//! a passed deadline resolves exactly like an accept.
//!
//! Every resolution path starts by taking the offer out of the coordinator,
//! so whichever resolution arrives first wins and any later one finds nothing
//! to resolve. The swap can never be applied twice for one offer.

use jiff::{SignedDuration, Timestamp};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::ProgressionEngine;
use crate::error::Result;
use crate::model::Resolution;
use crate::proximity::ProximityResult;

/// An outstanding switch offer.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub id: Uuid,
    pub candidate_index: usize,
    pub candidate_name: String,

    /// The current target when the offer was made. Accepting swaps it with the candidate.
    pub original_index: usize,

    pub deadline: Timestamp,
}

/// An offer together with how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub offer: Offer,
    pub resolution: Resolution,
}

#[derive(Debug)]
pub struct SwitchPrompt {
    timeout: SignedDuration,
    offer: Option<Offer>,

    /// Candidate already offered; not offered again until the user leaves its radius.
    prompted: Option<usize>,
}

impl Default for SwitchPrompt {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl SwitchPrompt {
    pub const DEFAULT_TIMEOUT: SignedDuration = SignedDuration::from_secs(15);

    pub fn new(timeout: SignedDuration) -> Self {
        Self {
            timeout,
            offer: None,
            prompted: None,
        }
    }

    pub fn offer(&self) -> Option<&Offer> {
        self.offer.as_ref()
    }

    /// Looks at a proximity result and opens an offer when one is due.
    ///
    /// Returns the new offer, or `None` when nothing was offered.
    pub fn consider(
        &mut self,
        result: &ProximityResult,
        arrival: f64,
        now: Timestamp,
    ) -> Option<&Offer> {
        if self.offer.is_some() {
            return None;
        }

        let candidate = result.candidate_within(arrival);
        if self.prompted.is_some() && self.prompted != candidate.map(|c| c.index) {
            debug!(index = ?self.prompted, "left radius of previously offered waypoint");
            self.prompted = None;
        }

        let current = result.current?;
        if result.arrived_at_current {
            return None;
        }
        let candidate = candidate?;
        if self.prompted == Some(candidate.index) {
            return None;
        }

        let offer = Offer {
            id: Uuid::new_v4(),
            candidate_index: candidate.index,
            candidate_name: candidate.name.clone(),
            original_index: current.index,
            deadline: now.checked_add(self.timeout).unwrap_or(Timestamp::MAX),
        };
        info!(
            offer = %offer.id,
            candidate = offer.candidate_index,
            distance = candidate.distance_meters,
            "switch offered"
        );
        self.prompted = Some(candidate.index);
        self.offer = Some(offer);
        self.offer.as_ref()
    }

    /// Accepts the outstanding offer: swaps the candidate into the current slot.
    ///
    /// `id` pins the response to a specific offer; a stale id is a no-op.
    pub fn accept(
        &mut self,
        engine: &mut ProgressionEngine,
        id: Option<Uuid>,
    ) -> Result<Option<Resolved>> {
        match self.take(id) {
            Some(offer) => self.apply(engine, offer, Resolution::Accepted).map(Some),
            None => Ok(None),
        }
    }

    /// Declines the outstanding offer. The route is left alone.
    pub fn decline(&mut self, id: Option<Uuid>) -> Option<Resolved> {
        let offer = self.take(id)?;
        info!(offer = %offer.id, "switch declined");
        Some(Resolved {
            offer,
            resolution: Resolution::Declined,
        })
    }

    /// Resolves the outstanding offer as timed out if its deadline has passed.
    pub fn expire(
        &mut self,
        engine: &mut ProgressionEngine,
        now: Timestamp,
    ) -> Result<Option<Resolved>> {
        if self.offer.as_ref().is_none_or(|o| now < o.deadline) {
            return Ok(None);
        }
        match self.offer.take() {
            Some(offer) => self.apply(engine, offer, Resolution::TimedOut).map(Some),
            None => Ok(None),
        }
    }

    /// Drops the outstanding offer without touching the route.
    pub fn withdraw(&mut self) -> Option<Resolved> {
        let offer = self.offer.take()?;
        debug!(offer = %offer.id, "switch withdrawn");
        Some(Resolved {
            offer,
            resolution: Resolution::Withdrawn,
        })
    }

    /// Forgets everything, for a new route.
    pub fn reset(&mut self) {
        self.offer = None;
        self.prompted = None;
    }

    fn take(&mut self, id: Option<Uuid>) -> Option<Offer> {
        match (&self.offer, id) {
            (Some(offer), Some(id)) if offer.id != id => None,
            _ => self.offer.take(),
        }
    }

    fn apply(
        &mut self,
        engine: &mut ProgressionEngine,
        offer: Offer,
        resolution: Resolution,
    ) -> Result<Resolved> {
        let store = engine.store();
        let still_valid = store.current_target_index() == Some(offer.original_index)
            && store
                .waypoint_at(offer.candidate_index)
                .is_ok_and(|wp| wp.is_pending());
        if !still_valid {
            debug!(offer = %offer.id, "offer no longer matches the route");
            return Ok(Resolved {
                offer,
                resolution: Resolution::Withdrawn,
            });
        }

        engine
            .store_mut()
            .swap_positions(offer.original_index, offer.candidate_index)?;
        engine.set_current_target(offer.original_index)?;
        self.prompted = None;
        info!(
            offer = %offer.id,
            from = offer.candidate_index,
            to = offer.original_index,
            ?resolution,
            "route re-sequenced"
        );

        Ok(Resolved { offer, resolution })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::geo::Coordinate;
    use crate::model::ZoneThresholds;
    use crate::proximity::{evaluate, tests::north_of};
    use crate::store::tests::input;

    const ARRIVAL: f64 = 50.0;

    fn t(seconds: i64) -> Timestamp {
        Timestamp::new(1_700_000_000 + seconds, 0).unwrap()
    }

    /// Tracking W1 (W0 already reached); W2 lies ~1.1 km north of W1's latitude.
    fn engine() -> ProgressionEngine {
        let mut engine = ProgressionEngine::new();
        engine
            .load_route(vec![
                input("W0", 0.0, 0.0),
                input("W1", 0.0, 0.01),
                input("W2", 0.01, 0.0),
            ])
            .unwrap();
        engine.mark_reached(t(0)).unwrap();
        engine
    }

    fn at(engine: &ProgressionEngine, position: Coordinate) -> ProximityResult {
        let thresholds = ZoneThresholds {
            outer: 500.0,
            mid: 200.0,
            arrival: ARRIVAL,
        };
        evaluate(position, engine.store(), &thresholds)
    }

    fn near_w2() -> Coordinate {
        north_of(0.01, 0.0, 10.0)
    }

    #[test]
    fn offers_nearby_pending_waypoint() {
        let engine = engine();
        let mut prompt = SwitchPrompt::default();

        let offer = prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(1)).unwrap();
        assert_eq!(offer.candidate_index, 2);
        assert_eq!(offer.original_index, 1);
        assert_eq!(offer.candidate_name, "W2");
        assert_eq!(offer.deadline, t(16));
    }

    #[test]
    fn deadline_saturates_near_end_of_time() {
        let mut engine = engine();
        let mut prompt = SwitchPrompt::default();
        let late = Timestamp::MAX - SignedDuration::from_secs(1);

        let offer = prompt.consider(&at(&engine, near_w2()), ARRIVAL, late).unwrap();
        assert_eq!(offer.deadline, Timestamp::MAX);

        assert!(prompt.expire(&mut engine, late).unwrap().is_none());
        let resolved = prompt.expire(&mut engine, Timestamp::MAX).unwrap().unwrap();
        assert_eq!(resolved.resolution, Resolution::TimedOut);
    }

    #[test]
    fn no_offer_when_far_from_everything() {
        let engine = engine();
        let mut prompt = SwitchPrompt::default();

        let far = north_of(0.01, 0.0, 300.0);
        assert!(prompt.consider(&at(&engine, far), ARRIVAL, t(1)).is_none());
    }

    #[test]
    fn only_one_offer_outstanding() {
        let engine = engine();
        let mut prompt = SwitchPrompt::default();
        let first = prompt
            .consider(&at(&engine, near_w2()), ARRIVAL, t(1))
            .unwrap()
            .id;

        assert!(prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(2)).is_none());
        assert_eq!(prompt.offer().unwrap().id, first);
    }

    #[test]
    fn accept_swaps_and_keeps_pointer_slot() {
        let mut engine = engine();
        let mut prompt = SwitchPrompt::default();
        prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(1));

        let resolved = prompt.accept(&mut engine, None).unwrap().unwrap();
        assert_eq!(resolved.resolution, Resolution::Accepted);
        assert_eq!(engine.store().current_target_index(), Some(1));
        assert_eq!(engine.store().current_target().unwrap().name, "W2");
        assert_eq!(engine.store().waypoint_at(2).unwrap().name, "W1");
        assert!(prompt.offer().is_none());
    }

    #[test]
    fn decline_leaves_route_and_suppresses_reoffer() {
        let engine = engine();
        let mut prompt = SwitchPrompt::default();
        prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(1));

        let resolved = prompt.decline(None).unwrap();
        assert_eq!(resolved.resolution, Resolution::Declined);
        assert_eq!(engine.store().current_target_index(), Some(1));
        assert_eq!(engine.store().waypoint_at(2).unwrap().name, "W2");

        // Still standing there: no new offer.
        assert!(prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(2)).is_none());

        // Walk away, then come back.
        let away = north_of(0.01, 0.0, 200.0);
        assert!(prompt.consider(&at(&engine, away), ARRIVAL, t(3)).is_none());
        let again = prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(4));
        assert_eq!(again.unwrap().candidate_index, 2);
    }

    #[test]
    fn expire_before_deadline_does_nothing() {
        let mut engine = engine();
        let mut prompt = SwitchPrompt::default();
        prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(1));

        assert!(prompt.expire(&mut engine, t(15)).unwrap().is_none());
        assert!(prompt.offer().is_some());
    }

    #[test]
    fn expire_at_deadline_accepts() {
        let mut engine = engine();
        let mut prompt = SwitchPrompt::default();
        prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(1));

        let resolved = prompt.expire(&mut engine, t(16)).unwrap().unwrap();
        assert_eq!(resolved.resolution, Resolution::TimedOut);
        assert_eq!(engine.store().current_target().unwrap().name, "W2");
    }

    #[test]
    fn first_resolution_wins() {
        let mut engine = engine();
        let mut prompt = SwitchPrompt::default();
        let id = prompt
            .consider(&at(&engine, near_w2()), ARRIVAL, t(1))
            .unwrap()
            .id;

        prompt.expire(&mut engine, t(20)).unwrap().unwrap();
        assert!(prompt.accept(&mut engine, Some(id)).unwrap().is_none());
        assert!(prompt.decline(Some(id)).is_none());

        // Swapped exactly once.
        assert_eq!(engine.store().waypoint_at(1).unwrap().name, "W2");
        assert_eq!(engine.store().waypoint_at(2).unwrap().name, "W1");
    }

    #[test]
    fn stale_offer_id_is_ignored() {
        let mut engine = engine();
        let mut prompt = SwitchPrompt::default();
        prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(1));

        assert!(prompt.accept(&mut engine, Some(Uuid::new_v4())).unwrap().is_none());
        assert!(prompt.offer().is_some());
        assert_eq!(engine.store().waypoint_at(1).unwrap().name, "W1");
    }

    #[test]
    fn accept_after_target_moved_is_withdrawn() {
        let mut engine = engine();
        let mut prompt = SwitchPrompt::default();
        prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(1));

        engine.skip().unwrap();
        let resolved = prompt.accept(&mut engine, None).unwrap().unwrap();
        assert_eq!(resolved.resolution, Resolution::Withdrawn);
        assert_eq!(engine.store().waypoint_at(2).unwrap().name, "W2");
    }

    #[test]
    fn no_offer_once_completed() {
        let mut engine = engine();
        engine.skip().unwrap();
        engine.skip().unwrap();
        let mut prompt = SwitchPrompt::default();

        assert!(prompt.consider(&at(&engine, near_w2()), ARRIVAL, t(1)).is_none());
    }
}
