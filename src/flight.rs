//! Flight campaigns: repeating, cancellable bird-spawn schedules.
//!
//! Campaign "timers" are frame-polled deadlines, so every reentry into the
//! engine happens inside the frame tick and replacing a campaign discards
//! the old deadline before the new one is armed. At most one campaign is
//! live per controller; starting a new one always supersedes, never queues.
//!
//! Detection triggers are deliberately NOT debounced: every detection
//! queues its own delayed campaign start, and rapid repeated detections
//! accumulate. Later firings supersede earlier campaigns.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::engine::AnimationEngine;
use crate::note::PaletteColor;
use crate::params::FlightParams;

/// Cancellation handle for one campaign. Stale handles cancel nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignHandle(u64);

#[derive(Debug, Clone, Copy)]
struct Campaign {
    id: u64,
    color: Option<PaletteColor>,
    count: usize,
    period: Duration,
    next_fire: Instant,
}

#[derive(Debug, Clone, Copy)]
struct DelayedTrigger {
    fire_at: Instant,
    color: Option<PaletteColor>,
    count: usize,
}

pub struct FlightController {
    params: FlightParams,
    campaign: Option<Campaign>,
    pending: Vec<DelayedTrigger>,
    next_id: u64,
}

impl FlightController {
    pub fn new(params: FlightParams) -> Self {
        Self {
            params,
            campaign: None,
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Start a repeating spawn campaign, superseding any active one. The
    /// first firing happens one period from `now`.
    pub fn start_random_flight(
        &mut self,
        color: Option<PaletteColor>,
        count: usize,
        now: Instant,
    ) -> CampaignHandle {
        let id = self.next_id;
        self.next_id += 1;

        let period = Duration::from_millis(self.params.period_ms);
        // Replacing the slot is the synchronous cancel of the old timer.
        self.campaign = Some(Campaign {
            id,
            color,
            count,
            period,
            next_fire: now + period,
        });
        debug!(
            "flight campaign {}: {:?} x{} every {:?}",
            id, color, count, period
        );
        CampaignHandle(id)
    }

    /// Stop the campaign the handle refers to, if it is still the live one.
    pub fn cancel(&mut self, handle: CampaignHandle) {
        if self.campaign.map_or(false, |c| c.id == handle.0) {
            self.campaign = None;
        }
    }

    /// Stop whatever campaign is active and drop queued triggers.
    pub fn stop_all(&mut self) {
        self.campaign = None;
        self.pending.clear();
    }

    /// Queue a campaign start `trigger_delay` from now. Triggers accumulate;
    /// there is no duplicate suppression.
    pub fn schedule_spawn(&mut self, color: Option<PaletteColor>, count: usize, now: Instant) {
        self.pending.push(DelayedTrigger {
            fire_at: now + Duration::from_millis(self.params.trigger_delay_ms),
            color,
            count,
        });
    }

    pub fn has_campaign(&self) -> bool {
        self.campaign.is_some()
    }

    /// Fire due triggers and the campaign, if its period has elapsed.
    /// Returns the number of birds spawned this tick.
    pub fn tick(&mut self, now: Instant, engine: &mut AnimationEngine) -> usize {
        // Due one-shot triggers each start a campaign; when several are due
        // in one tick the last one queued wins, like any other supersession.
        let mut due: Vec<DelayedTrigger> = Vec::new();
        self.pending.retain(|t| {
            if t.fire_at <= now {
                due.push(*t);
                false
            } else {
                true
            }
        });
        for trigger in due {
            self.start_random_flight(trigger.color, trigger.count, now);
        }

        let mut spawned = 0;
        if let Some(campaign) = &mut self.campaign {
            if now >= campaign.next_fire {
                spawned = engine.spawn(campaign.color, campaign.count);
                campaign.next_fire = now + campaign.period;
            }
        }
        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TreeParams;
    use crate::tree::Tree;
    use glam::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixtures() -> (FlightController, AnimationEngine) {
        let params = FlightParams {
            period_ms: 100,
            trigger_delay_ms: 50,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let tree = Tree::generate(&TreeParams::default(), Vec2::new(400.0, 780.0), &mut rng);
        let engine = AnimationEngine::with_rng(tree, params.clone(), 800.0, rng);
        (FlightController::new(params), engine)
    }

    #[test]
    fn test_campaign_fires_each_period() {
        let (mut flight, mut engine) = fixtures();
        let t0 = Instant::now();
        flight.start_random_flight(None, 2, t0);

        assert_eq!(flight.tick(t0, &mut engine), 0);
        assert_eq!(flight.tick(t0 + Duration::from_millis(100), &mut engine), 2);
        assert_eq!(flight.tick(t0 + Duration::from_millis(150), &mut engine), 0);
        assert_eq!(flight.tick(t0 + Duration::from_millis(250), &mut engine), 2);
    }

    #[test]
    fn test_new_campaign_supersedes_old() {
        let (mut flight, mut engine) = fixtures();
        let t0 = Instant::now();

        let eligible_a = engine.tree().eligible_count(Some(PaletteColor::Yellow));
        assert!(eligible_a > 2);

        flight.start_random_flight(Some(PaletteColor::Yellow), 1, t0);
        flight.start_random_flight(Some(PaletteColor::Black), 1, t0);

        // Only the black campaign fires; the yellow pool is untouched.
        flight.tick(t0 + Duration::from_millis(100), &mut engine);
        flight.tick(t0 + Duration::from_millis(200), &mut engine);
        assert_eq!(
            engine.tree().eligible_count(Some(PaletteColor::Yellow)),
            eligible_a
        );
        assert_eq!(engine.tree().used_count(), 2);
    }

    #[test]
    fn test_cancel_stops_firing_and_stale_handle_is_noop() {
        let (mut flight, mut engine) = fixtures();
        let t0 = Instant::now();

        let old = flight.start_random_flight(None, 1, t0);
        let _new = flight.start_random_flight(None, 3, t0);

        // Stale handle: the superseding campaign stays live.
        flight.cancel(old);
        assert!(flight.has_campaign());
        assert_eq!(flight.tick(t0 + Duration::from_millis(100), &mut engine), 3);

        let live = flight.start_random_flight(None, 1, t0);
        flight.cancel(live);
        assert!(!flight.has_campaign());
        assert_eq!(flight.tick(t0 + Duration::from_millis(500), &mut engine), 0);
    }

    #[test]
    fn test_delayed_triggers_accumulate_without_debounce() {
        let (mut flight, mut engine) = fixtures();
        let t0 = Instant::now();

        // Three rapid detections queue three triggers.
        flight.schedule_spawn(Some(PaletteColor::Red), 1, t0);
        flight.schedule_spawn(Some(PaletteColor::Green), 1, t0 + Duration::from_millis(10));
        flight.schedule_spawn(Some(PaletteColor::Blue), 2, t0 + Duration::from_millis(20));

        // Before the delay elapses nothing starts.
        flight.tick(t0 + Duration::from_millis(40), &mut engine);
        assert!(!flight.has_campaign());

        // All three fire; the last-queued trigger owns the campaign.
        flight.tick(t0 + Duration::from_millis(80), &mut engine);
        assert!(flight.has_campaign());
        let blue_before = engine.tree().eligible_count(Some(PaletteColor::Blue));
        flight.tick(t0 + Duration::from_millis(180), &mut engine);
        assert_eq!(
            engine.tree().eligible_count(Some(PaletteColor::Blue)),
            blue_before - 2
        );
    }

    #[test]
    fn test_stop_all_clears_queued_triggers() {
        let (mut flight, mut engine) = fixtures();
        let t0 = Instant::now();

        flight.schedule_spawn(None, 1, t0);
        flight.start_random_flight(None, 1, t0);
        flight.stop_all();

        assert!(!flight.has_campaign());
        assert_eq!(flight.tick(t0 + Duration::from_millis(500), &mut engine), 0);
        assert_eq!(engine.tree().used_count(), 0);
    }
}
