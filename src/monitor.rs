//! Pitch monitor: the enable/disable lifecycle around capture, scheduling
//! and note-triggered flights.
//!
//! State machine: `Disabled -> Initializing -> Running -> Disabled`.
//! Disabling is cooperative: the in-flight pitch request is not aborted,
//! its response simply dies with the dropped channel and is never acted
//! upon. Stale results are harmless because every display update is an
//! idempotent snapshot.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::capture::SampleSource;
use crate::detector::PitchService;
use crate::flight::FlightController;
use crate::note::frequency_to_note;
use crate::params::DetectorParams;
use crate::scheduler::{Detection, PitchScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Disabled,
    Initializing,
    Running,
}

/// Display callback: `(frequency, clarity)`, both `None` on silence.
pub type DisplayFn = Box<dyn FnMut(Option<f32>, Option<f32>)>;

pub struct PitchMonitor {
    state: MonitorState,
    params: DetectorParams,
    source: Option<Box<dyn SampleSource>>,
    scheduler: Option<PitchScheduler>,
    display: DisplayFn,
}

impl PitchMonitor {
    pub fn new(params: DetectorParams, display: DisplayFn) -> Self {
        Self {
            state: MonitorState::Disabled,
            params,
            source: None,
            scheduler: None,
            display,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    /// Bring the monitor up: spawn the pitch service (detector
    /// construction) and adopt the capture source.
    pub fn enable(&mut self, source: Box<dyn SampleSource>) {
        if self.state != MonitorState::Disabled {
            warn!("enable ignored: monitor is {:?}", self.state);
            return;
        }
        self.state = MonitorState::Initializing;

        let service = PitchService::spawn(
            self.params.kind,
            self.params.window_size,
            self.params.padding,
        );
        self.scheduler = Some(PitchScheduler::new(service, &self.params));
        self.source = Some(source);

        self.state = MonitorState::Running;
        info!(
            "pitch monitor running: {:?}, window {} samples",
            self.params.kind, self.params.window_size
        );
    }

    /// Tear the monitor down. Dropping the scheduler drops the service
    /// handle; the worker exits and any late response is discarded.
    pub fn disable(&mut self) {
        if self.state == MonitorState::Disabled {
            return;
        }
        self.scheduler = None;
        self.source = None;
        self.state = MonitorState::Disabled;
        (self.display)(None, None);
        info!("pitch monitor disabled");
    }

    /// One frame of the capture/pitch loop. Only does work while running.
    pub fn tick(&mut self, now: Instant, flight: &mut FlightController) {
        if self.state != MonitorState::Running {
            return;
        }
        let (Some(scheduler), Some(source)) = (self.scheduler.as_mut(), self.source.as_mut())
        else {
            return;
        };

        let sample_rate = source.sample_rate();
        let detection = scheduler.tick(source.read_window().map(|w| (w, sample_rate)));

        match detection {
            Some(Detection::Pitch { frequency, clarity }) => {
                (self.display)(Some(frequency), Some(clarity));
                if let Some(note) = frequency_to_note(frequency) {
                    let color = note.name.palette();
                    let count = note.octave.max(1) as usize;
                    debug!(
                        "detected {} ({:.1} Hz, clarity {:.2}) -> {} x{}",
                        note, frequency, clarity, color, count
                    );
                    flight.schedule_spawn(Some(color), count, now);
                }
            }
            Some(Detection::Silence) => (self.display)(None, None),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectorKind;
    use crate::engine::AnimationEngine;
    use crate::params::{FlightParams, TreeParams};
    use crate::tree::Tree;
    use glam::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::f64::consts::PI;
    use std::rc::Rc;
    use std::thread;
    use std::time::Duration;

    /// Repeats one synthesized window forever.
    struct SineSource {
        window: Vec<f32>,
        sample_rate: f32,
    }

    impl SineSource {
        fn new(freq: f64, sample_rate: f32, len: usize) -> Self {
            let window = (0..len)
                .map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin() as f32)
                .collect();
            Self {
                window,
                sample_rate,
            }
        }
    }

    impl SampleSource for SineSource {
        fn sample_rate(&self) -> f32 {
            self.sample_rate
        }

        fn read_window(&mut self) -> Option<&[f32]> {
            Some(&self.window)
        }
    }

    fn fixtures() -> (PitchMonitor, FlightController, AnimationEngine, Rc<Cell<u32>>) {
        let updates = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&updates);
        let display: DisplayFn = Box::new(move |freq, _clarity| {
            if freq.is_some() {
                seen.set(seen.get() + 1);
            }
        });

        let params = DetectorParams {
            kind: DetectorKind::McLeod,
            ..Default::default()
        };
        let monitor = PitchMonitor::new(params, display);

        let flight_params = FlightParams {
            trigger_delay_ms: 10,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let tree = Tree::generate(&TreeParams::default(), Vec2::new(400.0, 780.0), &mut rng);
        let engine = AnimationEngine::with_rng(tree, flight_params.clone(), 800.0, rng);
        (
            monitor,
            FlightController::new(flight_params),
            engine,
            updates,
        )
    }

    fn tick_until_detection(
        monitor: &mut PitchMonitor,
        flight: &mut FlightController,
        updates: &Cell<u32>,
    ) {
        for _ in 0..500 {
            monitor.tick(Instant::now(), flight);
            if updates.get() > 0 {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("no detection within a second of ticking");
    }

    #[test]
    fn test_detection_drives_display_and_flight_trigger() {
        let (mut monitor, mut flight, mut engine, updates) = fixtures();
        monitor.enable(Box::new(SineSource::new(440.0, 48_000.0, 1024)));
        assert!(monitor.is_running());

        tick_until_detection(&mut monitor, &mut flight, &updates);

        // The queued trigger starts an A-colored (ash) campaign after the
        // delay, and the campaign spawns on its period.
        let deadline = Instant::now() + Duration::from_millis(50);
        while Instant::now() < deadline {
            flight.tick(Instant::now(), &mut engine);
            thread::sleep(Duration::from_millis(5));
        }
        assert!(flight.has_campaign());
    }

    #[test]
    fn test_disable_mid_flight_stops_display_updates() {
        let (mut monitor, mut flight, _engine, updates) = fixtures();
        monitor.enable(Box::new(SineSource::new(440.0, 48_000.0, 1024)));

        tick_until_detection(&mut monitor, &mut flight, &updates);

        // Put a request in flight, then disable before it resolves.
        monitor.tick(Instant::now(), &mut flight);
        monitor.disable();
        assert_eq!(monitor.state(), MonitorState::Disabled);

        // Give the (dropped) worker time to finish the in-flight request,
        // then keep ticking: no further display updates may arrive.
        let seen = updates.get();
        thread::sleep(Duration::from_millis(50));
        for _ in 0..10 {
            monitor.tick(Instant::now(), &mut flight);
        }
        assert_eq!(updates.get(), seen);
    }

    #[test]
    fn test_enable_twice_is_a_noop() {
        let (mut monitor, _flight, _engine, _updates) = fixtures();
        monitor.enable(Box::new(SineSource::new(440.0, 48_000.0, 1024)));
        monitor.enable(Box::new(SineSource::new(880.0, 48_000.0, 1024)));
        assert!(monitor.is_running());
    }

    #[test]
    fn test_disable_then_enable_again() {
        let (mut monitor, mut flight, _engine, updates) = fixtures();
        monitor.enable(Box::new(SineSource::new(440.0, 48_000.0, 1024)));
        tick_until_detection(&mut monitor, &mut flight, &updates);

        monitor.disable();
        monitor.enable(Box::new(SineSource::new(440.0, 48_000.0, 1024)));
        assert!(monitor.is_running());

        updates.set(0);
        tick_until_detection(&mut monitor, &mut flight, &updates);
    }
}
