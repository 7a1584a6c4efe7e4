//! Frame-driven pitch request scheduling.
//!
//! The render cadence is faster than a pitch round trip, so the scheduler
//! keeps at most one request outstanding: while `pending` is set, a tick
//! only polls for the response and otherwise drops the frame. All state
//! here is touched from the UI-thread frame callback only; the single
//! cooperative loop is what makes the plain `bool` correct.

use tracing::{error, trace, warn};

use crate::detector::{PitchRequest, PitchServiceHandle, ServicePoll};
use crate::params::DetectorParams;

/// Latest completed estimation, replaced each cycle.
#[derive(Debug, Clone, Copy)]
pub struct PitchResult {
    /// Estimated fundamental (Hz); non-positive means no pitch
    pub frequency: f32,
    /// Confidence in [0, 1]
    pub clarity: f32,
}

/// Classification of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    Pitch { frequency: f32, clarity: f32 },
    Silence,
}

pub struct PitchScheduler {
    service: PitchServiceHandle,
    pending: bool,
    latest: Option<PitchResult>,
    power_threshold: f64,
    clarity_threshold: f64,
}

impl PitchScheduler {
    pub fn new(service: PitchServiceHandle, params: &DetectorParams) -> Self {
        Self {
            service,
            pending: false,
            latest: None,
            power_threshold: params.power_threshold,
            clarity_threshold: params.clarity_threshold,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn latest(&self) -> Option<PitchResult> {
        self.latest
    }

    /// One frame of work. `window` is the current sample window and rate,
    /// or `None` while capture is warming up.
    ///
    /// Returns `Some` exactly when a response completed this tick.
    pub fn tick(&mut self, window: Option<(&[f32], f32)>) -> Option<Detection> {
        if self.pending {
            return match self.service.poll_response() {
                ServicePoll::Ready(resp) => {
                    self.pending = false;
                    self.latest = Some(PitchResult {
                        frequency: resp.frequency,
                        clarity: resp.clarity,
                    });
                    if resp.frequency > 0.0 {
                        Some(Detection::Pitch {
                            frequency: resp.frequency,
                            clarity: resp.clarity,
                        })
                    } else {
                        Some(Detection::Silence)
                    }
                }
                // Round trip still in flight; this frame is dropped.
                ServicePoll::Pending => None,
                ServicePoll::Disconnected => {
                    // Clearing `pending` here keeps a dead service from
                    // wedging the scheduler forever.
                    error!("pitch service disconnected with a request in flight");
                    self.pending = false;
                    None
                }
            };
        }

        let Some((samples, sample_rate)) = window else {
            trace!("capture window not ready, skipping pitch tick");
            return None;
        };

        let request = PitchRequest {
            samples: samples.to_vec(),
            sample_rate: sample_rate.round() as usize,
            power_threshold: self.power_threshold,
            clarity_threshold: self.clarity_threshold,
        };
        match self.service.request(request) {
            Ok(()) => self.pending = true,
            Err(e) => warn!("pitch request not sent: {}", e),
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::PitchResponse;
    use crossbeam_channel::unbounded;

    fn scheduler_with_stub() -> (
        PitchScheduler,
        crossbeam_channel::Receiver<PitchRequest>,
        crossbeam_channel::Sender<PitchResponse>,
    ) {
        let (req_tx, req_rx) = unbounded();
        let (resp_tx, resp_rx) = unbounded();
        let handle = PitchServiceHandle::from_channels(req_tx, resp_rx);
        let scheduler = PitchScheduler::new(handle, &DetectorParams::default());
        (scheduler, req_rx, resp_tx)
    }

    #[test]
    fn test_at_most_one_outstanding_request() {
        let (mut scheduler, req_rx, _resp_tx) = scheduler_with_stub();
        let window = vec![0.25f32; 1024];

        // The service never answers; repeated ticks must not stack requests.
        for _ in 0..20 {
            let out = scheduler.tick(Some((&window, 48_000.0)));
            assert!(out.is_none());
        }

        assert_eq!(req_rx.try_iter().count(), 1);
        assert!(scheduler.is_pending());
    }

    #[test]
    fn test_response_completes_cycle_and_allows_next_request() {
        let (mut scheduler, req_rx, resp_tx) = scheduler_with_stub();
        let window = vec![0.25f32; 1024];

        scheduler.tick(Some((&window, 48_000.0)));
        assert!(scheduler.is_pending());

        resp_tx
            .send(PitchResponse {
                frequency: 440.0,
                clarity: 0.9,
            })
            .unwrap();

        let detection = scheduler.tick(Some((&window, 48_000.0)));
        assert_eq!(
            detection,
            Some(Detection::Pitch {
                frequency: 440.0,
                clarity: 0.9
            })
        );
        assert!(!scheduler.is_pending());
        let latest = scheduler.latest().unwrap();
        assert_eq!(latest.frequency, 440.0);

        // The next tick issues a fresh request.
        scheduler.tick(Some((&window, 48_000.0)));
        assert_eq!(req_rx.try_iter().count(), 2);
    }

    #[test]
    fn test_non_positive_frequency_is_silence() {
        let (mut scheduler, _req_rx, resp_tx) = scheduler_with_stub();
        let window = vec![0.0f32; 1024];

        scheduler.tick(Some((&window, 48_000.0)));
        resp_tx
            .send(PitchResponse {
                frequency: -1.0,
                clarity: 0.0,
            })
            .unwrap();

        assert_eq!(
            scheduler.tick(Some((&window, 48_000.0))),
            Some(Detection::Silence)
        );
    }

    #[test]
    fn test_missing_window_is_a_noop() {
        let (mut scheduler, req_rx, _resp_tx) = scheduler_with_stub();

        for _ in 0..5 {
            assert!(scheduler.tick(None).is_none());
        }
        assert_eq!(req_rx.try_iter().count(), 0);
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_disconnected_service_clears_pending() {
        let (mut scheduler, req_rx, resp_tx) = scheduler_with_stub();
        let window = vec![0.25f32; 1024];

        scheduler.tick(Some((&window, 48_000.0)));
        assert!(scheduler.is_pending());

        // Worker dies with the request in flight.
        drop(resp_tx);
        assert!(scheduler.tick(Some((&window, 48_000.0))).is_none());
        assert!(!scheduler.is_pending());

        // Subsequent ticks still try to make progress instead of wedging.
        scheduler.tick(Some((&window, 48_000.0)));
        assert_eq!(req_rx.try_iter().count(), 2);
    }
}
