//! Live audio capture: cpal input stream into a shared sample ring.
//!
//! The stream callback runs on the audio thread and only pushes into the
//! ring; the UI thread copies the most recent window out on demand. The
//! window's backing buffer is allocated once at setup and reused for every
//! read.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::error::Error;

/// Anything that can hand out fixed-size sample windows. The seam between
/// the monitor and the capture device; tests substitute synthetic sources.
pub trait SampleSource {
    fn sample_rate(&self) -> f32;

    /// The most recent window, or `None` while the source is warming up.
    /// Implementations reuse one backing buffer across calls.
    fn read_window(&mut self) -> Option<&[f32]>;
}

/// Fixed-capacity overwrite-oldest ring of mono samples.
pub struct SampleRing {
    buf: Vec<f32>,
    head: usize,
    filled: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity],
            head: 0,
            filled: 0,
        }
    }

    /// Append samples, overwriting the oldest once full.
    pub fn push_slice(&mut self, samples: &[f32]) {
        for &s in samples {
            self.buf[self.head] = s;
            self.head = (self.head + 1) % self.buf.len();
        }
        self.filled = (self.filled + samples.len()).min(self.buf.len());
    }

    /// Copy the most recent `out.len()` samples, oldest first. Returns
    /// false while fewer samples than that have been pushed.
    pub fn latest_into(&self, out: &mut [f32]) -> bool {
        let n = out.len();
        if self.filled < n {
            return false;
        }
        let cap = self.buf.len();
        let start = (self.head + cap - n) % cap;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.buf[(start + i) % cap];
        }
        true
    }
}

/// Capture context: one persistent input stream per `setup` call, released
/// when the adapter is dropped.
pub struct CaptureAdapter {
    ring: Arc<Mutex<SampleRing>>,
    window: Vec<f32>,
    sample_rate: f32,
    _stream: cpal::Stream,
}

impl CaptureAdapter {
    /// Open the default input device and start streaming into the ring.
    pub fn setup(window_size: usize) -> Result<Self, Error> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Capture("no audio input device found".into()))?;

        let config = device
            .default_input_config()
            .map_err(|e| Error::Capture(format!("failed to get input config: {}", e)))?;

        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(Error::Capture(format!(
                "unsupported input sample format {:?}",
                config.sample_format()
            )));
        }

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        info!(
            "capture: {} @ {}Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            channels
        );

        // Keep a few windows of history so a slow frame cannot starve reads.
        let ring = Arc::new(Mutex::new(SampleRing::new(window_size * 4)));
        let ring_writer = Arc::clone(&ring);
        let mut mono = Vec::with_capacity(window_size);

        let stream = device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    mono.clear();
                    mono.extend(
                        data.chunks_exact(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                    );
                    if let Ok(mut ring) = ring_writer.lock() {
                        ring.push_slice(&mono);
                    }
                },
                |err| warn!("audio input stream error: {}", err),
                None,
            )
            .map_err(|e| Error::Capture(format!("failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| Error::Capture(format!("failed to start input stream: {}", e)))?;

        Ok(Self {
            ring,
            window: vec![0.0; window_size],
            sample_rate,
            _stream: stream,
        })
    }
}

impl SampleSource for CaptureAdapter {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn read_window(&mut self) -> Option<&[f32]> {
        let ready = match self.ring.lock() {
            Ok(ring) => ring.latest_into(&mut self.window),
            Err(_) => false,
        };
        if ready {
            Some(&self.window)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_reports_not_ready_until_filled() {
        let mut ring = SampleRing::new(8);
        let mut out = [0.0f32; 4];

        assert!(!ring.latest_into(&mut out));
        ring.push_slice(&[1.0, 2.0, 3.0]);
        assert!(!ring.latest_into(&mut out));
        ring.push_slice(&[4.0]);
        assert!(ring.latest_into(&mut out));
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ring_returns_most_recent_window_in_order() {
        let mut ring = SampleRing::new(8);
        for i in 0..20 {
            ring.push_slice(&[i as f32]);
        }

        let mut out = [0.0f32; 5];
        assert!(ring.latest_into(&mut out));
        assert_eq!(out, [15.0, 16.0, 17.0, 18.0, 19.0]);
    }

    #[test]
    fn test_ring_handles_pushes_larger_than_capacity() {
        let mut ring = SampleRing::new(4);
        let big: Vec<f32> = (0..10).map(|i| i as f32).collect();
        ring.push_slice(&big);

        let mut out = [0.0f32; 4];
        assert!(ring.latest_into(&mut out));
        assert_eq!(out, [6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_window_sized_read_across_wrap() {
        let mut ring = SampleRing::new(6);
        ring.push_slice(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        ring.push_slice(&[6.0, 7.0]);

        let mut out = [0.0f32; 6];
        assert!(ring.latest_into(&mut out));
        assert_eq!(out, [2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }
}
