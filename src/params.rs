//! Parameter definitions with physical units and documented semantics.
//!
//! All tunable values live here with documented units and ranges, following
//! the convention of one struct per subsystem with a `Default` impl and an
//! explicit `validate()`.

use crate::detector::DetectorKind;
use crate::error::Error;

/// Pitch detection configuration.
#[derive(Debug, Clone)]
pub struct DetectorParams {
    /// Which estimation algorithm the service worker runs
    pub kind: DetectorKind,

    /// Analysis window size (samples)
    pub window_size: usize,

    /// Detector padding (samples); the detector's internal buffers are
    /// sized to `window_size + padding`
    pub padding: usize,

    /// Minimum mean signal power for a detection (linear, not dB)
    pub power_threshold: f64,

    /// Minimum clarity (0-1) for a detection
    pub clarity_threshold: f64,

    /// Whether the monitor starts listening immediately
    pub enabled: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            kind: DetectorKind::McLeod,
            window_size: 1024,
            padding: 512,
            power_threshold: 5.0,
            clarity_threshold: 0.7,
            enabled: true,
        }
    }
}

impl DetectorParams {
    /// Validate configuration (window large enough for low notes, sane thresholds)
    pub fn validate(&self) -> Result<(), Error> {
        if self.window_size < 256 {
            return Err(Error::Config(format!(
                "window size must be at least 256 samples, got {}",
                self.window_size
            )));
        }
        if self.padding > self.window_size {
            return Err(Error::Config(format!(
                "padding ({}) must not exceed window size ({})",
                self.padding, self.window_size
            )));
        }
        if !(0.0..=1.0).contains(&self.clarity_threshold) {
            return Err(Error::Config(format!(
                "clarity threshold must be in [0, 1], got {}",
                self.clarity_threshold
            )));
        }
        Ok(())
    }
}

/// Tree generation parameters.
#[derive(Debug, Clone)]
pub struct TreeParams {
    /// Recursion depth; a leaf slot is recorded at every endpoint with
    /// remaining depth <= 1
    pub depth: u32,

    /// Trunk length (canvas pixels)
    pub trunk_len_px: f32,

    /// Child branch length as a fraction of its parent
    pub shrink: f32,

    /// Total angular spread of the child fan (radians)
    pub fan_arc_rad: f32,

    /// Branch into 3 children while remaining depth is above this, else 2
    pub triple_above_depth: u32,

    /// Leaf triangle size (canvas pixels)
    pub leaf_size_px: f32,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            depth: 8,
            trunk_len_px: 130.0,
            shrink: 0.65,
            fan_arc_rad: 1.5,
            triple_above_depth: 4,
            leaf_size_px: 7.0,
        }
    }
}

impl TreeParams {
    pub fn validate(&self) -> Result<(), Error> {
        if self.depth < 2 {
            return Err(Error::Config(format!(
                "tree depth must be at least 2, got {}",
                self.depth
            )));
        }
        if self.depth > 10 {
            return Err(Error::Config(format!(
                "tree depth above 10 explodes the leaf count, got {}",
                self.depth
            )));
        }
        if !(0.0..1.0).contains(&self.shrink) || self.shrink == 0.0 {
            return Err(Error::Config(format!(
                "shrink must be in (0, 1), got {}",
                self.shrink
            )));
        }
        Ok(())
    }

    /// Closed-form leaf slot count for the branching rule: every level with
    /// remaining depth above `triple_above_depth` fans into 3, the rest into 2.
    pub fn expected_leaf_count(&self) -> usize {
        let mut count = 1usize;
        let mut depth = self.depth;
        while depth > 1 {
            count *= if depth > self.triple_above_depth { 3 } else { 2 };
            depth -= 1;
        }
        count
    }
}

/// Bird flight and spawn campaign parameters.
#[derive(Debug, Clone)]
pub struct FlightParams {
    /// Repeating campaign period (milliseconds)
    pub period_ms: u64,

    /// Fixed delay between a detection and its campaign start (milliseconds)
    pub trigger_delay_ms: u64,

    /// Bird launch speed range (canvas pixels per second)
    pub speed_px_s: (f32, f32),

    /// Total launch arc centred on straight up (radians)
    pub launch_arc_rad: f32,

    /// A bird is retired once it leaves the canvas by this margin (pixels)
    pub cull_margin_px: f32,

    /// Bird triangle size (canvas pixels)
    pub bird_size_px: f32,
}

impl Default for FlightParams {
    fn default() -> Self {
        Self {
            period_ms: 800,
            trigger_delay_ms: 500,
            speed_px_s: (90.0, 220.0),
            launch_arc_rad: 2.0,
            cull_margin_px: 60.0,
            bird_size_px: 11.0,
        }
    }
}

impl FlightParams {
    pub fn validate(&self) -> Result<(), Error> {
        if self.period_ms == 0 {
            return Err(Error::Config("campaign period must be non-zero".into()));
        }
        let (lo, hi) = self.speed_px_s;
        if !(lo > 0.0 && hi >= lo) {
            return Err(Error::Config(format!(
                "speed range must satisfy 0 < min <= max, got ({}, {})",
                lo, hi
            )));
        }
        Ok(())
    }
}

/// Rendering configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Canvas is a fixed square of this many pixels per side
    pub canvas_px: u32,

    /// Clear color (linear RGB)
    pub background: [f64; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas_px: 800,
            background: [0.86, 0.91, 0.95],
        }
    }
}

impl RenderConfig {
    pub fn size(&self) -> f32 {
        self.canvas_px as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(DetectorParams::default().validate().is_ok());
        assert!(TreeParams::default().validate().is_ok());
        assert!(FlightParams::default().validate().is_ok());
    }

    #[test]
    fn test_detector_rejects_tiny_window() {
        let params = DetectorParams {
            window_size: 64,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_expected_leaf_count() {
        // Depth 8 with the default rule: four 3-way levels, three 2-way levels.
        let params = TreeParams::default();
        assert_eq!(params.expected_leaf_count(), 3usize.pow(4) * 2usize.pow(3));

        let shallow = TreeParams {
            depth: 3,
            ..Default::default()
        };
        assert_eq!(shallow.expected_leaf_count(), 4);
    }
}
