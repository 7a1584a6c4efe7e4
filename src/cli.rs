//! Command-line argument parsing.

use clap::Parser;
use tracing::warn;

use crate::detector::DetectorKind;
use crate::params::{DetectorParams, TreeParams};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Fledge")]
#[command(about = "Audio-reactive aviary: play a note, launch a bird", long_about = None)]
pub struct Args {
    /// Pitch detector: mcleod (default) or autocorrelation
    #[arg(long, value_name = "KIND", default_value = "mcleod")]
    pub detector: String,

    /// Analysis window size in samples
    #[arg(long, value_name = "SAMPLES", default_value = "1024")]
    pub window_size: usize,

    /// Minimum signal power for a detection
    #[arg(long, value_name = "POWER", default_value = "5.0")]
    pub power_threshold: f64,

    /// Minimum clarity (0-1) for a detection
    #[arg(long, value_name = "CLARITY", default_value = "0.7")]
    pub clarity_threshold: f64,

    /// Start with the microphone off (toggle with Space)
    #[arg(long)]
    pub muted: bool,

    /// Tree recursion depth (2-10)
    #[arg(long, value_name = "DEPTH", default_value = "8")]
    pub tree_depth: u32,
}

impl Args {
    /// Parse the detector kind, falling back to McLeod on unknown input.
    pub fn parse_detector_kind(&self) -> DetectorKind {
        match self.detector.to_lowercase().as_str() {
            "autocorrelation" | "acf" => DetectorKind::Autocorrelation,
            "mcleod" | "mpm" => DetectorKind::McLeod,
            other => {
                warn!("unknown detector '{}', using mcleod", other);
                DetectorKind::McLeod
            }
        }
    }

    pub fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            kind: self.parse_detector_kind(),
            window_size: self.window_size,
            padding: self.window_size / 2,
            power_threshold: self.power_threshold,
            clarity_threshold: self.clarity_threshold,
            enabled: !self.muted,
        }
    }

    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            depth: self.tree_depth,
            ..Default::default()
        }
    }
}
