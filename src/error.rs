//! Crate-wide error type.
//!
//! Only setup paths (configuration, capture, rendering) return errors;
//! everything that can fail per-frame is logged and skipped instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("audio capture: {0}")]
    Capture(String),

    #[error("rendering: {0}")]
    Render(String),
}
