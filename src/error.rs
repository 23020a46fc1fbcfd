//! Crate error type.
//!
//! The simulation hot path never raises errors: missing components mean
//! "entity not applicable this frame" and frame-time anomalies are clamped
//! locally. `SimError` only covers the edges where the core meets the
//! outside world.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// A command was sent to a game loop that has already stopped.
    #[error("simulation loop is not running")]
    LoopStopped,

    /// Snapshot (de)serialization failed.
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
