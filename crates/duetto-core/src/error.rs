//! Error types for duetto-core.

use thiserror::Error;

/// Error type for duetto-core operations.
///
/// Only boundary operations (configuration, score loading) return errors.
/// Tracking and scheduling fall back to sane values instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid tempo: {0}. Must be a positive, finite BPM value")]
    InvalidTempo(f64),

    #[error("Invalid time signature: {beats}/{beat_type}")]
    InvalidTimeSignature { beats: u32, beat_type: u32 },

    #[error("Score has no measures to play")]
    EmptyPlaybackOrder,
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
