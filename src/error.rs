//! Centralized error type for the duetto umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] duetto_core::Error),

    #[error("Input: {0}")]
    Input(#[from] duetto_input::Error),

    #[error("engine runner is not running")]
    RunnerStopped,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
