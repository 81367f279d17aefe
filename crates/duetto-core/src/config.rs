//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How the virtual playback clock derives its tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Blend tracked performer tempo with the lead tempo according to the active role.
    #[default]
    Adaptive,
    /// Play at the lead tempo regardless of the performer.
    Fixed,
}

impl PlaybackMode {
    /// Beats of accompaniment scheduled ahead of the clock.
    #[inline]
    pub fn lookahead_beats(self) -> f64 {
        match self {
            PlaybackMode::Adaptive => 2.0,
            PlaybackMode::Fixed => 4.0,
        }
    }
}

/// Configuration for the accompaniment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub mode: PlaybackMode,
    /// Period of the auto-play clock tick.
    pub tick_interval_ms: f64,
    /// Time spent in `listening` before playback resumes.
    pub listening_delay_ms: f64,
    /// Minimum spacing between tick-driven state snapshots.
    pub publish_interval_ms: f64,
    /// Tracker confidence required before the clock is corrected toward it.
    pub confidence_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::Adaptive,
            tick_interval_ms: 50.0,
            listening_delay_ms: 400.0,
            publish_interval_ms: 200.0,
            confidence_threshold: 0.3,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if !positive(self.tick_interval_ms) {
            return Err(Error::InvalidConfig(format!(
                "tick_interval_ms {} must be positive",
                self.tick_interval_ms
            )));
        }
        if !(self.listening_delay_ms.is_finite() && self.listening_delay_ms >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "listening_delay_ms {} must be non-negative",
                self.listening_delay_ms
            )));
        }
        if !(self.publish_interval_ms.is_finite() && self.publish_interval_ms >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "publish_interval_ms {} must be non-negative",
                self.publish_interval_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::InvalidConfig(format!(
                "confidence_threshold {} out of range (0-1)",
                self.confidence_threshold
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn lookahead_beats(&self) -> f64 {
        self.mode.lookahead_beats()
    }
}
