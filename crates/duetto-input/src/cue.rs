//! Motion cues from a camera or sensor collaborator.

use serde::{Deserialize, Serialize};

/// Minimum confidence for a gesture to release a wait.
pub const WAIT_TRIGGER_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionKind {
    Breath,
    Nod,
    Sway,
    Preparation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionCue {
    #[serde(rename = "type")]
    pub kind: MotionKind,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: f64,
    pub confidence: f64,
}

impl MotionCue {
    pub fn new(kind: MotionKind, timestamp_ms: f64, confidence: f64) -> Self {
        Self {
            kind,
            timestamp_ms,
            confidence,
        }
    }

    /// Whether this gesture is strong enough to release a wait.
    ///
    /// Sway is continuous body motion and never counts as an entry cue.
    pub fn is_wait_trigger(&self) -> bool {
        matches!(self.kind, MotionKind::Breath | MotionKind::Nod | MotionKind::Preparation)
            && self.confidence > WAIT_TRIGGER_CONFIDENCE
    }

    /// Signed intensity in `[-1, 1]`, zero at confidence 0.5.
    pub fn intensity(&self) -> f64 {
        if self.confidence.is_nan() {
            return 0.0;
        }
        ((self.confidence - 0.5) * 2.0).clamp(-1.0, 1.0)
    }
}
