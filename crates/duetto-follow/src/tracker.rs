//! The position tracker: observation, transition, update, normalize, estimate.

use std::sync::Arc;

use duetto_core::{NoteEvent, RoleMode};
use duetto_input::PerformerEvent;
use serde::Serialize;

use crate::hypothesis::{Hypothesis, HYPOTHESIS_COUNT};
use crate::observation::ObservationWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

/// Best guess of where the performer is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerEstimate {
    /// Index into the solo sequence.
    pub position: usize,
    /// Start beat of the note at `position`.
    pub beat: f64,
    pub tempo: f64,
    /// Probability of the winning hypothesis.
    pub confidence: f64,
    /// Timestamp of the note-on that produced this estimate.
    pub timestamp_ms: f64,
}

#[derive(Debug, Clone)]
pub struct PositionTracker {
    sequence: Option<Arc<[NoteEvent]>>,
    base_tempo: f64,
    hypotheses: [Hypothesis; HYPOTHESIS_COUNT],
    position: usize,
    status: TrackerStatus,
    last_onset_ms: Option<f64>,
    last_estimate: Option<TrackerEstimate>,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionTracker {
    const DEFAULT_TEMPO: f64 = 120.0;

    pub fn new() -> Self {
        Self {
            sequence: None,
            base_tempo: Self::DEFAULT_TEMPO,
            hypotheses: Hypothesis::spread(0, Self::DEFAULT_TEMPO),
            position: 0,
            status: TrackerStatus::Stopped,
            last_onset_ms: None,
            last_estimate: None,
        }
    }

    /// Installs the expected solo line. `None` leaves the tracker inert.
    pub fn load(&mut self, sequence: Option<Arc<[NoteEvent]>>, base_tempo: f64) {
        if base_tempo.is_finite() && base_tempo > 0.0 {
            self.base_tempo = base_tempo;
        }
        self.sequence = sequence.filter(|s| !s.is_empty());
        if self.sequence.is_none() {
            tracing::warn!("no solo sequence loaded, score following disabled");
        }
        self.reset();
    }

    /// Starts tracking at the first solo note at or after `from_beat`.
    pub fn start(&mut self, from_beat: f64) {
        let position = self
            .sequence
            .as_deref()
            .map(|seq| {
                seq.iter()
                    .position(|n| n.start_beat >= from_beat)
                    .unwrap_or(seq.len().saturating_sub(1))
            })
            .unwrap_or(0);

        self.position = position;
        self.hypotheses = Hypothesis::spread(position, self.base_tempo);
        self.last_onset_ms = None;
        self.last_estimate = None;
        self.status = TrackerStatus::Running;
        tracing::debug!(position, from_beat, "tracker started");
    }

    pub fn pause(&mut self) {
        if self.status == TrackerStatus::Running {
            self.status = TrackerStatus::Paused;
        }
    }

    /// Continues from the current hypotheses. The gap since the last onset is
    /// not treated as performed time.
    pub fn resume(&mut self) {
        if self.status == TrackerStatus::Paused {
            self.last_onset_ms = None;
            self.status = TrackerStatus::Running;
        }
    }

    pub fn stop(&mut self) {
        self.reset();
    }

    /// Back to a uniform distribution at the top of the sequence.
    pub fn reset(&mut self) {
        self.position = 0;
        self.hypotheses = Hypothesis::spread(0, self.base_tempo);
        self.status = TrackerStatus::Stopped;
        self.last_onset_ms = None;
        self.last_estimate = None;
    }

    #[inline]
    pub fn status(&self) -> TrackerStatus {
        self.status
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.sequence.is_some()
    }

    #[inline]
    pub fn base_tempo(&self) -> f64 {
        self.base_tempo
    }

    /// Current MAP position.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn hypotheses(&self) -> &[Hypothesis; HYPOTHESIS_COUNT] {
        &self.hypotheses
    }

    pub fn last_estimate(&self) -> Option<TrackerEstimate> {
        self.last_estimate
    }

    /// Feeds one performer event through the filter.
    ///
    /// Returns `None` unless the tracker is running with a loaded sequence
    /// and the event is a note-on.
    pub fn process_note(&mut self, event: &PerformerEvent, mode: RoleMode) -> Option<TrackerEstimate> {
        if self.status != TrackerStatus::Running || !event.is_note_on() {
            return None;
        }
        let sequence = self.sequence.clone()?;

        let window = ObservationWindow::score(&sequence, self.position, event.note);

        // The first onset after start or resume has no interval to measure.
        if let Some(last) = self.last_onset_ms {
            let wall_ms = event.timestamp_ms - last;
            if wall_ms > 0.0 {
                for h in self.hypotheses.iter_mut() {
                    h.advance(&sequence, wall_ms, self.base_tempo, mode);
                }
            }
        }
        self.last_onset_ms = Some(match self.last_onset_ms {
            Some(last) => last.max(event.timestamp_ms),
            None => event.timestamp_ms,
        });

        for h in self.hypotheses.iter_mut() {
            h.probability *= window.likelihood(h.position);
        }
        self.normalize();

        let estimate = self.estimate(&sequence, event.timestamp_ms);
        self.position = estimate.position;
        self.last_estimate = Some(estimate);
        tracing::trace!(
            position = estimate.position,
            tempo = estimate.tempo,
            confidence = estimate.confidence,
            "tracker update"
        );
        Some(estimate)
    }

    fn normalize(&mut self) {
        let sum: f64 = self.hypotheses.iter().map(|h| h.probability).sum();
        if sum.is_finite() && sum > f64::MIN_POSITIVE {
            for h in self.hypotheses.iter_mut() {
                h.probability /= sum;
            }
        } else {
            tracing::warn!(sum, "hypothesis probabilities degenerated, resetting to uniform");
            let uniform = 1.0 / HYPOTHESIS_COUNT as f64;
            for h in self.hypotheses.iter_mut() {
                h.probability = uniform;
            }
        }
    }

    /// Most probable hypothesis; the first one wins a tie.
    fn estimate(&self, sequence: &[NoteEvent], timestamp_ms: f64) -> TrackerEstimate {
        let mut best = &self.hypotheses[0];
        for h in &self.hypotheses[1..] {
            if h.probability > best.probability {
                best = h;
            }
        }
        let beat = sequence
            .get(best.position)
            .map_or(0.0, |note| note.start_beat);

        TrackerEstimate {
            position: best.position,
            beat,
            tempo: best.tempo,
            confidence: best.probability,
            timestamp_ms,
        }
    }
}
