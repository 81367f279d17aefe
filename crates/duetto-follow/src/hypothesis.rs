//! Tempo/position hypotheses and the per-note transition step.

use duetto_core::{NoteEvent, RoleMode};

pub const HYPOTHESIS_COUNT: usize = 5;

/// Initial tempo spread around the base tempo.
const TEMPO_SPREAD: f64 = 0.3;

/// Tracked tempo bounds as fractions of the base tempo.
pub const MIN_TRACKED_RATIO: f64 = 0.3;
pub const MAX_TRACKED_RATIO: f64 = 3.0;

/// How many notes ahead a hypothesis may jump on one onset.
const MAX_ADVANCE: usize = 5;

const FOLLOW_ADAPT_RATE: f64 = 0.3;
const LEAD_ADAPT_RATE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypothesis {
    /// Index into the solo sequence.
    pub position: usize,
    pub tempo: f64,
    pub probability: f64,
}

impl Hypothesis {
    /// Uniform set at `position`, tempos spaced linearly over base ±30%.
    pub fn spread(position: usize, base_tempo: f64) -> [Hypothesis; HYPOTHESIS_COUNT] {
        let low = base_tempo * (1.0 - TEMPO_SPREAD);
        let step = base_tempo * 2.0 * TEMPO_SPREAD / (HYPOTHESIS_COUNT - 1) as f64;
        std::array::from_fn(|i| Hypothesis {
            position,
            tempo: low + step * i as f64,
            probability: 1.0 / HYPOTHESIS_COUNT as f64,
        })
    }

    /// Moves to the note whose start beat best matches the time elapsed at this
    /// hypothesis's tempo, then adapts the tempo toward what that move implies.
    pub(crate) fn advance(&mut self, sequence: &[NoteEvent], wall_ms: f64, base_tempo: f64, mode: RoleMode) {
        let Some(current) = sequence.get(self.position) else {
            return;
        };
        let minutes = wall_ms / 60_000.0;
        let target = current.start_beat + self.tempo * minutes;

        let last = (self.position + MAX_ADVANCE).min(sequence.len() - 1);
        let mut best = self.position;
        let mut best_distance = f64::INFINITY;
        for (index, note) in sequence.iter().enumerate().take(last + 1).skip(self.position) {
            let distance = (note.start_beat - target).abs();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }

        let beat_delta = sequence[best].start_beat - current.start_beat;
        self.position = best;

        // Staying put says nothing about tempo.
        if beat_delta > 0.0 && minutes > 0.0 {
            let observed = (beat_delta / minutes).clamp(base_tempo * MIN_TRACKED_RATIO, base_tempo * MAX_TRACKED_RATIO);
            let rate = match mode {
                RoleMode::Follow => FOLLOW_ADAPT_RATE,
                RoleMode::Lead => LEAD_ADAPT_RATE,
            };
            self.tempo += (observed - self.tempo) * rate;
        }
    }
}
