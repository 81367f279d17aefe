//! Accompaniment scheduler: virtual beat clock plus lookahead note emission.
//!
//! The clock advances in fixed ticks ("auto-play") and is pulled toward the
//! tracker's estimate whenever a confident observation arrives. Notes are
//! emitted ahead of the clock with a millisecond delay so the synthesis side
//! can place them precisely.
//!
//! A hold beat (the start of a measure that carries an unfired wait) bounds
//! both the clock and the emission window, so nothing at or past it is sent
//! to the synth until the owner lifts the hold.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::PlaybackMode;
use crate::score::{NoteEvent, PlaybackTimeline};

/// Lower bound of playback tempo as a fraction of the base tempo.
pub const MIN_PLAYBACK_RATIO: f64 = 0.5;
/// Upper bound of playback tempo as a fraction of the base tempo.
pub const MAX_PLAYBACK_RATIO: f64 = 2.0;

/// Receives scheduled accompaniment notes.
pub trait NoteSink {
    /// `delay_ms` is measured from the tick that emitted the note.
    fn schedule(&mut self, note: &NoteEvent, delay_ms: f64);
}

impl<F> NoteSink for F
where
    F: FnMut(&NoteEvent, f64),
{
    fn schedule(&mut self, note: &NoteEvent, delay_ms: f64) {
        self(note, delay_ms)
    }
}

/// Mixes lead and performer tempo; `lead_weight` is the role factor.
#[inline]
pub fn blend_tempo(lead_tempo: f64, tracker_tempo: f64, lead_weight: f64) -> f64 {
    lead_tempo * lead_weight + tracker_tempo * (1.0 - lead_weight)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { emitted: usize },
    /// The clock ran past the last measure of the playback order.
    Finished,
}

pub struct AccompanimentScheduler {
    notes: Arc<[NoteEvent]>,
    timeline: PlaybackTimeline,
    mode: PlaybackMode,
    lookahead_beats: f64,
    base_tempo: f64,
    lead_tempo: f64,
    effective_tempo: f64,
    current_beat: f64,
    cursor: usize,
    hold_beat: Option<f64>,
}

impl AccompanimentScheduler {
    /// `notes` must be sorted by start beat.
    pub fn new(notes: Arc<[NoteEvent]>, timeline: PlaybackTimeline, base_tempo: f64, mode: PlaybackMode) -> Self {
        Self {
            notes,
            timeline,
            mode,
            lookahead_beats: mode.lookahead_beats(),
            base_tempo,
            lead_tempo: base_tempo,
            effective_tempo: base_tempo,
            current_beat: 0.0,
            cursor: 0,
            hold_beat: None,
        }
    }

    #[inline]
    pub fn current_beat(&self) -> f64 {
        self.current_beat
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn base_tempo(&self) -> f64 {
        self.base_tempo
    }

    #[inline]
    pub fn lead_tempo(&self) -> f64 {
        self.lead_tempo
    }

    #[inline]
    pub fn effective_tempo(&self) -> f64 {
        self.effective_tempo
    }

    #[inline]
    pub fn hold_beat(&self) -> Option<f64> {
        self.hold_beat
    }

    /// Bounds the clock and the emission window at `beat`; `None` lifts the hold.
    pub fn set_hold(&mut self, beat: Option<f64>) {
        self.hold_beat = beat;
    }

    /// True when the clock has reached the hold beat.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.hold_beat.is_some_and(|hold| self.current_beat >= hold)
    }

    #[inline]
    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    #[inline]
    pub fn timeline(&self) -> &PlaybackTimeline {
        &self.timeline
    }

    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    #[inline]
    pub fn playback_index(&self) -> usize {
        self.timeline.playback_index(self.current_beat)
    }

    #[inline]
    pub fn current_measure(&self) -> Option<i32> {
        self.timeline.measure_at(self.current_beat)
    }

    /// Replaces the piece tempo; clamps are measured against it from now on.
    pub fn set_base_tempo(&mut self, bpm: f64) {
        if bpm.is_finite() && bpm > 0.0 {
            tracing::debug!(from = self.base_tempo, to = bpm, "base tempo changed");
            self.base_tempo = bpm;
            self.lead_tempo = bpm;
            self.effective_tempo = self.clamp_playback(self.effective_tempo);
        }
    }

    /// Scales the lead tempo, keeping it within `[min_ratio, max_ratio] × base`.
    pub fn nudge_lead_tempo(&mut self, scale: f64, min_ratio: f64, max_ratio: f64) {
        let target = self.lead_tempo * scale;
        self.lead_tempo = target.clamp(self.base_tempo * min_ratio, self.base_tempo * max_ratio);
    }

    /// Recomputes the playback tempo for the active role and latest tracker tempo.
    pub fn update_tempo(&mut self, role_factor: f64, tracker_tempo: Option<f64>) -> f64 {
        let raw = match (self.mode, tracker_tempo) {
            (PlaybackMode::Adaptive, Some(tracked)) if tracked.is_finite() => blend_tempo(self.lead_tempo, tracked, role_factor),
            _ => self.lead_tempo,
        };
        self.effective_tempo = self.clamp_playback(raw);
        self.effective_tempo
    }

    /// Emits the notes inside the lookahead window, then advances the clock.
    pub fn tick(&mut self, tick_ms: f64, muted: &HashSet<usize>, sink: &mut dyn NoteSink) -> TickOutcome {
        let emitted = self.emit_window(muted, sink);

        let advanced = self.current_beat + self.effective_tempo / 60_000.0 * tick_ms;
        self.current_beat = self.bound_by_hold(advanced);

        if self.timeline.is_past_end(self.current_beat) {
            TickOutcome::Finished
        } else {
            TickOutcome::Running { emitted }
        }
    }

    /// Pulls the clock toward the tracker: `beat·w + tracker_beat·(1-w)`.
    ///
    /// The cursor is left alone, so a backward pull only delays emission. A
    /// forward pull stops at the hold beat.
    pub fn correct_toward(&mut self, tracker_beat: f64, clock_weight: f64) {
        let w = clock_weight.clamp(0.0, 1.0);
        let corrected = (self.current_beat * w + tracker_beat * (1.0 - w)).max(0.0);
        self.current_beat = self.bound_by_hold(corrected);
    }

    /// Returns the clock and cursor to the top of the score.
    pub fn rewind(&mut self) {
        self.current_beat = 0.0;
        self.cursor = 0;
        self.hold_beat = None;
        self.lead_tempo = self.base_tempo;
        self.effective_tempo = self.base_tempo;
    }

    fn emit_window(&mut self, muted: &HashSet<usize>, sink: &mut dyn NoteSink) -> usize {
        let window_end = match self.hold_beat {
            Some(hold) => (self.current_beat + self.lookahead_beats).min(hold),
            None => self.current_beat + self.lookahead_beats,
        };
        let ms_per_beat = 60_000.0 / self.effective_tempo;
        let mut emitted = 0;

        while let Some(note) = self.notes.get(self.cursor) {
            if note.start_beat >= window_end {
                break;
            }
            self.cursor += 1;

            if note.start_beat < self.current_beat || muted.contains(&note.part_index) {
                continue;
            }

            let delay_ms = ((note.start_beat - self.current_beat) * ms_per_beat).max(0.0);
            sink.schedule(note, delay_ms);
            emitted += 1;
        }

        emitted
    }

    /// Never moves the clock forward past the hold, nor drags it back to it.
    #[inline]
    fn bound_by_hold(&self, beat: f64) -> f64 {
        match self.hold_beat {
            Some(hold) if beat > hold => hold.max(self.current_beat.min(beat)),
            _ => beat,
        }
    }

    #[inline]
    fn clamp_playback(&self, bpm: f64) -> f64 {
        bpm.clamp(
            self.base_tempo * MIN_PLAYBACK_RATIO,
            self.base_tempo * MAX_PLAYBACK_RATIO,
        )
    }
}
