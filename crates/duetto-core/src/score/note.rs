//! Parsed score input: notes, parts and the score container.

use serde::{Deserialize, Serialize};

use super::annotations::MeasureAnnotation;
use crate::{Error, Result};

/// A single note in the repeat-expanded beat timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub pitch: u8,
    pub start_beat: f64,
    pub duration_beats: f64,
    pub velocity: u8,
    pub part_index: usize,
}

impl NoteEvent {
    #[inline]
    pub fn new(pitch: u8, start_beat: f64, duration_beats: f64, velocity: u8, part_index: usize) -> Self {
        Self {
            pitch,
            start_beat,
            duration_beats,
            velocity,
            part_index,
        }
    }

    #[inline]
    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration_beats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
}

impl TimeSignature {
    pub const fn new(beats: u32, beat_type: u32) -> Self {
        Self { beats, beat_type }
    }

    /// Measure length in quarter-note beats.
    #[inline]
    pub fn beats_per_measure(&self) -> f64 {
        self.beats as f64 * 4.0 / self.beat_type as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.beats == 0 || self.beat_type == 0 {
            return Err(Error::InvalidTimeSignature {
                beats: self.beats,
                beat_type: self.beat_type,
            });
        }
        Ok(())
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePart {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_solo: bool,
    #[serde(default)]
    pub notes: Vec<NoteEvent>,
}

/// Fully parsed score as handed over by the score-parsing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScore {
    #[serde(default)]
    pub title: String,
    pub tempo: f64,
    #[serde(default)]
    pub time_signature: TimeSignature,
    #[serde(default)]
    pub parts: Vec<ScorePart>,
    #[serde(default)]
    pub measures: Vec<MeasureAnnotation>,
    #[serde(default)]
    pub total_measures: usize,
    #[serde(default)]
    pub total_beats: f64,
    #[serde(default)]
    pub playback_order: Vec<usize>,
    #[serde(default)]
    pub measure_numbers: Vec<i32>,
}

impl ParsedScore {
    /// Checks the values the engine divides by.
    pub fn validate(&self) -> Result<()> {
        if !(self.tempo.is_finite() && self.tempo > 0.0) {
            return Err(Error::InvalidTempo(self.tempo));
        }
        self.time_signature.validate()
    }

    /// Index of the first part flagged as solo.
    pub fn solo_part_index(&self) -> Option<usize> {
        self.parts.iter().position(|p| p.is_solo)
    }

    /// The performer's expected note sequence, ascending by start beat.
    pub fn solo_sequence(&self) -> Option<Vec<NoteEvent>> {
        let part = &self.parts[self.solo_part_index()?];
        let mut notes = part.notes.clone();
        sort_by_start(&mut notes);
        Some(notes)
    }

    /// Every non-solo note merged into one list, ascending by start beat.
    pub fn accompaniment_notes(&self) -> Vec<NoteEvent> {
        let mut notes: Vec<NoteEvent> = self
            .parts
            .iter()
            .filter(|p| !p.is_solo)
            .flat_map(|p| p.notes.iter().copied())
            .collect();
        sort_by_start(&mut notes);
        notes
    }
}

fn sort_by_start(notes: &mut [NoteEvent]) {
    // Stable: simultaneous notes keep part order.
    notes.sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat));
}
