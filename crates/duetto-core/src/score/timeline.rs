//! Repeat-expanded beat timeline.
//!
//! Beat `b` lies in playback index `floor(b / beats_per_measure)`; the index
//! selects a slot through the playback order, and the slot maps to the
//! physical measure number printed in the score. Repeats are therefore a flat,
//! monotonic beat axis.

use super::note::ParsedScore;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackTimeline {
    playback_order: Vec<usize>,
    measure_numbers: Vec<i32>,
    beats_per_measure: f64,
}

impl PlaybackTimeline {
    pub fn new(playback_order: Vec<usize>, measure_numbers: Vec<i32>, beats_per_measure: f64) -> Result<Self> {
        if playback_order.is_empty() {
            return Err(Error::EmptyPlaybackOrder);
        }
        if !(beats_per_measure.is_finite() && beats_per_measure > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "beats_per_measure {beats_per_measure} must be positive"
            )));
        }
        Ok(Self {
            playback_order,
            measure_numbers,
            beats_per_measure,
        })
    }

    /// Builds the timeline, filling in an identity order when the score has none.
    pub fn from_score(score: &ParsedScore) -> Result<Self> {
        score.time_signature.validate()?;
        let beats_per_measure = score.time_signature.beats_per_measure();

        let playback_order = if !score.playback_order.is_empty() {
            score.playback_order.clone()
        } else {
            let measures = if score.total_measures > 0 {
                score.total_measures
            } else {
                (score.total_beats / beats_per_measure).ceil().max(0.0) as usize
            };
            (0..measures).collect()
        };

        Self::new(playback_order, score.measure_numbers.clone(), beats_per_measure)
    }

    #[inline]
    pub fn beats_per_measure(&self) -> f64 {
        self.beats_per_measure
    }

    /// Number of measures played, repeats included.
    #[inline]
    pub fn len(&self) -> usize {
        self.playback_order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.playback_order.is_empty()
    }

    /// Total length of the expanded timeline in beats.
    #[inline]
    pub fn total_beats(&self) -> f64 {
        self.len() as f64 * self.beats_per_measure
    }

    #[inline]
    pub fn playback_index(&self, beat: f64) -> usize {
        if beat <= 0.0 {
            0
        } else {
            (beat / self.beats_per_measure).floor() as usize
        }
    }

    #[inline]
    pub fn is_past_end(&self, beat: f64) -> bool {
        self.playback_index(beat) >= self.len()
    }

    /// Physical measure number for a playback index.
    pub fn measure_at_index(&self, index: usize) -> Option<i32> {
        let slot = *self.playback_order.get(index)?;
        Some(self.slot_measure(slot))
    }

    /// Physical measure number at a beat, `None` past the end.
    pub fn measure_at(&self, beat: f64) -> Option<i32> {
        self.measure_at_index(self.playback_index(beat))
    }

    /// Measure number of the first playback slot.
    pub fn first_measure(&self) -> i32 {
        self.measure_at_index(0).unwrap_or(1)
    }

    /// Beat at which a playback index starts.
    #[inline]
    pub fn index_start_beat(&self, index: usize) -> f64 {
        index as f64 * self.beats_per_measure
    }

    fn slot_measure(&self, slot: usize) -> i32 {
        self.measure_numbers
            .get(slot)
            .copied()
            .unwrap_or(slot as i32 + 1)
    }
}
