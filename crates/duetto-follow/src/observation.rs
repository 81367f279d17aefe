//! Pitch-match likelihoods around the current score position.

use duetto_core::NoteEvent;

pub const EXACT_MATCH: f64 = 0.8;
pub const NEAR_MATCH: f64 = 0.15;
/// Likelihood of any position the window does not cover, or a wrong pitch.
pub const MISS: f64 = 0.05;

/// Semitone distance still counted as a near match.
const NEAR_SEMITONES: u8 = 2;

const WINDOW_BEHIND: usize = 2;
const WINDOW_AHEAD: usize = 10;
const WINDOW_LEN: usize = WINDOW_BEHIND + WINDOW_AHEAD;

#[inline]
pub fn pitch_likelihood(expected: u8, played: u8) -> f64 {
    match expected.abs_diff(played) {
        0 => EXACT_MATCH,
        d if d <= NEAR_SEMITONES => NEAR_MATCH,
        _ => MISS,
    }
}

/// Likelihoods for sequence indices `[center-2, center+10)`, clipped to the
/// sequence. Fixed-size so scoring a note never allocates.
#[derive(Debug, Clone, Copy)]
pub struct ObservationWindow {
    first: usize,
    len: usize,
    likelihoods: [f64; WINDOW_LEN],
}

impl ObservationWindow {
    pub fn score(sequence: &[NoteEvent], center: usize, pitch: u8) -> Self {
        let first = center.saturating_sub(WINDOW_BEHIND);
        let end = (center + WINDOW_AHEAD).min(sequence.len());
        let mut likelihoods = [MISS; WINDOW_LEN];
        let mut len = 0;

        if first < end {
            for (slot, note) in likelihoods.iter_mut().zip(&sequence[first..end]) {
                *slot = pitch_likelihood(note.pitch, pitch);
                len += 1;
            }
        }

        Self {
            first,
            len,
            likelihoods,
        }
    }

    /// Likelihood at a sequence index; [`MISS`] outside the window.
    #[inline]
    pub fn likelihood(&self, index: usize) -> f64 {
        index
            .checked_sub(self.first)
            .filter(|&offset| offset < self.len)
            .map_or(MISS, |offset| self.likelihoods[offset])
    }

    /// Sequence indices covered by the window.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.first..self.first + self.len
    }
}
