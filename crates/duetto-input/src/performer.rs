//! Performer note events.

use midi_msg::{ChannelVoiceMsg, MidiMsg};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformerEventKind {
    NoteOn,
    NoteOff,
}

/// A note played (or released) by the live performer.
///
/// Wire form: `{"type": "noteon" | "noteoff", "note", "velocity", "timestamp"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformerEvent {
    #[serde(rename = "type")]
    pub kind: PerformerEventKind,
    pub note: u8,
    #[serde(default)]
    pub velocity: u8,
    /// Milliseconds on the caller's monotonic clock.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: f64,
}

impl PerformerEvent {
    pub fn note_on(note: u8, velocity: u8, timestamp_ms: f64) -> Self {
        Self {
            kind: PerformerEventKind::NoteOn,
            note,
            velocity,
            timestamp_ms,
        }
    }

    pub fn note_off(note: u8, timestamp_ms: f64) -> Self {
        Self {
            kind: PerformerEventKind::NoteOff,
            note,
            velocity: 0,
            timestamp_ms,
        }
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.kind == PerformerEventKind::NoteOn
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        self.kind == PerformerEventKind::NoteOff
    }

    /// Converts a parsed MIDI message. Anything but a note message yields `None`.
    ///
    /// A note-on with zero velocity is treated as a note-off.
    pub fn from_midi(msg: &MidiMsg, timestamp_ms: f64) -> Option<Self> {
        let MidiMsg::ChannelVoice { msg, .. } = msg else {
            return None;
        };
        match *msg {
            ChannelVoiceMsg::NoteOn { note, velocity } if velocity > 0 => {
                Some(Self::note_on(note, velocity, timestamp_ms))
            }
            ChannelVoiceMsg::NoteOn { note, .. } | ChannelVoiceMsg::NoteOff { note, .. } => {
                Some(Self::note_off(note, timestamp_ms))
            }
            ChannelVoiceMsg::HighResNoteOn { note, velocity } if velocity > 0 => {
                // 14-bit velocity down to 7 bits, keeping any non-zero value audible
                Some(Self::note_on(note, ((velocity >> 7) as u8).max(1), timestamp_ms))
            }
            ChannelVoiceMsg::HighResNoteOn { note, .. } | ChannelVoiceMsg::HighResNoteOff { note, .. } => {
                Some(Self::note_off(note, timestamp_ms))
            }
            _ => None,
        }
    }

    /// Parses raw MIDI bytes. Non-note messages yield `Ok(None)`.
    pub fn from_bytes(bytes: &[u8], timestamp_ms: f64) -> Result<Option<Self>> {
        let (msg, _len) = MidiMsg::from_midi(bytes)?;
        Ok(Self::from_midi(&msg, timestamp_ms))
    }
}
