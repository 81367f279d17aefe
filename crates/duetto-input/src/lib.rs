//! Input types consumed by the Duetto engine.
//!
//! Three external collaborators feed the engine:
//!
//! - **Performer input**: note-on/off events from a keyboard or pitch detector
//!   ([`PerformerEvent`], convertible from raw MIDI)
//! - **Motion cues**: breath, nod, sway and preparation gestures ([`MotionCue`])
//! - **Rehearsal commands**: role, wait and tempo changes issued during
//!   rehearsal ([`RehearsalCommand`])
//!
//! # Example
//!
//! ```ignore
//! use duetto_input::{PerformerEvent, RehearsalCommand};
//!
//! let event = PerformerEvent::from_bytes(&[0x90, 66, 100], 1250.0)?;
//! assert!(event.unwrap().is_note_on());
//!
//! let cmd = RehearsalCommand::from_json(r#"{"type":"set_tempo","tempo":-8}"#)?;
//! ```

pub mod error;
pub use error::{Error, Result};

pub(crate) mod command;
pub(crate) mod cue;
pub(crate) mod performer;

pub use command::{RehearsalCommand, TempoChange, RELATIVE_TEMPO_THRESHOLD};
pub use cue::{MotionCue, MotionKind, WAIT_TRIGGER_CONFIDENCE};
pub use performer::{PerformerEvent, PerformerEventKind};

// Re-export the upstream MIDI message type used by `PerformerEvent::from_midi`.
pub use midi_msg::{ChannelVoiceMsg, MidiMsg};
