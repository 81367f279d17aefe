//! Error types for input decoding.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("Malformed command: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<midi_msg::ParseError> for Error {
    fn from(e: midi_msg::ParseError) -> Self {
        Error::MidiParse(format!("{e:?}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
