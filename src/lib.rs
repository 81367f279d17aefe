//! # Duetto - Interactive Accompaniment Engine
//!
//! Listens to a live performer and plays a synchronized accompaniment that
//! either drives the tempo ("lead") or adapts to the performer ("follow"),
//! switching roles per measure as the score annotations direct.
//!
//! ## Architecture
//!
//! Duetto is an umbrella crate that coordinates:
//! - **duetto-core** - Score model, role resolution, accompaniment scheduler, state machine
//! - **duetto-follow** - Bayesian position and tempo tracker
//! - **duetto-input** - Performer notes (incl. raw MIDI), motion cues, rehearsal commands
//!
//! ## Quick Start
//!
//! ```ignore
//! use duetto::prelude::*;
//!
//! let mut engine = Engine::builder()
//!     .note_sink(|note: &NoteEvent, delay_ms: f64| {
//!         // hand the note to a synth `delay_ms` from now
//!     })
//!     .build()?;
//!
//! engine.load_score(&score)?;
//! engine.start();
//!
//! // Drive the clock and feed the performer in.
//! engine.poll(now_ms);
//! engine.process_note(&PerformerEvent::note_on(66, 90, now_ms));
//! ```
//!
//! Use [`EngineRunner`] (or [`EngineBuilder::spawn`]) to run the engine on
//! its own thread against the wall clock.

/// Re-export of duetto-core for direct access
pub use duetto_core as core;
pub use duetto_follow as follow;
pub use duetto_input as input;

pub use duetto_core::{
    AnnotationMap, EngineConfig, EngineState, MeasureAnnotation, NoteEvent, NoteSink, ParsedScore, PlaybackMode,
    RoleDirective, RoleMode, RoleStrength, ScorePart, TimeSignature, WaitDirective, WaitKind,
};
pub use duetto_follow::{PositionTracker, TrackerEstimate};
pub use duetto_input::{MotionCue, MotionKind, PerformerEvent, RehearsalCommand};

mod builder;
mod engine;
mod error;
mod runner;

pub use builder::EngineBuilder;
pub use engine::{Engine, EngineSnapshot};
pub use error::{Error, Result};
pub use runner::{EngineCommand, EngineRunner};

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{Engine, EngineBuilder, EngineRunner, EngineSnapshot};

    // Score
    pub use crate::core::{
        EngineState, MeasureAnnotation, NoteEvent, ParsedScore, PlaybackMode, RoleDirective, RoleMode,
        RoleStrength, ScorePart, TimeSignature, WaitDirective,
    };

    // Inputs
    pub use crate::input::{MotionCue, MotionKind, PerformerEvent, RehearsalCommand};
}
