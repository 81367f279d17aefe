//! Score model, role resolution and accompaniment scheduling.
//!
//! # Primary API
//!
//! - [`ParsedScore`]: score input from the parsing collaborator
//! - [`AnnotationMap`]: per-measure lead/follow and wait directives with forward-fill lookup
//! - [`PlaybackTimeline`]: repeat-expanded beat → measure mapping
//! - [`AccompanimentScheduler`]: virtual beat clock and lookahead note emission
//! - [`EngineFsm`]: idle / waiting / listening / playing transitions
//! - [`DeferredQueue`]: cancellable timers driven by the engine clock
//!
//! # Example
//!
//! ```ignore
//! use duetto_core::{AnnotationMap, MeasureAnnotation, RoleDirective, RoleMode, RoleStrength};
//!
//! let map = AnnotationMap::from_annotations(&[
//!     MeasureAnnotation::role(1, RoleDirective::preset(RoleMode::Follow, RoleStrength::Moderate)),
//!     MeasureAnnotation::role(9, RoleDirective::preset(RoleMode::Lead, RoleStrength::Strong)),
//! ]);
//!
//! assert_eq!(map.resolve_role(12).mode, RoleMode::Lead);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{EngineConfig, PlaybackMode};

pub mod score;
pub use score::{
    AnnotationMap, MeasureAnnotation, NoteEvent, ParsedScore, PlaybackTimeline, RoleDirective, RoleMode,
    RoleStrength, ScorePart, TimeSignature, WaitDirective, WaitKind,
};

pub(crate) mod transport;
pub use transport::{
    blend_tempo, AccompanimentScheduler, DeferredQueue, EngineEvent, EngineFsm, EngineState, NoteSink,
    TickOutcome, TimerToken, Transition, MAX_PLAYBACK_RATIO, MIN_PLAYBACK_RATIO,
};
