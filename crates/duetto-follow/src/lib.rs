//! Score following for Duetto.
//!
//! [`PositionTracker`] is a discrete Bayesian filter over a handful of
//! (position, tempo) hypotheses. Each performer note-on is scored against
//! the expected solo line, every hypothesis is advanced by its own tempo, and
//! the most probable hypothesis becomes the estimate.
//!
//! # Example
//!
//! ```ignore
//! use duetto_core::{NoteEvent, RoleMode};
//! use duetto_follow::PositionTracker;
//! use duetto_input::PerformerEvent;
//!
//! let solo = vec![NoteEvent::new(66, 24.0, 1.0, 80, 0)];
//! let mut tracker = PositionTracker::new();
//! tracker.load(Some(solo.into()), 50.0);
//! tracker.start(0.0);
//!
//! let estimate = tracker.process_note(&PerformerEvent::note_on(66, 90, 0.0), RoleMode::Follow);
//! assert_eq!(estimate.map(|e| e.position), Some(0));
//! ```

pub(crate) mod hypothesis;
pub(crate) mod observation;
pub(crate) mod tracker;

pub use hypothesis::{Hypothesis, HYPOTHESIS_COUNT, MAX_TRACKED_RATIO, MIN_TRACKED_RATIO};
pub use observation::{pitch_likelihood, ObservationWindow, EXACT_MATCH, MISS, NEAR_MATCH};
pub use tracker::{PositionTracker, TrackerEstimate, TrackerStatus};
