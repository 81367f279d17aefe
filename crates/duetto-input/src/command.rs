//! Rehearsal commands.
//!
//! Commands arrive as JSON (`{"type": "set_role", "measureNumber": 9, "role": {...}}`)
//! and are decoded here so that malformed input is rejected before it reaches
//! the engine.

use duetto_core::{MeasureAnnotation, RoleDirective, WaitDirective};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Tempo values with magnitude at or below this are read as relative changes
/// when the command does not say otherwise.
pub const RELATIVE_TEMPO_THRESHOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RehearsalCommand {
    SetRole {
        #[serde(rename = "measureNumber")]
        measure_number: i32,
        role: RoleDirective,
    },
    SetWait {
        #[serde(rename = "measureNumber")]
        measure_number: i32,
        wait: WaitDirective,
    },
    SetTempo {
        tempo: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative: Option<bool>,
    },
    /// Restore the annotations and tempo of the loaded score.
    Reset,
}

impl RehearsalCommand {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Annotation patch carried by role and wait commands.
    pub fn annotation_patch(&self) -> Option<MeasureAnnotation> {
        match *self {
            RehearsalCommand::SetRole { measure_number, role } => Some(MeasureAnnotation::role(measure_number, role)),
            RehearsalCommand::SetWait { measure_number, wait } => Some(MeasureAnnotation::wait(measure_number, wait)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TempoChange {
    /// Replace the base tempo.
    Absolute(f64),
    /// Add to the base tempo.
    Relative(f64),
}

impl TempoChange {
    /// An explicit `relative` flag wins; otherwise small magnitudes are deltas.
    pub fn resolve(tempo: f64, relative: Option<bool>) -> Self {
        let relative = relative.unwrap_or(tempo.abs() <= RELATIVE_TEMPO_THRESHOLD);
        if relative {
            TempoChange::Relative(tempo)
        } else {
            TempoChange::Absolute(tempo)
        }
    }

    pub fn apply(self, base_tempo: f64) -> f64 {
        match self {
            TempoChange::Absolute(bpm) => bpm,
            TempoChange::Relative(delta) => base_tempo + delta,
        }
    }
}
