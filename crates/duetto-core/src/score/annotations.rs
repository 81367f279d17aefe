//! Per-measure role and wait annotations, and the role resolver.
//!
//! Annotations are sparse: a measure without an entry inherits the role of the
//! closest annotated measure before it. [`AnnotationMap`] keeps entries ordered
//! by measure number so that lookup is a single reverse range scan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleMode {
    /// The accompaniment drives the tempo.
    Lead,
    /// The accompaniment adapts to the performer.
    Follow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleStrength {
    Strong,
    Moderate,
    Light,
}

/// Lead/follow directive for a measure.
///
/// `factor` is the weight given to the lead (base) tempo when blending with
/// the tracked performer tempo: `1.0` ignores the performer, `0.0` follows
/// them completely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RoleDirectiveRepr")]
pub struct RoleDirective {
    pub mode: RoleMode,
    pub strength: RoleStrength,
    pub factor: f64,
}

impl RoleDirective {
    pub fn new(mode: RoleMode, strength: RoleStrength, factor: f64) -> Self {
        Self {
            mode,
            strength,
            factor: clamp_unit(factor),
        }
    }

    /// Directive with the conventional factor for a mode and strength.
    pub fn preset(mode: RoleMode, strength: RoleStrength) -> Self {
        Self::new(mode, strength, default_factor(mode, strength))
    }

    #[inline]
    pub fn is_lead(&self) -> bool {
        self.mode == RoleMode::Lead
    }
}

impl Default for RoleDirective {
    fn default() -> Self {
        Self::preset(RoleMode::Follow, RoleStrength::Moderate)
    }
}

impl std::fmt::Display for RoleDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.mode {
            RoleMode::Lead => "lead",
            RoleMode::Follow => "follow",
        };
        let strength = match self.strength {
            RoleStrength::Strong => "strong",
            RoleStrength::Moderate => "moderate",
            RoleStrength::Light => "light",
        };
        write!(f, "{mode}:{strength} ({:.2})", self.factor)
    }
}

fn default_factor(mode: RoleMode, strength: RoleStrength) -> f64 {
    match (mode, strength) {
        (RoleMode::Lead, RoleStrength::Strong) => 0.9,
        (RoleMode::Lead, RoleStrength::Moderate) => 0.7,
        (RoleMode::Lead, RoleStrength::Light) => 0.55,
        (RoleMode::Follow, RoleStrength::Light) => 0.45,
        (RoleMode::Follow, RoleStrength::Moderate) => 0.3,
        (RoleMode::Follow, RoleStrength::Strong) => 0.1,
    }
}

#[inline]
fn clamp_unit(factor: f64) -> f64 {
    if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

/// Wire form; a missing factor falls back to the preset.
#[derive(Deserialize)]
struct RoleDirectiveRepr {
    mode: RoleMode,
    #[serde(default = "moderate")]
    strength: RoleStrength,
    #[serde(default)]
    factor: Option<f64>,
}

fn moderate() -> RoleStrength {
    RoleStrength::Moderate
}

impl From<RoleDirectiveRepr> for RoleDirective {
    fn from(repr: RoleDirectiveRepr) -> Self {
        match repr.factor {
            Some(factor) => RoleDirective::new(repr.mode, repr.strength, factor),
            None => RoleDirective::preset(repr.mode, repr.strength),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitKind {
    Wait,
    Listen,
}

/// Pause playback at a measure until a timer or a cue resumes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaitDirective {
    #[serde(rename = "type")]
    pub kind: WaitKind,
    /// Seconds before resuming on its own (`wait` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl WaitDirective {
    pub fn timed(seconds: f64) -> Self {
        Self {
            kind: WaitKind::Wait,
            duration: Some(seconds),
        }
    }

    pub fn untimed() -> Self {
        Self {
            kind: WaitKind::Wait,
            duration: None,
        }
    }

    pub fn listen() -> Self {
        Self {
            kind: WaitKind::Listen,
            duration: None,
        }
    }

    /// Auto-resume delay, if this directive resumes on its own.
    pub fn timeout_ms(&self) -> Option<f64> {
        match (self.kind, self.duration) {
            (WaitKind::Wait, Some(secs)) if secs.is_finite() && secs >= 0.0 => Some(secs * 1000.0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureAnnotation {
    /// May be zero or negative for pickup measures.
    pub measure_number: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleDirective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitDirective>,
}

impl MeasureAnnotation {
    pub fn role(measure_number: i32, role: RoleDirective) -> Self {
        Self {
            measure_number,
            role: Some(role),
            wait: None,
        }
    }

    pub fn wait(measure_number: i32, wait: WaitDirective) -> Self {
        Self {
            measure_number,
            role: None,
            wait: Some(wait),
        }
    }

    fn merge(&mut self, patch: &MeasureAnnotation) {
        if patch.role.is_some() {
            self.role = patch.role;
        }
        if patch.wait.is_some() {
            self.wait = patch.wait;
        }
    }
}

/// Ordered annotation store with forward-fill role lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationMap {
    entries: BTreeMap<i32, MeasureAnnotation>,
}

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from an unordered list; later duplicates patch earlier ones.
    pub fn from_annotations<'a>(annotations: impl IntoIterator<Item = &'a MeasureAnnotation>) -> Self {
        let mut map = Self::new();
        for annotation in annotations {
            map.apply(*annotation);
        }
        map
    }

    /// Merges a patch into the entry for its measure, creating it if needed.
    pub fn apply(&mut self, patch: MeasureAnnotation) {
        self.entries
            .entry(patch.measure_number)
            .and_modify(|existing| existing.merge(&patch))
            .or_insert(patch);
    }

    /// Drops every rehearsal patch, restoring `original`.
    pub fn reset_to(&mut self, original: &AnnotationMap) {
        self.entries.clone_from(&original.entries);
    }

    /// Role in effect at `measure`: the last role annotated at or before it.
    pub fn resolve_role(&self, measure: i32) -> RoleDirective {
        self.entries
            .range(..=measure)
            .rev()
            .find_map(|(_, annotation)| annotation.role)
            .unwrap_or_default()
    }

    /// Wait directive attached to exactly this measure.
    pub fn wait_at(&self, measure: i32) -> Option<WaitDirective> {
        self.entries.get(&measure).and_then(|a| a.wait)
    }

    pub fn get(&self, measure: i32) -> Option<&MeasureAnnotation> {
        self.entries.get(&measure)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeasureAnnotation> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
