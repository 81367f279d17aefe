pub(crate) mod annotations;
pub(crate) mod note;
pub(crate) mod timeline;

pub use annotations::{
    AnnotationMap, MeasureAnnotation, RoleDirective, RoleMode, RoleStrength, WaitDirective, WaitKind,
};
pub use note::{NoteEvent, ParsedScore, ScorePart, TimeSignature};
pub use timeline::PlaybackTimeline;
