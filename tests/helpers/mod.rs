//! Test helpers and fixtures for Duetto integration tests
//!
//! Scores are built in code so each test states exactly the measures, parts
//! and annotations it depends on. Engines run on the manual clock
//! ([`Engine::advance_by`]) so timing is deterministic.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `BEAT_EPSILON` (1e-9): accumulated tick arithmetic
//! - `TEMPO_EPSILON` (1e-6): blended and clamped tempi
//! - `PROBABILITY_EPSILON` (1e-9): normalized hypothesis probabilities

#![allow(dead_code)]

pub mod tolerances;

use std::sync::{Arc, Mutex};

use duetto::prelude::*;

/// Accompaniment part index used by [`two_part_score`].
pub const PIANO: usize = 1;
/// Second accompaniment part index used by [`three_part_score`].
pub const BASS: usize = 2;

/// Route engine logs to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Notes scheduled by the engine, shared with the test body.
#[derive(Clone, Default)]
pub struct Recorder {
    notes: Arc<Mutex<Vec<(NoteEvent, f64)>>>,
}

impl Recorder {
    pub fn sink(&self) -> impl FnMut(&NoteEvent, f64) + Send + 'static {
        let notes = Arc::clone(&self.notes);
        move |note: &NoteEvent, delay_ms: f64| {
            notes.lock().unwrap().push((*note, delay_ms));
        }
    }

    pub fn notes(&self) -> Vec<(NoteEvent, f64)> {
        self.notes.lock().unwrap().clone()
    }

    pub fn parts(&self) -> Vec<usize> {
        self.notes().iter().map(|(n, _)| n.part_index).collect()
    }

    pub fn len(&self) -> usize {
        self.notes.lock().unwrap().len()
    }
}

pub fn test_engine() -> Engine {
    init_tracing();
    Engine::builder().build().expect("Failed to create test engine")
}

pub fn recording_engine() -> (Engine, Recorder) {
    recording_engine_with(Engine::builder())
}

pub fn recording_engine_with(builder: EngineBuilder) -> (Engine, Recorder) {
    init_tracing();
    let recorder = Recorder::default();
    let engine = builder
        .note_sink(recorder.sink())
        .build()
        .expect("Failed to create test engine");
    (engine, recorder)
}

/// One note per beat from `first` up to (not including) `end`.
pub fn beats(pitch: u8, first: usize, end: usize, part_index: usize) -> Vec<NoteEvent> {
    (first..end)
        .map(|b| NoteEvent::new(pitch, b as f64, 1.0, 80, part_index))
        .collect()
}

pub fn part(id: &str, is_solo: bool, notes: Vec<NoteEvent>) -> ScorePart {
    ScorePart {
        id: id.into(),
        name: id.into(),
        is_solo,
        notes,
    }
}

/// Score with measures numbered from 1 in printed order.
pub fn score(tempo: f64, time_signature: TimeSignature, measures: usize, parts: Vec<ScorePart>) -> ParsedScore {
    ParsedScore {
        title: "test".into(),
        tempo,
        time_signature,
        parts,
        measures: vec![],
        total_measures: measures,
        total_beats: measures as f64 * time_signature.beats_per_measure(),
        playback_order: vec![],
        measure_numbers: (1..=measures as i32).collect(),
    }
}

/// 4/4 at `tempo`: a solo line plus a piano part, one note per beat.
pub fn two_part_score(tempo: f64, measures: usize) -> ParsedScore {
    let total = measures * 4;
    score(
        tempo,
        TimeSignature::new(4, 4),
        measures,
        vec![
            part("solo", true, beats(72, 0, total, 0)),
            part("piano", false, beats(48, 0, total, PIANO)),
        ],
    )
}

pub fn three_part_score(tempo: f64, measures: usize) -> ParsedScore {
    let mut score = two_part_score(tempo, measures);
    score.parts.push(part("bass", false, beats(36, 0, measures * 4, BASS)));
    score
}

pub fn with_annotations(mut score: ParsedScore, annotations: Vec<MeasureAnnotation>) -> ParsedScore {
    score.measures = annotations;
    score
}

/// Every state published so far, in order.
pub fn drain_states(rx: &crossbeam_channel::Receiver<EngineSnapshot>) -> Vec<EngineState> {
    rx.try_iter().map(|s| s.engine_state).collect()
}
