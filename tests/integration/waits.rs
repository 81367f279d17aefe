//! Wait directives: gating, timers, note and gesture triggers.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use approx::assert_relative_eq;
use duetto::prelude::*;

fn timed_wait_score(seconds: f64) -> ParsedScore {
    with_annotations(
        two_part_score(100.0, 4),
        vec![MeasureAnnotation::wait(1, WaitDirective::timed(seconds))],
    )
}

#[test]
fn test_wait_on_first_measure_gates_start() {
    let mut engine = test_engine();
    let rx = engine.subscribe();

    engine.load_score(&timed_wait_score(2.0)).unwrap();
    assert_eq!(engine.state(), EngineState::Waiting);

    engine.start();
    engine.advance_by(1999.0);
    assert_eq!(engine.state(), EngineState::Waiting);

    engine.advance_by(1.0);
    assert_eq!(engine.state(), EngineState::Listening);

    engine.advance_by(399.0);
    assert_eq!(engine.state(), EngineState::Listening);
    engine.advance_by(1.0);
    assert_eq!(engine.state(), EngineState::Playing);

    assert_eq!(
        drain_states(&rx),
        vec![
            EngineState::Waiting,
            EngineState::Waiting,
            EngineState::Listening,
            EngineState::Playing
        ]
    );
}

#[test]
fn test_loaded_wait_is_not_armed_until_start() {
    let mut engine = test_engine();
    engine.load_score(&timed_wait_score(1.0)).unwrap();

    engine.advance_by(10_000.0);
    assert_eq!(engine.state(), EngineState::Waiting);
}

#[test]
fn test_note_on_releases_untimed_wait() {
    let mut engine = test_engine();
    let score = with_annotations(
        two_part_score(100.0, 4),
        vec![MeasureAnnotation::wait(1, WaitDirective::untimed())],
    );
    engine.load_score(&score).unwrap();
    engine.start();

    engine.advance_by(60_000.0);
    assert_eq!(engine.state(), EngineState::Waiting);

    // Note-offs never count as an entry.
    engine.process_note(&PerformerEvent::note_off(72, engine.now_ms()));
    assert_eq!(engine.state(), EngineState::Waiting);

    engine.process_note(&PerformerEvent::note_on(72, 90, engine.now_ms()));
    assert_eq!(engine.state(), EngineState::Listening);

    engine.advance_by(400.0);
    assert_eq!(engine.state(), EngineState::Playing);
}

#[test]
fn test_note_on_cancels_pending_wait_timer() {
    let mut engine = test_engine();
    engine.load_score(&timed_wait_score(2.0)).unwrap();
    engine.start();

    engine.advance_by(500.0);
    engine.process_note(&PerformerEvent::note_on(72, 90, 500.0));
    assert_eq!(engine.state(), EngineState::Listening);

    // The old 2 s timer must not fire into the new state.
    engine.advance_by(400.0);
    assert_eq!(engine.state(), EngineState::Playing);
    engine.advance_by(1200.0);
    assert_eq!(engine.state(), EngineState::Playing);
}

#[test]
fn test_motion_cues_release_listen_wait() {
    let mut engine = test_engine();
    let score = with_annotations(
        two_part_score(100.0, 4),
        vec![MeasureAnnotation::wait(1, WaitDirective::listen())],
    );
    engine.load_score(&score).unwrap();
    engine.start();

    engine.process_motion(&MotionCue::new(MotionKind::Sway, 0.0, 0.95));
    assert_eq!(engine.state(), EngineState::Waiting);

    engine.process_motion(&MotionCue::new(MotionKind::Nod, 0.0, 0.5));
    assert_eq!(engine.state(), EngineState::Waiting);

    engine.process_motion(&MotionCue::new(MotionKind::Preparation, 0.0, 0.9));
    assert_eq!(engine.state(), EngineState::Listening);
}

#[test]
fn test_breath_releases_wait_only_above_threshold() {
    let mut engine = test_engine();
    let score = with_annotations(
        two_part_score(100.0, 4),
        vec![MeasureAnnotation::wait(1, WaitDirective::listen())],
    );
    engine.load_score(&score).unwrap();
    engine.start();

    engine.process_motion(&MotionCue::new(MotionKind::Breath, 0.0, 0.6));
    assert_eq!(engine.state(), EngineState::Waiting);

    engine.process_motion(&MotionCue::new(MotionKind::Breath, 0.0, 0.61));
    assert_eq!(engine.state(), EngineState::Listening);
}

#[test]
fn test_stop_during_listening_cancels_hand_off() {
    let mut engine = test_engine();
    engine.load_score(&timed_wait_score(0.0)).unwrap();
    engine.start();
    engine.advance_by(0.0);
    assert_eq!(engine.state(), EngineState::Listening);

    engine.stop();
    engine.advance_by(1000.0);
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn test_wait_mid_score_and_on_repeat() {
    // Two printed measures played twice: 1 2 1 2.
    let mut score = with_annotations(
        two_part_score(120.0, 2),
        vec![MeasureAnnotation::wait(2, WaitDirective::untimed())],
    );
    score.playback_order = vec![0, 1, 0, 1];
    let solo = beats(72, 0, 16, 0);
    let piano = beats(48, 0, 16, PIANO);
    score.parts = vec![part("solo", true, solo), part("piano", false, piano)];

    let mut engine = test_engine();
    engine.load_score(&score).unwrap();
    engine.start();
    assert_eq!(engine.state(), EngineState::Playing);

    // 120 BPM: measure 2 starts at beat 4 = 2000 ms.
    engine.advance_by(2100.0);
    assert_eq!(engine.state(), EngineState::Waiting);
    assert_eq!(engine.current_measure(), 2);

    engine.process_note(&PerformerEvent::note_on(72, 90, engine.now_ms()));
    engine.advance_by(400.0);
    assert_eq!(engine.state(), EngineState::Playing);

    // Still inside the same slot: the wait does not fire again.
    engine.advance_by(500.0);
    assert_eq!(engine.state(), EngineState::Playing);

    // Second pass through measure 2 at beat 12.
    engine.advance_by(4200.0);
    assert_eq!(engine.state(), EngineState::Waiting);
    assert_eq!(engine.current_measure(), 2);
    assert!(engine.current_beat() >= 12.0);
}

#[test]
fn test_start_is_ignored_while_listening_or_playing() {
    let mut engine = test_engine();
    let rx = engine.subscribe();
    engine.load_score(&two_part_score(100.0, 4)).unwrap();

    engine.start();
    assert_eq!(engine.state(), EngineState::Playing);
    engine.start();
    assert_eq!(engine.state(), EngineState::Playing);

    // load (idle, no transition) + play
    assert_eq!(drain_states(&rx), vec![EngineState::Idle, EngineState::Playing]);
}

/// Accompaniment already sent at or past `beat`.
fn scheduled_from(recorder: &Recorder, beat: f64) -> Vec<(NoteEvent, f64)> {
    recorder
        .notes()
        .into_iter()
        .filter(|(note, _)| note.start_beat >= beat)
        .collect()
}

fn waited_measure_engine(mode: PlaybackMode, wait: WaitDirective) -> (Engine, Recorder) {
    let (mut engine, recorder) = recording_engine_with(Engine::builder().mode(mode));
    let score = with_annotations(two_part_score(120.0, 4), vec![MeasureAnnotation::wait(2, wait)]);
    engine.load_score(&score).unwrap();
    engine.start();
    (engine, recorder)
}

#[test]
fn test_untimed_wait_holds_back_waited_measure() {
    for mode in [PlaybackMode::Adaptive, PlaybackMode::Fixed] {
        let (mut engine, recorder) = waited_measure_engine(mode, WaitDirective::untimed());

        // 120 BPM: measure 2 starts at beat 4 = 2000 ms.
        engine.advance_by(2100.0);
        assert_eq!(engine.state(), EngineState::Waiting, "{mode:?}");
        assert_relative_eq!(engine.current_beat(), 4.0, epsilon = BEAT_EPSILON);
        assert!(scheduled_from(&recorder, 4.0).is_empty(), "{mode:?}");
        assert!(!recorder.notes().is_empty());

        engine.advance_by(10_000.0);
        assert!(scheduled_from(&recorder, 4.0).is_empty(), "{mode:?}");

        engine.process_note(&PerformerEvent::note_on(72, 90, engine.now_ms()));
        engine.advance_by(400.0);
        assert_eq!(engine.state(), EngineState::Playing);
        engine.advance_by(100.0);

        // The downbeat of the waited measure sounds on the release, not before.
        let released = scheduled_from(&recorder, 4.0);
        assert!(!released.is_empty(), "{mode:?}");
        assert_eq!(released[0].0.start_beat, 4.0);
        assert_eq!(released[0].1, 0.0);
    }
}

#[test]
fn test_timed_wait_holds_back_waited_measure() {
    for mode in [PlaybackMode::Adaptive, PlaybackMode::Fixed] {
        let (mut engine, recorder) = waited_measure_engine(mode, WaitDirective::timed(1.0));

        engine.advance_by(2100.0);
        assert_eq!(engine.state(), EngineState::Waiting, "{mode:?}");
        assert!(scheduled_from(&recorder, 4.0).is_empty(), "{mode:?}");

        engine.advance_by(1000.0);
        assert_eq!(engine.state(), EngineState::Listening, "{mode:?}");
        assert!(scheduled_from(&recorder, 4.0).is_empty(), "{mode:?}");

        engine.advance_by(500.0);
        assert_eq!(engine.state(), EngineState::Playing, "{mode:?}");
        let released = scheduled_from(&recorder, 4.0);
        assert!(!released.is_empty(), "{mode:?}");
        assert_eq!(released[0].0.start_beat, 4.0);
        assert_eq!(released[0].1, 0.0);
    }
}

#[test]
fn test_forward_pull_stops_at_waited_measure() {
    // 60 BPM with solo notes on beats 0 and 9 only.
    let solo = vec![NoteEvent::new(72, 0.0, 1.0, 80, 0), NoteEvent::new(76, 9.0, 1.0, 80, 0)];
    let mut score = score(
        60.0,
        TimeSignature::new(4, 4),
        4,
        vec![part("solo", true, solo), part("piano", false, beats(48, 0, 16, PIANO))],
    );
    score.measures = vec![
        MeasureAnnotation::role(1, RoleDirective::preset(RoleMode::Follow, RoleStrength::Strong)),
        MeasureAnnotation::wait(2, WaitDirective::untimed()),
    ];

    let (mut engine, recorder) = recording_engine();
    engine.load_score(&score).unwrap();
    engine.start();
    engine.process_note(&PerformerEvent::note_on(72, 90, 0.0));
    engine.advance_by(3500.0);
    assert_eq!(engine.state(), EngineState::Playing);

    // The performer jumps to beat 9; the clock is pulled forward but not
    // across the wait on measure 2.
    let estimate = engine.process_note(&PerformerEvent::note_on(76, 90, 3500.0)).unwrap();
    assert_eq!(estimate.beat, 9.0);
    assert!(estimate.confidence > engine.config().confidence_threshold);

    assert_eq!(engine.state(), EngineState::Waiting);
    assert_eq!(engine.current_measure(), 2);
    assert_relative_eq!(engine.current_beat(), 4.0, epsilon = BEAT_EPSILON);
    assert!(scheduled_from(&recorder, 4.0).is_empty());
}
