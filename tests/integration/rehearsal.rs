//! Rehearsal commands: live role, wait and tempo edits.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use approx::assert_relative_eq;
use duetto::prelude::*;

fn base_tempo(engine: &Engine) -> f64 {
    engine.scheduler().unwrap().base_tempo()
}

#[test]
fn test_tempo_commands() {
    let mut engine = test_engine();
    engine.load_score(&two_part_score(100.0, 4)).unwrap();

    engine.apply_command(&RehearsalCommand::from_json(r#"{"type":"set_tempo","tempo":-8}"#).unwrap());
    assert_relative_eq!(base_tempo(&engine), 92.0, epsilon = TEMPO_EPSILON);

    engine.apply_command(&RehearsalCommand::SetTempo {
        tempo: 84.0,
        relative: None,
    });
    assert_relative_eq!(base_tempo(&engine), 84.0, epsilon = TEMPO_EPSILON);

    // Slow absolute tempo, disambiguated by the flag.
    engine.apply_command(&RehearsalCommand::SetTempo {
        tempo: 24.0,
        relative: Some(false),
    });
    assert_relative_eq!(base_tempo(&engine), 24.0, epsilon = TEMPO_EPSILON);

    // A delta that would go below zero is dropped.
    engine.apply_command(&RehearsalCommand::SetTempo {
        tempo: -30.0,
        relative: None,
    });
    assert_relative_eq!(base_tempo(&engine), 24.0, epsilon = TEMPO_EPSILON);

    engine.apply_command(&RehearsalCommand::Reset);
    assert_relative_eq!(base_tempo(&engine), 100.0, epsilon = TEMPO_EPSILON);
}

#[test]
fn test_set_role_takes_effect_immediately() {
    let mut engine = test_engine();
    let rx = engine.subscribe();
    engine.load_score(&two_part_score(100.0, 4)).unwrap();
    assert_eq!(engine.role(), RoleDirective::default());

    engine.apply_command(&RehearsalCommand::SetRole {
        measure_number: 1,
        role: RoleDirective::preset(RoleMode::Lead, RoleStrength::Moderate),
    });
    assert_eq!(engine.role().mode, RoleMode::Lead);
    assert_relative_eq!(engine.role().factor, 0.7);

    let last = rx.try_iter().last().unwrap();
    assert_relative_eq!(last.lead_follow_ratio, 0.7);
}

#[test]
fn test_set_wait_applies_on_next_visit() {
    let mut engine = test_engine();
    engine.load_score(&two_part_score(120.0, 4)).unwrap();

    engine.apply_command(&RehearsalCommand::SetWait {
        measure_number: 2,
        wait: WaitDirective::timed(1.0),
    });
    engine.start();
    engine.advance_by(2100.0);
    assert_eq!(engine.state(), EngineState::Waiting);

    engine.advance_by(1000.0);
    assert_eq!(engine.state(), EngineState::Listening);
}

#[test]
fn test_reset_restores_loaded_annotations() {
    let mut engine = test_engine();
    let score = with_annotations(
        two_part_score(100.0, 4),
        vec![MeasureAnnotation::role(3, RoleDirective::preset(RoleMode::Lead, RoleStrength::Light))],
    );
    engine.load_score(&score).unwrap();

    engine.apply_command(&RehearsalCommand::SetRole {
        measure_number: 3,
        role: RoleDirective::preset(RoleMode::Follow, RoleStrength::Strong),
    });
    engine.apply_command(&RehearsalCommand::SetWait {
        measure_number: 2,
        wait: WaitDirective::listen(),
    });
    assert_eq!(engine.annotations().resolve_role(3).strength, RoleStrength::Strong);
    assert!(engine.annotations().wait_at(2).is_some());

    engine.apply_command(&RehearsalCommand::Reset);
    assert_eq!(engine.annotations().resolve_role(3).mode, RoleMode::Lead);
    assert!(engine.annotations().wait_at(2).is_none());
}

#[test]
fn test_commands_before_load_are_harmless() {
    let mut engine = test_engine();
    engine.apply_command(&RehearsalCommand::SetTempo {
        tempo: 90.0,
        relative: None,
    });
    engine.apply_command(&RehearsalCommand::Reset);
    assert!(!engine.is_loaded());
    assert_eq!(engine.state(), EngineState::Idle);
}
