//! The active-phase selector is strict: no fallback to phases[0].

use crate::prelude::*;
use ixado_core::PhaseId;
use ixado_storage::{resolve_active_phase_strict, ActivePhaseErrorCode};

#[test]
fn empty_project_reports_no_phases() {
    let k = kernel(Default::default());
    let state = k.service().get_state().unwrap();
    let err = resolve_active_phase_strict(&state).unwrap_err();
    assert_eq!(err.code, ActivePhaseErrorCode::NoPhases);
    assert_eq!(err.code.as_str(), "NO_PHASES");
}

#[test]
fn unset_pointer_is_an_error_even_with_phases_present() {
    let k = kernel(Default::default());
    k.service().create_phase("P1", "p1").unwrap();
    k.service().create_phase("P2", "p2").unwrap();

    // Clear the pointer that create_phase set for the first phase.
    let mut state = k.service().get_state().unwrap();
    state.active_phase_id = None;
    let err = resolve_active_phase_strict(&state).unwrap_err();
    assert_eq!(err.code, ActivePhaseErrorCode::ActivePhaseIdMissing);
}

#[test]
fn dangling_pointer_reports_not_found() {
    let k = kernel(Default::default());
    k.service().create_phase("P1", "p1").unwrap();
    k.service().create_phase("P2", "p2").unwrap();

    let mut state = k.service().get_state().unwrap();
    state.active_phase_id = Some(PhaseId::new("no-such-phase"));
    let err = resolve_active_phase_strict(&state).unwrap_err();
    assert_eq!(err.code, ActivePhaseErrorCode::ActivePhaseIdNotFound);
    assert!(err.hint.contains("ixado phase active"));
}

#[test]
fn valid_pointer_resolves_exactly_one_phase() {
    let k = kernel(Default::default());
    k.service().create_phase("P1", "p1").unwrap();
    let p2 = k.service().create_phase("P2", "p2").unwrap();
    k.service().set_active_phase(&p2.id).unwrap();

    let state = k.service().get_state().unwrap();
    let resolved = resolve_active_phase_strict(&state).unwrap();
    assert_eq!(resolved.id, p2.id);
}
