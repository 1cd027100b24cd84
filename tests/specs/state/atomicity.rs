//! State writes commit via temp-file + rename and leave no residue.

use crate::prelude::*;
use ixado_core::test_support;
use ixado_core::{FakeClock, PhaseStatus};
use ixado_storage::{StateFile, StateError};
use tempfile::TempDir;

#[test]
fn no_tmp_file_survives_a_successful_write() {
    let dir = TempDir::new().unwrap();
    let sf = StateFile::new(dir.path().join(".ixado/state.json"), FakeClock::new());
    let mut state = sf.initialize("IxADO", dir.path()).unwrap();
    state.phases.push(test_support::phase(1));
    sf.write(state).unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path().join(".ixado"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{names:?}");

    // And what is on disk is schema-valid.
    let read = sf.read().unwrap();
    assert_eq!(read.phases.len(), 1);
}

#[test]
fn a_failed_write_leaves_the_previous_document_intact() {
    let dir = TempDir::new().unwrap();
    let sf = StateFile::new(dir.path().join(".ixado/state.json"), FakeClock::new());
    let good = sf.initialize("IxADO", dir.path()).unwrap();

    // Invariant-violating document: failure status without failureKind.
    let mut bad = good.clone();
    let mut phase = test_support::phase(1);
    phase.status = PhaseStatus::CiFailed;
    bad.phases.push(phase);
    assert!(matches!(sf.write(bad), Err(StateError::Invariant(_))));

    assert_eq!(sf.read().unwrap(), good);
}

#[test]
fn service_transactions_read_back_what_they_wrote() {
    let k = kernel(Default::default());
    let phase = k.service().create_phase("P1", "p1").unwrap();
    let task = k
        .service()
        .create_task(&phase.id, "T1", "Do X", mock_assignee(), vec![])
        .unwrap();

    let state = k.service().get_state().unwrap();
    assert_eq!(state.phases.len(), 1);
    assert_eq!(state.phases[0].tasks[0].id, task.id);
    // updatedAt moved monotonically across the three writes.
    assert!(state.updated_at >= state.created_at);
}
