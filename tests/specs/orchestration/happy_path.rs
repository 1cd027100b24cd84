//! End-to-end happy path with the deterministic mock adapter.

use crate::prelude::*;
use ixado_core::{PhaseStatus, TaskStatus};
use ixado_engine::PhaseRunOutcome;

#[tokio::test]
async fn initialize_create_dispatch_complete() {
    let k = kernel(Default::default());
    let phase = k.service().create_phase("P1", "p1").unwrap();
    k.service()
        .create_task(&phase.id, "T1", "Do X", mock_assignee(), vec![])
        .unwrap();

    let outcome = k.runner.run_active_phase().await.unwrap();
    assert_eq!(
        outcome,
        PhaseRunOutcome::Completed(PhaseStatus::ReadyForReview)
    );

    let state = k.service().get_state().unwrap();
    let task = &state.phases[0].tasks[0];
    assert_eq!(task.status, TaskStatus::Done);
    assert!(task
        .result_context
        .as_deref()
        .unwrap_or("")
        .contains("done"));

    // No running agents remain.
    assert!(k
        .runner
        .supervisor()
        .list()
        .iter()
        .all(|r| !r.is_running()));
}

#[tokio::test]
async fn start_task_and_wait_commits_the_result() {
    let k = kernel(Default::default());
    let phase = k.service().create_phase("P1", "p1").unwrap();
    let task = k
        .service()
        .create_task(&phase.id, "T1", "Do X", mock_assignee(), vec![])
        .unwrap();

    let finished = k.runner.start_task_and_wait(&task.id).await.unwrap();
    assert_eq!(finished.status, TaskStatus::Done);
    assert!(finished
        .result_context
        .as_deref()
        .unwrap_or("")
        .contains("done"));
}
