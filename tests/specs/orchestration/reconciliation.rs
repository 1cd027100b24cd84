//! Crash reconciliation: stale RUNNING agents and orphaned IN_PROGRESS
//! tasks are cleaned up on startup, with counts reported for both.

use crate::prelude::*;
use ixado_core::{test_support, AgentRecordStatus, TaskStatus};

#[tokio::test]
async fn stale_agent_and_orphaned_task_are_reconciled() {
    let k = kernel(Default::default());
    let phase = k.service().create_phase("P1", "p1").unwrap();
    let task = k
        .service()
        .create_task(&phase.id, "T1", "Do X", mock_assignee(), vec![])
        .unwrap();
    k.service().mark_task_in_progress(&task.id).unwrap();

    // A RUNNING registry row from a crashed controller, PID long dead.
    let mut stale = test_support::running_agent(1);
    stale.pid = Some(999_999);
    stale.task_id = Some(task.id.clone());
    k.service().registry().save(&[stale]).unwrap();

    let report = k.runner.reconcile_on_startup().unwrap();
    assert_eq!(report.stale_agents, 1);
    assert_eq!(report.reset_tasks, 1);

    // Post-reconcile: no RUNNING row, no IN_PROGRESS task.
    assert!(k
        .service()
        .registry()
        .load()
        .iter()
        .all(|r| r.status == AgentRecordStatus::Stopped));
    let state = k.service().get_state().unwrap();
    let (_, task_now) = state.find_task(&task.id).unwrap();
    assert_eq!(task_now.status, TaskStatus::Todo);
    assert!(task_now.result_context.is_none());
    assert!(task_now.error_logs.is_none());
    assert!(task_now.error_category.is_none());
}

#[tokio::test]
async fn reconciliation_is_idempotent() {
    let k = kernel(Default::default());
    let phase = k.service().create_phase("P1", "p1").unwrap();
    let task = k
        .service()
        .create_task(&phase.id, "T1", "Do X", mock_assignee(), vec![])
        .unwrap();
    k.service().mark_task_in_progress(&task.id).unwrap();

    let first = k.runner.reconcile_on_startup().unwrap();
    assert_eq!(first.reset_tasks, 1);
    let second = k.runner.reconcile_on_startup().unwrap();
    assert_eq!(second.stale_agents, 0);
    assert_eq!(second.reset_tasks, 0);
}

#[tokio::test]
async fn tasks_with_live_agents_are_left_alone() {
    let k = kernel(Default::default());
    let phase = k.service().create_phase("P1", "p1").unwrap();
    let task = k
        .service()
        .create_task(&phase.id, "T1", "Do X", mock_assignee(), vec![])
        .unwrap();
    k.service().mark_task_in_progress(&task.id).unwrap();

    // A RUNNING row whose PID is this test process: definitely alive.
    let mut live = test_support::running_agent(1);
    live.pid = Some(std::process::id());
    live.task_id = Some(task.id.clone());
    k.service().registry().save(&[live]).unwrap();

    let report = k.runner.reconcile_on_startup().unwrap();
    assert_eq!(report.stale_agents, 0);
    assert_eq!(report.reset_tasks, 0);

    let state = k.service().get_state().unwrap();
    let (_, task_now) = state.find_task(&task.id).unwrap();
    assert_eq!(task_now.status, TaskStatus::InProgress);
}
