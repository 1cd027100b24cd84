// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support;

#[test]
fn new_phase_is_planning() {
    let p = Phase::new(PhaseId::new("p1"), "P1", "feature/p1");
    assert_eq!(p.status, PhaseStatus::Planning);
    assert!(p.tasks.is_empty());
    assert!(p.failure_kind.is_none());
}

#[test]
fn set_status_clears_failure_kind_on_non_failure() {
    let mut p = test_support::phase(1);
    p.set_status(PhaseStatus::CiFailed, Some(FailureKind::RemoteCi));
    assert_eq!(p.failure_kind, Some(FailureKind::RemoteCi));

    p.set_status(PhaseStatus::Coding, None);
    assert!(p.failure_kind.is_none());
}

#[test]
fn set_status_ignores_failure_kind_for_non_failure_status() {
    let mut p = test_support::phase(1);
    p.set_status(PhaseStatus::Done, Some(FailureKind::AgentFailure));
    assert!(p.failure_kind.is_none());
}

#[test]
fn all_tasks_done_requires_at_least_one_task() {
    let mut p = test_support::phase(1);
    assert!(!p.all_tasks_done());

    p.tasks.push(test_support::task_with_status(1, TaskStatus::Done));
    assert!(p.all_tasks_done());

    p.tasks.push(test_support::task(2));
    assert!(!p.all_tasks_done());
}

#[test]
fn next_actionable_skips_tasks_with_open_dependencies() {
    let mut p = test_support::phase(1);
    let mut blocked = test_support::task(1);
    blocked.dependencies.push(TaskId::new("task-2"));
    p.tasks.push(blocked);
    p.tasks.push(test_support::task(2));

    // task-1 depends on task-2 which is still TODO, so task-2 is next.
    let next = p.next_actionable_task().map(|t| t.id.clone());
    assert_eq!(next, Some(TaskId::new("task-2")));
}

#[test]
fn next_actionable_honors_sequence_order_once_unblocked() {
    let mut p = test_support::phase(1);
    let mut blocked = test_support::task(1);
    blocked.dependencies.push(TaskId::new("task-2"));
    p.tasks.push(blocked);
    p.tasks
        .push(test_support::task_with_status(2, TaskStatus::Done));

    let next = p.next_actionable_task().map(|t| t.id.clone());
    assert_eq!(next, Some(TaskId::new("task-1")));
}

#[test]
fn next_actionable_includes_ci_fix() {
    let mut p = test_support::phase(1);
    p.tasks.push(test_support::task_with_status(1, TaskStatus::Done));
    p.tasks
        .push(test_support::task_with_status(2, TaskStatus::CiFix));

    let next = p.next_actionable_task().map(|t| t.id.clone());
    assert_eq!(next, Some(TaskId::new("task-2")));
}

#[test]
fn next_actionable_none_when_all_settled() {
    let mut p = test_support::phase(1);
    p.tasks.push(test_support::task_with_status(1, TaskStatus::Done));
    p.tasks
        .push(test_support::task_with_status(2, TaskStatus::Failed));
    assert!(p.next_actionable_task().is_none());
}

#[test]
fn missing_dependency_blocks_forever() {
    let mut p = test_support::phase(1);
    let mut t = test_support::task(1);
    t.dependencies.push(TaskId::new("no-such-task"));
    p.tasks.push(t);
    assert!(p.next_actionable_task().is_none());
}

#[test]
fn task_number_is_one_based() {
    let mut p = test_support::phase(1);
    p.tasks.push(test_support::task(1));
    p.tasks.push(test_support::task(2));
    assert_eq!(p.task_number(&TaskId::new("task-1")), Some(1));
    assert_eq!(p.task_number(&TaskId::new("task-2")), Some(2));
    assert_eq!(p.task_number(&TaskId::new("task-9")), None);
}

#[yare::parameterized(
    planning  = { PhaseStatus::Planning,       "PLANNING" },
    creating  = { PhaseStatus::CreatingPr,     "CREATING_PR" },
    awaiting  = { PhaseStatus::AwaitingCi,     "AWAITING_CI" },
    ci_failed = { PhaseStatus::CiFailed,       "CI_FAILED" },
    review    = { PhaseStatus::ReadyForReview, "READY_FOR_REVIEW" },
)]
fn status_wire_names(status: PhaseStatus, wire: &str) {
    assert_eq!(
        serde_json::to_string(&status).unwrap(),
        format!("\"{wire}\"")
    );
    assert_eq!(status.to_string(), wire);
}

#[test]
fn only_ci_failed_is_failure() {
    assert!(PhaseStatus::CiFailed.is_failure());
    assert!(!PhaseStatus::Done.is_failure());
    assert!(!PhaseStatus::Coding.is_failure());
}
