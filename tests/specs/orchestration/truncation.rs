//! The 4000-character output cap at its boundary.

use crate::prelude::*;
use ixado_core::TaskStatus;

/// Run a mock adapter that prints `chars` × 'a' with no trailing newline;
/// the line-buffered capture appends one, so the raw stream is
/// `chars + 1` characters long.
async fn run_mock_emitting(chars: usize) -> String {
    let script = format!("printf %s {}", "a".repeat(chars));
    let k = kernel(settings_with_mock_script(&script));
    let phase = k.service().create_phase("P1", "p1").unwrap();
    let task = k
        .service()
        .create_task(&phase.id, "T1", "emit", mock_assignee(), vec![])
        .unwrap();
    let finished = k.runner.start_task_and_wait(&task.id).await.unwrap();
    assert_eq!(finished.status, TaskStatus::Done);
    finished.result_context.unwrap()
}

#[tokio::test]
async fn over_cap_by_one_is_truncated_to_exactly_4000() {
    // Raw stream: 4001 characters.
    let context = run_mock_emitting(4000).await;
    assert_eq!(context.chars().count(), 4000);
    assert!(context.ends_with("\n... [truncated]"));
}

#[tokio::test]
async fn exactly_cap_is_stored_intact() {
    // Raw stream: exactly 4000 characters.
    let context = run_mock_emitting(3999).await;
    assert_eq!(context.chars().count(), 4000);
    assert!(!context.ends_with("[truncated]"));
    assert!(context.starts_with("aaa"));
}
