// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ixado_core::test_support;
use ixado_core::{
    AgentRecordStatus, EventContext, EventId, EventSource, OutputStream, RecoveryAttemptRecord,
    RecoveryException, RecoveryResult, TaskStatus,
};

fn output_event(line: &str) -> RuntimeEvent {
    RuntimeEvent::at(
        EventId::new("e1"),
        test_support::fixed_time(),
        EventSource::AgentSupervisor,
        EventContext {
            phase_name: Some("Phase 1".to_string()),
            task_title: Some("T1".to_string()),
            task_number: Some(1),
            ..Default::default()
        },
        EventPayload::AdapterOutput {
            stream: OutputStream::Stdout,
            line: line.to_string(),
            is_diagnostic: None,
            metadata: None,
        },
    )
}

#[test]
fn chatter_is_dropped_from_frames() {
    let record = test_support::running_agent(1);
    assert!(enrich_event(&output_event("Read src/lib.rs"), &record, None).is_none());
    assert!(enrich_event(&output_event("building release binary"), &record, None).is_some());
}

#[test]
fn frames_carry_formatted_line_and_context() {
    let record = test_support::running_agent(1);
    let frame = enrich_event(&output_event("hello"), &record, None).unwrap();
    assert_eq!(frame.context, "Phase 1 / #1 T1");
    assert_eq!(frame.formatted_line, "[Phase 1 / #1 T1] [stdout] hello");
    assert!(frame.failure_summary.is_none());
    assert!(frame.recovery_links.is_empty());
}

#[test]
fn failure_summary_picks_first_matching_line() {
    let lines = [
        "starting build",
        "warning: unused import",
        "error[E0308]:   mismatched    types in parser",
        "error: aborting due to previous error",
    ];
    let summary = derive_failure_summary(lines.iter().copied()).unwrap();
    assert_eq!(summary, "error[E0308]: mismatched types in parser");
}

#[test]
fn failure_summary_caps_at_140_chars() {
    let long = format!("error: {}", "x".repeat(200));
    let summary = derive_failure_summary([long.as_str()].into_iter()).unwrap();
    assert_eq!(summary.chars().count(), 143); // 140 + "..."
    assert!(summary.ends_with("..."));
}

#[test]
fn failure_summary_none_without_matching_line() {
    assert_eq!(
        derive_failure_summary(["all good", "still fine"].into_iter()),
        None
    );
}

#[test]
fn terminal_failure_gets_summary_and_recovery_links() {
    let mut record = test_support::running_agent(1);
    record.status = AgentRecordStatus::Failed;
    record.push_tail_line("compiling");
    record.push_tail_line("process finished with exit code 2");

    let mut state = test_support::project_state("demo");
    let mut phase = test_support::phase(1);
    let mut task = test_support::task_with_status(1, TaskStatus::Failed);
    task.record_recovery_attempt(RecoveryAttemptRecord {
        id: "r1".to_string(),
        occurred_at: test_support::fixed_time(),
        attempt_number: 1,
        exception: RecoveryException {
            category: ixado_core::ExceptionCategory::AgentFailure,
            message: "boom".to_string(),
            phase_id: None,
            task_id: Some(task.id.clone()),
        },
        result: RecoveryResult::unfixable("still broken"),
    });
    let task_id = task.id.clone();
    phase.tasks.push(task);
    state.phases.push(phase);

    let event = RuntimeEvent::at(
        EventId::new("e2"),
        test_support::fixed_time(),
        EventSource::AgentSupervisor,
        EventContext {
            task_id: Some(task_id.clone()),
            ..Default::default()
        },
        EventPayload::TerminalOutcome {
            outcome: OutcomeKind::Failure,
            summary: "adapter exited with code 2".to_string(),
            agent_status: Some(AgentRecordStatus::Failed),
            exit_code: Some(2),
        },
    );

    let frame = enrich_event(&event, &record, Some(&state)).unwrap();
    assert_eq!(
        frame.failure_summary.as_deref(),
        Some("process finished with exit code 2")
    );
    assert_eq!(frame.recovery_links.len(), 2);
    assert_eq!(frame.recovery_links[0].href, format!("#task-{task_id}"));
    assert_eq!(
        frame.recovery_links[1].href,
        format!("#task-{task_id}-recovery-1")
    );
}

#[test]
fn successful_terminal_has_no_failure_summary() {
    let record = test_support::running_agent(1);
    let event = RuntimeEvent::at(
        EventId::new("e3"),
        test_support::fixed_time(),
        EventSource::AgentSupervisor,
        EventContext::default(),
        EventPayload::TerminalOutcome {
            outcome: OutcomeKind::Success,
            summary: "adapter exited cleanly".to_string(),
            agent_status: Some(AgentRecordStatus::Stopped),
            exit_code: Some(0),
        },
    );
    let frame = enrich_event(&event, &record, None).unwrap();
    assert!(frame.failure_summary.is_none());
    assert!(frame.recovery_links.is_empty());
}

#[test]
fn frame_serializes_event_fields_at_top_level() {
    let record = test_support::running_agent(1);
    let frame = enrich_event(&output_event("line"), &record, None).unwrap();
    let json = serde_json::to_value(&frame).unwrap();
    assert_eq!(json["type"], "adapter.output");
    assert_eq!(json["formattedLine"], "[Phase 1 / #1 T1] [stdout] line");
    assert_eq!(json["version"], 1);
}
