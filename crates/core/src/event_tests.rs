// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapter::AdapterId;
use crate::test_support;

fn context() -> EventContext {
    EventContext {
        project_name: Some("demo".to_string()),
        phase_id: Some(PhaseId::new("p1")),
        phase_name: Some("Phase 1".to_string()),
        task_id: Some(TaskId::new("t1")),
        task_title: Some("Wire the parser".to_string()),
        task_number: Some(2),
        agent_id: Some(AgentId::new("a1")),
        adapter_id: Some(AdapterId::MockCli),
    }
}

fn event(payload: EventPayload) -> RuntimeEvent {
    RuntimeEvent::at(
        EventId::new("e1"),
        test_support::fixed_time(),
        EventSource::PhaseRunner,
        context(),
        payload,
    )
}

#[test]
fn envelope_carries_version_one() {
    let e = event(EventPayload::TaskProgress {
        message: "working".to_string(),
    });
    assert_eq!(e.version, EVENT_VERSION);
    let json = serde_json::to_value(&e).unwrap();
    assert_eq!(json["version"], 1);
    assert_eq!(json["type"], "task.lifecycle.progress");
    assert_eq!(json["source"], "PHASE_RUNNER");
}

#[test]
fn now_generates_fresh_ids() {
    let a = RuntimeEvent::now(
        EventSource::Cli,
        EventContext::default(),
        EventPayload::TaskProgress {
            message: "x".to_string(),
        },
    );
    let b = RuntimeEvent::now(
        EventSource::Cli,
        EventContext::default(),
        EventPayload::TaskProgress {
            message: "x".to_string(),
        },
    );
    assert_ne!(a.event_id, b.event_id);
}

#[test]
fn tagged_payload_round_trip() {
    let e = event(EventPayload::CiActivity {
        stage: "failed".to_string(),
        summary: "2 checks failed".to_string(),
        overall: Some(CiOverall::Failure),
        poll_count: Some(5),
        created_fix_task_count: Some(3),
    });
    let json = serde_json::to_string(&e).unwrap();
    let back: RuntimeEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, e);
}

#[yare::parameterized(
    start    = { EventPayload::TaskStart { assignee: Assignee::Adapter(AdapterId::MockCli), resume: false, message: "go".into() }, "task.lifecycle.start" },
    progress = { EventPayload::TaskProgress { message: "m".into() }, "task.lifecycle.progress" },
    phase    = { EventPayload::PhaseUpdate { status: PhaseStatus::Coding, message: None }, "task.lifecycle.phase-update" },
    finish   = { EventPayload::TaskFinish { status: TaskStatus::Done, message: "m".into() }, "task.lifecycle.finish" },
    output   = { EventPayload::AdapterOutput { stream: OutputStream::Stdout, line: "l".into(), is_diagnostic: None, metadata: None }, "adapter.output" },
    tester   = { EventPayload::TesterActivity { stage: "started".into(), summary: "s".into(), attempt_number: None, category: None }, "tester.activity" },
    recovery = { EventPayload::RecoveryActivity { stage: "attempt-failed".into(), summary: "s".into(), attempt_number: Some(1), category: None }, "recovery.activity" },
    pr       = { EventPayload::PrActivity { stage: "opened".into(), summary: "s".into(), pr_url: None, pr_number: None }, "pr.activity" },
    ci       = { EventPayload::CiActivity { stage: "poll-transition".into(), summary: "s".into(), overall: None, poll_count: None, created_fix_task_count: None }, "ci.activity" },
    terminal = { EventPayload::TerminalOutcome { outcome: OutcomeKind::Success, summary: "s".into(), agent_status: None, exit_code: Some(0) }, "terminal.outcome" },
)]
fn type_names_match_wire_tags(payload: EventPayload, expected: &str) {
    assert_eq!(payload.type_name(), expected);
    let e = event(payload);
    let json = serde_json::to_value(&e).unwrap();
    assert_eq!(json["type"], expected);
}

#[test]
fn context_label_combines_phase_and_task() {
    assert_eq!(context().label(), "Phase 1 / #2 Wire the parser");
    assert_eq!(EventContext::default().label(), "");
}

#[test]
fn recovery_key_includes_distinguishing_fields() {
    let e = event(EventPayload::RecoveryActivity {
        stage: "attempt-failed".to_string(),
        summary: "X".to_string(),
        attempt_number: Some(1),
        category: Some(ExceptionCategory::DirtyWorktree),
    });
    assert_eq!(
        e.notification_key(),
        "recovery.activity|p1|t1|attempt-failed|1|DIRTY_WORKTREE|X"
    );
}

#[test]
fn identical_facts_share_a_key() {
    let payload = EventPayload::RecoveryActivity {
        stage: "attempt-failed".to_string(),
        summary: "X".to_string(),
        attempt_number: Some(1),
        category: Some(ExceptionCategory::DirtyWorktree),
    };
    let a = event(payload.clone());
    let b = RuntimeEvent::at(
        EventId::new("e2"),
        test_support::fixed_time(),
        EventSource::PhaseRunner,
        context(),
        payload,
    );
    // Different event ids, same notification key.
    assert_ne!(a.event_id, b.event_id);
    assert_eq!(a.notification_key(), b.notification_key());
}

#[test]
fn different_stages_have_different_keys() {
    let a = event(EventPayload::CiActivity {
        stage: "failed".to_string(),
        summary: "s".to_string(),
        overall: None,
        poll_count: None,
        created_fix_task_count: None,
    });
    let b = event(EventPayload::CiActivity {
        stage: "succeeded".to_string(),
        summary: "s".to_string(),
        overall: None,
        poll_count: None,
        created_fix_task_count: None,
    });
    assert_ne!(a.notification_key(), b.notification_key());
}

#[test]
fn stage_accessor_covers_activity_payloads() {
    let e = event(EventPayload::PrActivity {
        stage: "pushing".to_string(),
        summary: "s".to_string(),
        pr_url: None,
        pr_number: None,
    });
    assert_eq!(e.payload.stage(), Some("pushing"));

    let e = event(EventPayload::TaskProgress {
        message: "m".to_string(),
    });
    assert_eq!(e.payload.stage(), None);
}
