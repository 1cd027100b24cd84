// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and helpers shared by tests across crates.

use chrono::{TimeZone, Utc};

use crate::adapter::{AdapterId, Assignee};
use crate::agent_record::{AgentId, AgentRecord, AgentRecordStatus};
use crate::phase::{Phase, PhaseId, PhaseStatus};
use crate::project::ProjectState;
use crate::task::{Task, TaskId, TaskStatus};

/// Fixed wall-clock instant used by deterministic tests.
pub fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A minimal schema-valid project state.
pub fn project_state(name: &str) -> ProjectState {
    ProjectState::new(name, format!("/tmp/{name}"), fixed_time())
}

/// A CODING phase with the given id suffix and no tasks.
pub fn phase(n: u32) -> Phase {
    let mut p = Phase::new(
        PhaseId::new(format!("phase-{n}")),
        format!("Phase {n}"),
        format!("feature/phase-{n}"),
    );
    p.status = PhaseStatus::Coding;
    p
}

/// A TODO task assigned to the mock adapter.
pub fn task(n: u32) -> Task {
    Task::new(
        TaskId::new(format!("task-{n}")),
        format!("Task {n}"),
        format!("Do the work for task {n}"),
        Assignee::Adapter(AdapterId::MockCli),
    )
}

/// A task in the given status.
pub fn task_with_status(n: u32, status: TaskStatus) -> Task {
    let mut t = task(n);
    t.status = status;
    t
}

/// A RUNNING registry row for tests.
pub fn running_agent(n: u32) -> AgentRecord {
    AgentRecord {
        id: AgentId::new(format!("agent-{n}")),
        name: format!("mock-{n}"),
        command: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), "true".to_string()],
        cwd: "/tmp".into(),
        adapter_id: Some(AdapterId::MockCli),
        project_name: None,
        phase_id: None,
        task_id: None,
        status: AgentRecordStatus::Running,
        pid: Some(4242),
        started_at: Some(fixed_time()),
        last_exit_code: None,
        output_tail: Vec::new(),
    }
}
