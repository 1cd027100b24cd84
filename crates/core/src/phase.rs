// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase: a bounded unit of work producing at most one pull request.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::recovery::RecoveryAttemptRecord;
use crate::task::{Task, TaskId, TaskStatus};

crate::define_id! {
    /// Unique identifier of a phase (UUID).
    pub struct PhaseId;
}

/// Lifecycle status of a phase through the GitOps flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    Planning,
    Branching,
    Coding,
    CreatingPr,
    AwaitingCi,
    CiFailed,
    ReadyForReview,
    Done,
}

impl PhaseStatus {
    /// Whether this status represents a failure requiring a `failureKind`.
    pub fn is_failure(&self) -> bool {
        matches!(self, PhaseStatus::CiFailed)
    }

    /// Whether the execution loop refuses to run this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PhaseStatus::Done)
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseStatus::Planning => "PLANNING",
            PhaseStatus::Branching => "BRANCHING",
            PhaseStatus::Coding => "CODING",
            PhaseStatus::CreatingPr => "CREATING_PR",
            PhaseStatus::AwaitingCi => "AWAITING_CI",
            PhaseStatus::CiFailed => "CI_FAILED",
            PhaseStatus::ReadyForReview => "READY_FOR_REVIEW",
            PhaseStatus::Done => "DONE",
        };
        write!(f, "{}", s)
    }
}

/// What failed when a phase lands in a failure status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    LocalTester,
    RemoteCi,
    AgentFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::LocalTester => "LOCAL_TESTER",
            FailureKind::RemoteCi => "REMOTE_CI",
            FailureKind::AgentFailure => "AGENT_FAILURE",
        };
        write!(f, "{}", s)
    }
}

/// A bounded unit of work targeted at one feature branch, culminating in
/// one pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Phase {
    pub id: PhaseId,
    pub name: String,
    pub branch_name: String,
    pub status: PhaseStatus,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_status_context: Option<String>,
    /// Present iff `status` is a failure status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_attempts: Option<Vec<RecoveryAttemptRecord>>,
}

impl Phase {
    /// Create a fresh PLANNING phase.
    pub fn new(id: PhaseId, name: impl Into<String>, branch_name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            branch_name: branch_name.into(),
            status: PhaseStatus::Planning,
            tasks: Vec::new(),
            pr_url: None,
            ci_status_context: None,
            failure_kind: None,
            recovery_attempts: None,
        }
    }

    /// Transition status, clearing `failure_kind` on any non-failure status.
    pub fn set_status(&mut self, status: PhaseStatus, failure_kind: Option<FailureKind>) {
        self.status = status;
        self.failure_kind = if status.is_failure() { failure_kind } else { None };
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    /// 1-based position of a task within the phase, for display labels.
    pub fn task_number(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id).map(|i| i + 1)
    }

    /// Whether every task is DONE (an empty phase does not count).
    pub fn all_tasks_done(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.status == TaskStatus::Done)
    }

    /// Next actionable task: status TODO or CI_FIX, all dependencies DONE,
    /// tie-break by sequence position.
    pub fn next_actionable_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| {
            t.status.is_actionable()
                && t.dependencies.iter().all(|dep| {
                    self.task(dep)
                        .map(|d| d.status == TaskStatus::Done)
                        .unwrap_or(false)
                })
        })
    }

    /// Append a phase-level recovery attempt record.
    pub fn record_recovery_attempt(&mut self, record: RecoveryAttemptRecord) {
        self.recovery_attempts
            .get_or_insert_with(Vec::new)
            .push(record);
    }
}

#[cfg(test)]
#[path = "phase_tests.rs"]
mod tests;
