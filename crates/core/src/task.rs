// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task: an atomic assignment to an adapter.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adapter::Assignee;
use crate::recovery::{ExceptionCategory, RecoveryAttemptRecord};

crate::define_id! {
    /// Unique identifier of a task (UUID).
    pub struct TaskId;
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Failed,
    /// Auto-created from parsed CI failures
    CiFix,
}

impl TaskStatus {
    /// Whether the execution loop may pick this task up.
    pub fn is_actionable(&self) -> bool {
        matches!(self, TaskStatus::Todo | TaskStatus::CiFix)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
            TaskStatus::Failed => "FAILED",
            TaskStatus::CiFix => "CI_FIX",
        };
        write!(f, "{}", s)
    }
}

/// Worker archetype determining the system-prompt prefix composed for a
/// dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerArchetype {
    Coder,
    Tester,
    Reviewer,
    Fixer,
}

impl fmt::Display for WorkerArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerArchetype::Coder => "CODER",
            WorkerArchetype::Tester => "TESTER",
            WorkerArchetype::Reviewer => "REVIEWER",
            WorkerArchetype::Fixer => "FIXER",
        };
        write!(f, "{}", s)
    }
}

/// An atomic assignment to an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub assignee: Assignee,
    /// Task IDs that must all be DONE before this task is startable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,
    /// Captured adapter output on success, capped at 4000 characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_context: Option<String>,
    /// Captured adapter output on failure, capped at 4000 characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_logs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ExceptionCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_attempts: Option<Vec<RecoveryAttemptRecord>>,
}

impl Task {
    /// Create a fresh TODO task.
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        assignee: Assignee,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status: TaskStatus::Todo,
            assignee,
            dependencies: Vec::new(),
            result_context: None,
            error_logs: None,
            error_category: None,
            recovery_attempts: None,
        }
    }

    /// The archetype used when composing this task's dispatch prompt.
    ///
    /// CI_FIX tasks are dispatched as fixers; everything else codes.
    pub fn archetype(&self) -> WorkerArchetype {
        match self.status {
            TaskStatus::CiFix => WorkerArchetype::Fixer,
            _ => WorkerArchetype::Coder,
        }
    }

    /// Clear the diagnostic scratch fields.
    ///
    /// Keeps `recovery_attempts`: the attempt log is an audit trail.
    pub fn clear_diagnostics(&mut self) {
        self.result_context = None;
        self.error_logs = None;
        self.error_category = None;
    }

    /// Append a recovery attempt record.
    pub fn record_recovery_attempt(&mut self, record: RecoveryAttemptRecord) {
        self.recovery_attempts
            .get_or_insert_with(Vec::new)
            .push(record);
    }

    /// Next 1-based attempt number for this task.
    pub fn next_attempt_number(&self) -> u32 {
        self.recovery_attempts
            .as_ref()
            .map(|a| a.len() as u32)
            .unwrap_or(0)
            + 1
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
