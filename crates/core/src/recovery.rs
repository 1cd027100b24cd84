// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exception categories and recovery attempt records.
//!
//! A failed task is classified into an `ExceptionCategory`; each remediation
//! cycle is recorded as a `RecoveryAttemptRecord` on the task (and on the
//! phase for phase-level failures). The `result` sub-record is strict:
//! unknown keys fail validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::phase::PhaseId;
use crate::task::TaskId;

/// Failure classification driving the recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionCategory {
    /// Uncommitted residual changes left in the worktree
    DirtyWorktree,
    /// Staged changes that were never committed
    MissingCommit,
    /// The adapter subprocess itself failed
    AgentFailure,
    Unknown,
}

impl fmt::Display for ExceptionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExceptionCategory::DirtyWorktree => "DIRTY_WORKTREE",
            ExceptionCategory::MissingCommit => "MISSING_COMMIT",
            ExceptionCategory::AgentFailure => "AGENT_FAILURE",
            ExceptionCategory::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// The exception that triggered a recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecoveryException {
    pub category: ExceptionCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<PhaseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

/// Terminal status of one recovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    Fixed,
    Unfixable,
}

impl fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStatus::Fixed => write!(f, "fixed"),
            RecoveryStatus::Unfixable => write!(f, "unfixable"),
        }
    }
}

/// Outcome of one recovery attempt.
///
/// Strict record: the wire form carries exactly
/// `{status, reasoning, actionsTaken?, filesTouched?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecoveryResult {
    pub status: RecoveryStatus,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions_taken: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_touched: Option<Vec<String>>,
}

impl RecoveryResult {
    pub fn fixed(reasoning: impl Into<String>) -> Self {
        Self {
            status: RecoveryStatus::Fixed,
            reasoning: reasoning.into(),
            actions_taken: None,
            files_touched: None,
        }
    }

    pub fn unfixable(reasoning: impl Into<String>) -> Self {
        Self {
            status: RecoveryStatus::Unfixable,
            reasoning: reasoning.into(),
            actions_taken: None,
            files_touched: None,
        }
    }

    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.actions_taken = Some(actions);
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.status == RecoveryStatus::Fixed
    }
}

/// One recorded remediation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecoveryAttemptRecord {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    /// 1-based attempt counter within the failing task/phase
    pub attempt_number: u32,
    pub exception: RecoveryException,
    pub result: RecoveryResult,
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
