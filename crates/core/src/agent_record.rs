// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry row for a spawned adapter subprocess.
//!
//! `AgentRecord` rows live in the shared on-disk registry so a crashed
//! controller can reconcile stale RUNNING records on next startup. Unknown
//! `adapterId` values deserialize to `None` with the record kept; the tail
//! buffer is bounded at [`OUTPUT_TAIL_CAP`] lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::adapter::{deserialize_adapter_id_lenient, AdapterId};
use crate::phase::PhaseId;
use crate::task::TaskId;

crate::define_id! {
    /// Unique identifier of a spawned agent (UUID).
    pub struct AgentId;
}

/// Maximum lines retained in a record's output tail.
pub const OUTPUT_TAIL_CAP: usize = 200;

/// Status of a registry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentRecordStatus {
    Running,
    Stopped,
    Failed,
}

impl fmt::Display for AgentRecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentRecordStatus::Running => "RUNNING",
            AgentRecordStatus::Stopped => "STOPPED",
            AgentRecordStatus::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// One spawned subprocess, shared across controller processes via the
/// registry file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub id: AgentId,
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Tolerant: unknown wire values load as `None`, the record is kept
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_adapter_id_lenient"
    )]
    pub adapter_id: Option<AdapterId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<PhaseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub status: AgentRecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
    #[serde(default)]
    pub output_tail: Vec<String>,
}

impl AgentRecord {
    /// Append a line to the tail, evicting the oldest past the cap.
    pub fn push_tail_line(&mut self, line: impl Into<String>) {
        self.output_tail.push(line.into());
        if self.output_tail.len() > OUTPUT_TAIL_CAP {
            let excess = self.output_tail.len() - OUTPUT_TAIL_CAP;
            self.output_tail.drain(..excess);
        }
    }

    /// Whether this row claims a live process.
    pub fn is_running(&self) -> bool {
        self.status == AgentRecordStatus::Running
    }
}

#[cfg(test)]
#[path = "agent_record_tests.rs"]
mod tests;
