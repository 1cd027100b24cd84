// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime event types.
//!
//! Every event is an envelope (`eventId`, `occurredAt`, `source`, routing
//! context) around a tagged payload. Serializes with
//! `{"version":1,"type":"family.name", ...}`; consumers (CLI, Telegram, web
//! SSE) each format events into a single line. The bus is authoritative:
//! nothing downstream parses raw log lines for semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adapter::Assignee;
use crate::agent_record::{AgentId, AgentRecordStatus};
use crate::phase::{PhaseId, PhaseStatus};
use crate::recovery::ExceptionCategory;
use crate::task::{TaskId, TaskStatus};

/// Schema version carried by every event.
pub const EVENT_VERSION: u32 = 1;

crate::define_id! {
    /// Unique identifier of an emitted event (UUID).
    pub struct EventId;
}

/// Which component emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSource {
    PhaseRunner,
    AgentSupervisor,
    WebApi,
    Cli,
    Telegram,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventSource::PhaseRunner => "PHASE_RUNNER",
            EventSource::AgentSupervisor => "AGENT_SUPERVISOR",
            EventSource::WebApi => "WEB_API",
            EventSource::Cli => "CLI",
            EventSource::Telegram => "TELEGRAM",
        };
        write!(f, "{}", s)
    }
}

/// Optional routing context attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<PhaseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_title: Option<String>,
    /// 1-based position of the task within its phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<crate::adapter::AdapterId>,
}

impl EventContext {
    /// Compact `phase / #n title` label used by consumer formatters.
    pub fn label(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(name) = &self.phase_name {
            parts.push(name.clone());
        }
        match (&self.task_number, &self.task_title) {
            (Some(n), Some(title)) => parts.push(format!("#{} {}", n, title)),
            (None, Some(title)) => parts.push(title.clone()),
            (Some(n), None) => parts.push(format!("#{}", n)),
            (None, None) => {}
        }
        parts.join(" / ")
    }
}

/// Source stream of an adapter output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
    /// Synthetic lines emitted by the supervisor itself
    System,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
            OutputStream::System => write!(f, "system"),
        }
    }
}

/// Aggregate CI status observed while polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CiOverall {
    Pending,
    Success,
    Failure,
}

impl fmt::Display for CiOverall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CiOverall::Pending => "PENDING",
            CiOverall::Success => "SUCCESS",
            CiOverall::Failure => "FAILURE",
        };
        write!(f, "{}", s)
    }
}

/// Terminal outcome of a supervised agent or dispatched task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    Failure,
    Cancelled,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Success => write!(f, "success"),
            OutcomeKind::Failure => write!(f, "failure"),
            OutcomeKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Tagged event payload.
///
/// Families: task-lifecycle, adapter-output, tester-recovery,
/// ci-pr-lifecycle, terminal-outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "task.lifecycle.start", rename_all = "camelCase")]
    TaskStart {
        assignee: Assignee,
        /// True when re-dispatching after recovery
        resume: bool,
        message: String,
    },

    #[serde(rename = "task.lifecycle.progress", rename_all = "camelCase")]
    TaskProgress { message: String },

    #[serde(rename = "task.lifecycle.phase-update", rename_all = "camelCase")]
    PhaseUpdate {
        status: PhaseStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    #[serde(rename = "task.lifecycle.finish", rename_all = "camelCase")]
    TaskFinish { status: TaskStatus, message: String },

    #[serde(rename = "adapter.output", rename_all = "camelCase")]
    AdapterOutput {
        stream: OutputStream,
        line: String,
        /// Set when the line is a parsed `[ixado][agent-runtime]` marker
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_diagnostic: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },

    #[serde(rename = "tester.activity", rename_all = "camelCase")]
    TesterActivity {
        stage: String,
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attempt_number: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<ExceptionCategory>,
    },

    #[serde(rename = "recovery.activity", rename_all = "camelCase")]
    RecoveryActivity {
        stage: String,
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attempt_number: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<ExceptionCategory>,
    },

    #[serde(rename = "pr.activity", rename_all = "camelCase")]
    PrActivity {
        stage: String,
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pr_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pr_number: Option<u64>,
    },

    #[serde(rename = "ci.activity", rename_all = "camelCase")]
    CiActivity {
        stage: String,
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overall: Option<CiOverall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        poll_count: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        created_fix_task_count: Option<u32>,
    },

    #[serde(rename = "terminal.outcome", rename_all = "camelCase")]
    TerminalOutcome {
        outcome: OutcomeKind,
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent_status: Option<AgentRecordStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
}

impl EventPayload {
    /// The wire tag (`task.lifecycle.start`, `adapter.output`, ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::TaskStart { .. } => "task.lifecycle.start",
            EventPayload::TaskProgress { .. } => "task.lifecycle.progress",
            EventPayload::PhaseUpdate { .. } => "task.lifecycle.phase-update",
            EventPayload::TaskFinish { .. } => "task.lifecycle.finish",
            EventPayload::AdapterOutput { .. } => "adapter.output",
            EventPayload::TesterActivity { .. } => "tester.activity",
            EventPayload::RecoveryActivity { .. } => "recovery.activity",
            EventPayload::PrActivity { .. } => "pr.activity",
            EventPayload::CiActivity { .. } => "ci.activity",
            EventPayload::TerminalOutcome { .. } => "terminal.outcome",
        }
    }

    /// The stage field for activity payloads, if any.
    pub fn stage(&self) -> Option<&str> {
        match self {
            EventPayload::TesterActivity { stage, .. }
            | EventPayload::RecoveryActivity { stage, .. }
            | EventPayload::PrActivity { stage, .. }
            | EventPayload::CiActivity { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

/// One event on the runtime bus: envelope plus payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEvent {
    pub version: u32,
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub source: EventSource,
    #[serde(default)]
    pub context: EventContext,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl RuntimeEvent {
    /// Build an event stamped with the current wall clock and a fresh UUID.
    pub fn now(source: EventSource, context: EventContext, payload: EventPayload) -> Self {
        Self {
            version: EVENT_VERSION,
            event_id: EventId::new(uuid::Uuid::new_v4().to_string()),
            occurred_at: Utc::now(),
            source,
            context,
            payload,
        }
    }

    /// Build an event with explicit id and timestamp (deterministic tests).
    pub fn at(
        event_id: EventId,
        occurred_at: DateTime<Utc>,
        source: EventSource,
        context: EventContext,
        payload: EventPayload,
    ) -> Self {
        Self {
            version: EVENT_VERSION,
            event_id,
            occurred_at,
            source,
            context,
            payload,
        }
    }

    /// Type-specific notification key used for Telegram duplicate
    /// suppression. Two events with equal keys describe the same fact.
    pub fn notification_key(&self) -> String {
        let ctx = &self.context;
        let phase = ctx.phase_id.as_ref().map(|p| p.as_str()).unwrap_or("");
        let task = ctx.task_id.as_ref().map(|t| t.as_str()).unwrap_or("");
        let agent = ctx.agent_id.as_ref().map(|a| a.as_str()).unwrap_or("");
        match &self.payload {
            EventPayload::TaskStart {
                assignee, resume, ..
            } => {
                format!("task.lifecycle.start|{}|{}|{}", task, assignee, resume)
            }
            EventPayload::TaskProgress { message } => {
                format!("task.lifecycle.progress|{}|{}", task, message)
            }
            EventPayload::PhaseUpdate { status, .. } => {
                format!("task.lifecycle.phase-update|{}|{}", phase, status)
            }
            EventPayload::TaskFinish { status, message } => {
                format!("task.lifecycle.finish|{}|{}|{}", task, status, message)
            }
            EventPayload::AdapterOutput { stream, line, .. } => {
                format!("adapter.output|{}|{}|{}", agent, stream, line)
            }
            EventPayload::TesterActivity {
                stage,
                summary,
                attempt_number,
                category,
            } => format!(
                "tester.activity|{}|{}|{}|{}|{}|{}",
                phase,
                task,
                stage,
                attempt_number.map(|n| n.to_string()).unwrap_or_default(),
                category.map(|c| c.to_string()).unwrap_or_default(),
                summary
            ),
            EventPayload::RecoveryActivity {
                stage,
                summary,
                attempt_number,
                category,
            } => format!(
                "recovery.activity|{}|{}|{}|{}|{}|{}",
                phase,
                task,
                stage,
                attempt_number.map(|n| n.to_string()).unwrap_or_default(),
                category.map(|c| c.to_string()).unwrap_or_default(),
                summary
            ),
            EventPayload::PrActivity {
                stage,
                summary,
                pr_url,
                ..
            } => format!(
                "pr.activity|{}|{}|{}|{}",
                phase,
                stage,
                pr_url.as_deref().unwrap_or(""),
                summary
            ),
            EventPayload::CiActivity {
                stage,
                summary,
                overall,
                poll_count,
                ..
            } => format!(
                "ci.activity|{}|{}|{}|{}|{}",
                phase,
                stage,
                overall.map(|o| o.to_string()).unwrap_or_default(),
                poll_count.map(|n| n.to_string()).unwrap_or_default(),
                summary
            ),
            EventPayload::TerminalOutcome {
                outcome, summary, ..
            } => format!("terminal.outcome|{}|{}|{}", agent, outcome, summary),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
