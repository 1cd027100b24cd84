// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent live log stream.
//!
//! The SSE handler replays the registry tail first, then follows the
//! supervisor's per-agent channel until the agent reaches a terminal
//! state. Every frame wraps the original RuntimeEvent with enrichment:
//! a formatted line, a compact context label, and — on terminal failure —
//! a failure summary plus anchors into the task card and each recovery
//! attempt.

use ixado_core::{
    AgentRecord, EventPayload, OutcomeKind, ProjectState, RuntimeEvent, TaskId,
};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::chatter::should_suppress;

/// Maximum failure-summary length before the `...` suffix.
const FAILURE_SUMMARY_CAP: usize = 140;

/// Anchor into the UI for a recovery attempt or task card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryLink {
    pub label: String,
    pub href: String,
}

/// One SSE frame: the original event plus enrichment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedFrame {
    #[serde(flatten)]
    pub event: RuntimeEvent,
    pub formatted_line: String,
    /// Compact `phase / #n title` label
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recovery_links: Vec<RecoveryLink>,
}

#[allow(clippy::unwrap_used)]
fn failure_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)error|failed|exception|timeout|exit code|unauthorized|denied").unwrap()
    })
}

/// Pick the failure summary from captured output lines.
///
/// First line matching the failure pattern, whitespace compacted, cut at
/// 140 characters with a `...` suffix.
pub fn derive_failure_summary<'a>(lines: impl Iterator<Item = &'a str>) -> Option<String> {
    let line = lines.into_iter().find(|l| failure_line_re().is_match(l))?;
    let compact = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= FAILURE_SUMMARY_CAP {
        return Some(compact);
    }
    let cut: String = compact.chars().take(FAILURE_SUMMARY_CAP).collect();
    Some(format!("{cut}..."))
}

/// Single-line rendering used as `formattedLine` on each frame.
pub fn format_web_line(event: &RuntimeEvent) -> String {
    let label = event.context.label();
    let body = match &event.payload {
        EventPayload::AdapterOutput { stream, line, .. } => format!("[{stream}] {line}"),
        EventPayload::TaskStart { assignee, .. } => format!("task started on {assignee}"),
        EventPayload::TaskProgress { message } => message.clone(),
        EventPayload::PhaseUpdate { status, .. } => format!("phase → {status}"),
        EventPayload::TaskFinish { status, message } => {
            format!("task finished: {status} — {message}")
        }
        EventPayload::TesterActivity { stage, summary, .. } => {
            format!("tester {stage}: {summary}")
        }
        EventPayload::RecoveryActivity { stage, summary, .. } => {
            format!("recovery {stage}: {summary}")
        }
        EventPayload::PrActivity { stage, summary, .. } => format!("PR {stage}: {summary}"),
        EventPayload::CiActivity { stage, summary, .. } => format!("CI {stage}: {summary}"),
        EventPayload::TerminalOutcome {
            outcome, summary, ..
        } => format!("agent {outcome}: {summary}"),
    };
    if label.is_empty() {
        body
    } else {
        format!("[{label}] {body}")
    }
}

/// Links into the task card and each recovery attempt of the given task.
fn recovery_links_for(state: &ProjectState, task_id: &TaskId) -> Vec<RecoveryLink> {
    let Some((_, task)) = state.find_task(task_id) else {
        return Vec::new();
    };
    let mut links = vec![RecoveryLink {
        label: format!("task {}", task.title),
        href: format!("#task-{}", task.id),
    }];
    if let Some(attempts) = &task.recovery_attempts {
        for attempt in attempts {
            links.push(RecoveryLink {
                label: format!(
                    "recovery attempt {} ({})",
                    attempt.attempt_number, attempt.result.status
                ),
                href: format!("#task-{}-recovery-{}", task.id, attempt.attempt_number),
            });
        }
    }
    links
}

/// Wrap one bus event into an SSE frame, or drop it as chatter.
///
/// `record` supplies the output tail for terminal failure summaries;
/// `state` supplies recovery-trace links when the event names a task.
pub fn enrich_event(
    event: &RuntimeEvent,
    record: &AgentRecord,
    state: Option<&ProjectState>,
) -> Option<EnrichedFrame> {
    if let EventPayload::AdapterOutput { line, .. } = &event.payload {
        if should_suppress(line) {
            return None;
        }
    }

    let mut failure_summary = None;
    let mut recovery_links = Vec::new();
    if let EventPayload::TerminalOutcome { outcome, .. } = &event.payload {
        if *outcome == OutcomeKind::Failure {
            failure_summary =
                derive_failure_summary(record.output_tail.iter().map(String::as_str));
            if let (Some(state), Some(task_id)) = (state, event.context.task_id.as_ref()) {
                recovery_links = recovery_links_for(state, task_id);
            }
        }
    }

    Some(EnrichedFrame {
        formatted_line: format_web_line(event),
        context: event.context.label(),
        failure_summary,
        recovery_links,
        event: event.clone(),
    })
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
