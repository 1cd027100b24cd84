// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI event consumer.
//!
//! Subscribes to the runtime bus and prints one deterministic line per
//! event. Diagnostic marker lines are replaced by their human summary.

use ixado_core::{EventPayload, RuntimeEvent};
use ixado_engine::{parse_marker_line, RuntimeBus};

/// Format one event as the CLI line.
pub fn format_cli(event: &RuntimeEvent) -> String {
    let time = event.occurred_at.format("%H:%M:%S");
    let label = event.context.label();
    let prefix = if label.is_empty() {
        format!("{time} ")
    } else {
        format!("{time} [{label}] ")
    };
    let body = match &event.payload {
        EventPayload::TaskStart {
            assignee, resume, ..
        } => {
            if *resume {
                format!("resuming on {assignee}")
            } else {
                format!("starting on {assignee}")
            }
        }
        EventPayload::TaskProgress { message } => message.clone(),
        EventPayload::PhaseUpdate { status, message } => match message {
            Some(m) => format!("phase → {status} ({m})"),
            None => format!("phase → {status}"),
        },
        EventPayload::TaskFinish { status, message } => format!("{status}: {message}"),
        EventPayload::AdapterOutput { stream, line, .. } => {
            // Marker lines read better as their parsed summary.
            match parse_marker_line(line) {
                Some(diagnostic) => diagnostic.summary(),
                None => format!("{stream} | {line}"),
            }
        }
        EventPayload::TesterActivity { stage, summary, .. } => {
            format!("tester {stage}: {summary}")
        }
        EventPayload::RecoveryActivity {
            stage,
            summary,
            attempt_number,
            ..
        } => match attempt_number {
            Some(n) => format!("recovery {stage} (attempt {n}): {summary}"),
            None => format!("recovery {stage}: {summary}"),
        },
        EventPayload::PrActivity { stage, summary, .. } => format!("pr {stage}: {summary}"),
        EventPayload::CiActivity { stage, summary, .. } => format!("ci {stage}: {summary}"),
        EventPayload::TerminalOutcome {
            outcome,
            summary,
            exit_code,
            ..
        } => match exit_code {
            Some(code) => format!("{outcome} (exit {code}): {summary}"),
            None => format!("{outcome}: {summary}"),
        },
    };
    format!("{prefix}{body}")
}

/// Print bus events to stdout until the bus closes.
///
/// The printed stream is presentation only; the bus events themselves are
/// the authoritative record.
pub fn spawn_printer(bus: &RuntimeBus) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => println!("{}", format_cli(&event)),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
