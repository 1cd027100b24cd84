// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent runtime diagnostic marker lines.
//!
//! The supervisor emits heartbeat and idle diagnostics as single stdout
//! lines with the literal prefix `[ixado][agent-runtime] ` followed by a
//! JSON payload carrying the marker field `ixado.agent.runtime`. Spawned
//! CLIs may print the same format themselves; consumers parse the prefix
//! to surface human-readable summaries. This marker line is the only
//! stdout format the orchestrator parses for semantics.

use ixado_core::{format_elapsed_long_ms, format_elapsed_ms};
use serde::{Deserialize, Serialize};

/// Literal line prefix for diagnostic markers.
pub const AGENT_RUNTIME_PREFIX: &str = "[ixado][agent-runtime] ";

/// Marker field value identifying the payload.
pub const AGENT_RUNTIME_MARKER: &str = "ixado.agent.runtime";

/// A parsed diagnostic payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AgentDiagnostic {
    /// Periodic liveness signal
    #[serde(rename_all = "camelCase")]
    Heartbeat { elapsed_ms: u64, idle_ms: u64 },
    /// Output has been silent past the idle threshold
    #[serde(rename_all = "camelCase", rename = "idle-diagnostic")]
    IdleDiagnostic {
        elapsed_ms: u64,
        idle_ms: u64,
        idle_threshold_ms: u64,
    },
}

#[derive(Serialize, Deserialize)]
struct MarkerEnvelope {
    marker: String,
    #[serde(flatten)]
    diagnostic: AgentDiagnostic,
}

impl AgentDiagnostic {
    /// Human-readable summary consumers surface for this diagnostic.
    pub fn summary(&self) -> String {
        match self {
            AgentDiagnostic::Heartbeat {
                elapsed_ms,
                idle_ms,
            } => format!(
                "Heartbeat: elapsed {}, idle {}.",
                format_elapsed_long_ms(*elapsed_ms),
                format_elapsed_ms(*idle_ms)
            ),
            AgentDiagnostic::IdleDiagnostic {
                elapsed_ms,
                idle_ms,
                ..
            } => format!(
                "Idle {} (elapsed {}).",
                format_elapsed_ms(*idle_ms),
                format_elapsed_long_ms(*elapsed_ms)
            ),
        }
    }
}

/// Serialize a diagnostic as the full marker line.
pub fn format_marker_line(diagnostic: AgentDiagnostic) -> String {
    let envelope = MarkerEnvelope {
        marker: AGENT_RUNTIME_MARKER.to_string(),
        diagnostic,
    };
    // Serialization of this closed shape cannot fail.
    let json = serde_json::to_string(&envelope).unwrap_or_default();
    format!("{AGENT_RUNTIME_PREFIX}{json}")
}

/// Parse a stdout line as a diagnostic marker.
///
/// Returns `None` for ordinary output, lines with the prefix but broken
/// JSON, and payloads carrying a different marker field.
pub fn parse_marker_line(line: &str) -> Option<AgentDiagnostic> {
    let json = line.strip_prefix(AGENT_RUNTIME_PREFIX)?;
    let envelope: MarkerEnvelope = serde_json::from_str(json).ok()?;
    (envelope.marker == AGENT_RUNTIME_MARKER).then_some(envelope.diagnostic)
}

#[cfg(test)]
#[path = "diagnostics_tests.rs"]
mod tests;
