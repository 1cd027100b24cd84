// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coding-CLI adapter identifiers.
//!
//! An adapter is an external coding-CLI binary (Codex, Claude, Gemini, or
//! the deterministic mock) invoked as a subprocess to perform a task. The
//! wire form is the SCREAMING_SNAKE name used across the state file, the
//! agent registry, and the HTTP API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a coding-CLI adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterId {
    CodexCli,
    ClaudeCli,
    GeminiCli,
    MockCli,
}

impl AdapterId {
    /// All known adapters, in catalog order.
    pub const ALL: [AdapterId; 4] = [
        AdapterId::CodexCli,
        AdapterId::ClaudeCli,
        AdapterId::GeminiCli,
        AdapterId::MockCli,
    ];

    /// Wire name (`CODEX_CLI`, `CLAUDE_CLI`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterId::CodexCli => "CODEX_CLI",
            AdapterId::ClaudeCli => "CLAUDE_CLI",
            AdapterId::GeminiCli => "GEMINI_CLI",
            AdapterId::MockCli => "MOCK_CLI",
        }
    }

    /// Parse a wire name, returning `None` for unknown values.
    ///
    /// Registry deserialization uses this to drop unknown adapter IDs while
    /// keeping the enclosing record.
    pub fn parse_lenient(s: &str) -> Option<AdapterId> {
        match s {
            "CODEX_CLI" => Some(AdapterId::CodexCli),
            "CLAUDE_CLI" => Some(AdapterId::ClaudeCli),
            "GEMINI_CLI" => Some(AdapterId::GeminiCli),
            "MOCK_CLI" => Some(AdapterId::MockCli),
            _ => None,
        }
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AdapterId {
    type Err = UnknownAdapterId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdapterId::parse_lenient(s).ok_or_else(|| UnknownAdapterId(s.to_string()))
    }
}

/// Error for strict adapter-ID parsing (HTTP bodies, CLI args).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown adapter id: {0}")]
pub struct UnknownAdapterId(pub String);

impl Serialize for AdapterId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AdapterId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AdapterId::parse_lenient(&s).ok_or_else(|| {
            serde::de::Error::unknown_variant(
                &s,
                &["CODEX_CLI", "CLAUDE_CLI", "GEMINI_CLI", "MOCK_CLI"],
            )
        })
    }
}

/// Deserialize an `Option<AdapterId>` tolerantly: unknown values become
/// `None` instead of failing the record.
pub fn deserialize_adapter_id_lenient<'de, D>(
    deserializer: D,
) -> Result<Option<AdapterId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(AdapterId::parse_lenient))
}

/// Task assignee: a concrete adapter or unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assignee {
    Adapter(AdapterId),
    #[default]
    Unassigned,
}

impl Assignee {
    pub fn as_str(&self) -> &'static str {
        match self {
            Assignee::Adapter(id) => id.as_str(),
            Assignee::Unassigned => "UNASSIGNED",
        }
    }

    /// The adapter behind this assignee, if any.
    pub fn adapter(&self) -> Option<AdapterId> {
        match self {
            Assignee::Adapter(id) => Some(*id),
            Assignee::Unassigned => None,
        }
    }
}

impl From<AdapterId> for Assignee {
    fn from(id: AdapterId) -> Self {
        Assignee::Adapter(id)
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Assignee {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Assignee {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "UNASSIGNED" {
            return Ok(Assignee::Unassigned);
        }
        AdapterId::parse_lenient(&s)
            .map(Assignee::Adapter)
            .ok_or_else(|| {
                serde::de::Error::unknown_variant(
                    &s,
                    &[
                        "CODEX_CLI",
                        "CLAUDE_CLI",
                        "GEMINI_CLI",
                        "MOCK_CLI",
                        "UNASSIGNED",
                    ],
                )
            })
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
