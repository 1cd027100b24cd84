// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coding-CLI adapter catalog.
//!
//! Maps each [`AdapterId`] to the command line the supervisor spawns for it.
//! Defaults can be overridden per adapter in settings (`command`, `args`,
//! timeouts). The composed prompt is always appended as the final argument;
//! the mock adapter's shell script ignores it, which keeps mock runs
//! deterministic.

use ixado_core::{AdapterId, Settings};
use std::time::Duration;

/// One ready-to-spawn invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// Kill the adapter when it runs longer than this
    pub timeout: Duration,
    /// Kill the adapter when it stays silent this long after spawn
    pub startup_silence_timeout: Duration,
}

/// Catalog of spawn recipes, seeded from defaults plus settings overrides.
#[derive(Debug, Clone, Default)]
pub struct AdapterCatalog {
    settings: Settings,
}

impl AdapterCatalog {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Default program for an adapter.
    fn default_program(id: AdapterId) -> &'static str {
        match id {
            AdapterId::CodexCli => "codex",
            AdapterId::ClaudeCli => "claude",
            AdapterId::GeminiCli => "gemini",
            AdapterId::MockCli => "/bin/sh",
        }
    }

    /// Default arguments, without the trailing prompt.
    fn default_args(id: AdapterId) -> Vec<String> {
        let args: &[&str] = match id {
            AdapterId::CodexCli => &["exec", "--full-auto"],
            AdapterId::ClaudeCli => &["-p", "--output-format", "text"],
            AdapterId::GeminiCli => &["-p"],
            AdapterId::MockCli => &["-c", "echo done"],
        };
        args.iter().map(|s| s.to_string()).collect()
    }

    /// Build the invocation for `id` with `prompt` appended.
    pub fn invocation(&self, id: AdapterId, prompt: &str) -> AdapterInvocation {
        let overrides = self.settings.adapter(id);
        let program = overrides
            .and_then(|o| o.command.clone())
            .unwrap_or_else(|| Self::default_program(id).to_string());
        let mut args = overrides
            .and_then(|o| o.args.clone())
            .unwrap_or_else(|| Self::default_args(id));
        args.push(prompt.to_string());

        let timeout_ms = overrides.map(|o| o.timeout_ms).unwrap_or(3_600_000);
        let silence_ms = overrides
            .map(|o| o.startup_silence_timeout_ms)
            .unwrap_or(60_000);

        AdapterInvocation {
            program,
            args,
            timeout: Duration::from_millis(timeout_ms),
            startup_silence_timeout: Duration::from_millis(silence_ms),
        }
    }

    /// Display name used for registry rows (`codex`, `claude`, ...).
    pub fn display_name(id: AdapterId) -> &'static str {
        match id {
            AdapterId::CodexCli => "codex",
            AdapterId::ClaudeCli => "claude",
            AdapterId::GeminiCli => "gemini",
            AdapterId::MockCli => "mock",
        }
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
