// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-interaction chatter filter.
//!
//! Coding CLIs narrate their tool usage line by line (`Read src/lib.rs`,
//! `Bash(cargo check)`, bare file paths). Those lines are suppressed from
//! the live log stream unless they carry a terminal-context keyword or the
//! literal `[ixado][` system prefix.

use regex::Regex;
use std::sync::OnceLock;

#[allow(clippy::unwrap_used)]
fn chatter_verb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // A tool verb followed by a path-ish argument or a call-paren.
        Regex::new(
            r"^\s*(Read|Write|Edit|List|Bash|Grep|Glob|Create|Delete|Run)\b\s*(\(|\S*[/\\.]\S*)",
        )
        .unwrap()
    })
}

#[allow(clippy::unwrap_used)]
fn bare_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // A standalone file path: no spaces, at least one separator or a
        // dotted file name, optionally suffixed with :line:col.
        Regex::new(r"^\s*[\w.-]*(/[\w.-]+)+(:\d+(:\d+)?)?\s*$|^\s*[\w-]+\.\w{1,8}(:\d+(:\d+)?)?\s*$")
            .unwrap()
    })
}

#[allow(clippy::unwrap_used)]
fn terminal_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)error|failed|exception|timeout|exit code|unauthorized|denied|panic")
            .unwrap()
    })
}

/// Whether a line is low-signal file-interaction narration.
pub fn is_file_interaction_chatter(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    chatter_verb_re().is_match(trimmed) || bare_path_re().is_match(trimmed)
}

/// Whether a line carries a terminal-context keyword (`error`, `failed`,
/// `timeout`, `exit code`, ...).
pub fn contains_terminal_keywords(line: &str) -> bool {
    terminal_keyword_re().is_match(line)
}

/// The stream-level decision: suppress chatter unless it looks terminal
/// or is an orchestrator system line.
pub fn should_suppress(line: &str) -> bool {
    is_file_interaction_chatter(line)
        && !contains_terminal_keywords(line)
        && !line.starts_with("[ixado][")
}

#[cfg(test)]
#[path = "chatter_tests.rs"]
mod tests;
