// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exception recovery policy.
//!
//! Classifies a failed dispatch into an `ExceptionCategory` and applies
//! the category-specific remediation: residual worktree changes are staged
//! and committed, staged-but-uncommitted changes are committed, and an
//! adapter failure earns exactly one re-dispatch. Every attempt produces a
//! strict `RecoveryResult`; the caller records it and decides whether to
//! re-attempt the task.

use ixado_adapters::GitAdapter;
use ixado_core::{ExceptionCategory, RecoveryResult};

/// Classify a failed dispatch from its observable symptoms.
///
/// `timed_out` and non-zero exits are adapter failures. Worktree
/// inspection refines the rest: adapters that did the work but never
/// committed leave staged or dirty files behind.
pub fn classify_failure(
    timed_out: bool,
    exit_code: Option<i32>,
    error_logs: &str,
) -> ExceptionCategory {
    if timed_out {
        return ExceptionCategory::AgentFailure;
    }
    let lowered = error_logs.to_ascii_lowercase();
    if lowered.contains("uncommitted changes") || lowered.contains("dirty worktree") {
        return ExceptionCategory::DirtyWorktree;
    }
    if lowered.contains("changes staged") || lowered.contains("nothing committed") {
        return ExceptionCategory::MissingCommit;
    }
    match exit_code {
        Some(0) => ExceptionCategory::Unknown,
        _ => ExceptionCategory::AgentFailure,
    }
}

/// Category-specific remediation, bounded by `maxAttempts`.
#[derive(Clone)]
pub struct RecoveryPolicy<G: GitAdapter> {
    git: G,
    max_attempts: u32,
}

impl<G: GitAdapter> RecoveryPolicy<G> {
    pub fn new(git: G, max_attempts: u32) -> Self {
        Self { git, max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run one remediation attempt for `category`.
    ///
    /// `attempt_number` is 1-based; attempts past `max_attempts` are
    /// refused as unfixable without touching the worktree.
    pub async fn remediate(
        &self,
        category: ExceptionCategory,
        attempt_number: u32,
    ) -> RecoveryResult {
        if attempt_number > self.max_attempts {
            return RecoveryResult::unfixable(format!(
                "recovery budget exhausted ({} attempts allowed)",
                self.max_attempts
            ));
        }
        match category {
            ExceptionCategory::DirtyWorktree => self.commit_residuals().await,
            ExceptionCategory::MissingCommit => self.commit_staged().await,
            ExceptionCategory::AgentFailure => {
                if attempt_number == 1 {
                    RecoveryResult::fixed(
                        "re-dispatching the same adapter once after a subprocess failure",
                    )
                } else {
                    RecoveryResult::unfixable(
                        "adapter failed again after its single re-dispatch",
                    )
                }
            }
            ExceptionCategory::Unknown => {
                RecoveryResult::unfixable("no remediation for UNKNOWN failures")
            }
        }
    }

    /// DIRTY_WORKTREE: stage everything and commit the residuals.
    async fn commit_residuals(&self) -> RecoveryResult {
        if let Err(e) = self.git.add_all().await {
            return RecoveryResult::unfixable(format!("git add --all failed: {e}"));
        }
        let status = match self.git.staged_status().await {
            Ok(status) => status,
            Err(e) => {
                return RecoveryResult::unfixable(format!("git diff --cached failed: {e}"))
            }
        };
        if !status.has_staged_changes() {
            return RecoveryResult::fixed("worktree was already clean");
        }
        match self.git.commit("chore: commit residual worktree changes").await {
            Ok(()) => RecoveryResult {
                files_touched: Some(status.staged_files.clone()),
                ..RecoveryResult::fixed("staged and committed residual changes")
                    .with_actions(vec![
                        "git add --all".to_string(),
                        "git commit -m \"chore: commit residual worktree changes\"".to_string(),
                    ])
            },
            Err(e) => RecoveryResult::unfixable(format!("git commit failed: {e}")),
        }
    }

    /// MISSING_COMMIT: commit what is already staged.
    async fn commit_staged(&self) -> RecoveryResult {
        let status = match self.git.staged_status().await {
            Ok(status) => status,
            Err(e) => {
                return RecoveryResult::unfixable(format!("git diff --cached failed: {e}"))
            }
        };
        if !status.has_staged_changes() {
            return RecoveryResult::unfixable("nothing is staged; no commit to repair");
        }
        match self.git.commit("chore: commit staged task changes").await {
            Ok(()) => RecoveryResult {
                files_touched: Some(status.staged_files.clone()),
                ..RecoveryResult::fixed("committed staged changes").with_actions(vec![
                    "git commit -m \"chore: commit staged task changes\"".to_string(),
                ])
            },
            Err(e) => RecoveryResult::unfixable(format!("git commit failed: {e}")),
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
