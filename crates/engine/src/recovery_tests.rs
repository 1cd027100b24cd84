// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ixado_adapters::FakeGit;
use ixado_core::RecoveryStatus;

#[yare::parameterized(
    timeout      = { true,  Some(1), "",                        ExceptionCategory::AgentFailure },
    nonzero_exit = { false, Some(2), "compile error",           ExceptionCategory::AgentFailure },
    signal       = { false, None,    "",                        ExceptionCategory::AgentFailure },
    dirty        = { false, Some(1), "error: uncommitted changes in worktree", ExceptionCategory::DirtyWorktree },
    missing      = { false, Some(1), "changes staged but nothing committed",   ExceptionCategory::MissingCommit },
    clean_exit   = { false, Some(0), "",                        ExceptionCategory::Unknown },
)]
fn classification(timed_out: bool, exit_code: Option<i32>, logs: &str, expected: ExceptionCategory) {
    assert_eq!(classify_failure(timed_out, exit_code, logs), expected);
}

#[tokio::test]
async fn dirty_worktree_stages_and_commits() {
    let git = FakeGit::new("feature/p1");
    let policy = RecoveryPolicy::new(git.clone(), 1);

    // add_all in the fake does not stage by itself; pre-stage to simulate
    // residual changes becoming staged.
    git.stage(&["src/lib.rs"]);
    let result = policy
        .remediate(ExceptionCategory::DirtyWorktree, 1)
        .await;

    assert_eq!(result.status, RecoveryStatus::Fixed);
    assert_eq!(git.add_all_calls(), 1);
    assert_eq!(
        git.commits(),
        vec!["chore: commit residual worktree changes".to_string()]
    );
    assert_eq!(
        result.files_touched,
        Some(vec!["src/lib.rs".to_string()])
    );
    assert!(result.actions_taken.is_some());
}

#[tokio::test]
async fn dirty_worktree_with_clean_tree_is_fixed_without_commit() {
    let git = FakeGit::new("feature/p1");
    let policy = RecoveryPolicy::new(git.clone(), 1);
    let result = policy
        .remediate(ExceptionCategory::DirtyWorktree, 1)
        .await;
    assert!(result.is_fixed());
    assert!(git.commits().is_empty());
}

#[tokio::test]
async fn missing_commit_commits_staged_changes() {
    let git = FakeGit::new("feature/p1");
    git.stage(&["src/parser.rs"]);
    let policy = RecoveryPolicy::new(git.clone(), 1);

    let result = policy
        .remediate(ExceptionCategory::MissingCommit, 1)
        .await;
    assert!(result.is_fixed());
    assert_eq!(
        git.commits(),
        vec!["chore: commit staged task changes".to_string()]
    );
}

#[tokio::test]
async fn missing_commit_with_nothing_staged_is_unfixable() {
    let git = FakeGit::new("feature/p1");
    let policy = RecoveryPolicy::new(git, 1);
    let result = policy
        .remediate(ExceptionCategory::MissingCommit, 1)
        .await;
    assert_eq!(result.status, RecoveryStatus::Unfixable);
}

#[tokio::test]
async fn agent_failure_allows_one_redispatch() {
    let git = FakeGit::new("feature/p1");
    let policy = RecoveryPolicy::new(git, 3);

    let first = policy
        .remediate(ExceptionCategory::AgentFailure, 1)
        .await;
    assert!(first.is_fixed());

    let second = policy
        .remediate(ExceptionCategory::AgentFailure, 2)
        .await;
    assert_eq!(second.status, RecoveryStatus::Unfixable);
}

#[tokio::test]
async fn unknown_is_always_unfixable() {
    let git = FakeGit::new("feature/p1");
    let policy = RecoveryPolicy::new(git, 5);
    let result = policy.remediate(ExceptionCategory::Unknown, 1).await;
    assert_eq!(result.status, RecoveryStatus::Unfixable);
}

#[tokio::test]
async fn attempts_past_the_budget_are_refused() {
    let git = FakeGit::new("feature/p1");
    git.stage(&["a.rs"]);
    let policy = RecoveryPolicy::new(git.clone(), 1);

    let result = policy
        .remediate(ExceptionCategory::DirtyWorktree, 2)
        .await;
    assert_eq!(result.status, RecoveryStatus::Unfixable);
    assert!(result.reasoning.contains("budget"));
    // The worktree is untouched.
    assert!(git.commits().is_empty());
}
