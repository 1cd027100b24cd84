// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whitelisted `git` invocations.
//!
//! The orchestration kernel only ever issues the commands listed here:
//! `add --all`, `diff --cached --name-only`, `commit -m`,
//! `branch --show-current`, `push -u origin <branch>`,
//! `remote get-url origin`, `ls-remote <url>`, `checkout [-b]`, and
//! `config user.{name,email}`.

use crate::subprocess::{error_text, run_with_timeout, stdout_trimmed, GIT_COMMAND_TIMEOUT};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;

/// Errors from git operations.
#[derive(Debug, Clone, Error)]
#[error("git {command}: {message}")]
pub struct GitError {
    pub command: String,
    pub message: String,
}

impl GitError {
    fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Staged-changes summary used by recovery and PR creation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorktreeStatus {
    /// Paths reported by `git diff --cached --name-only`
    pub staged_files: Vec<String>,
}

impl WorktreeStatus {
    pub fn has_staged_changes(&self) -> bool {
        !self.staged_files.is_empty()
    }
}

/// Boundary trait over the whitelisted git surface.
#[async_trait]
pub trait GitAdapter: Clone + Send + Sync + 'static {
    /// `git add --all`
    async fn add_all(&self) -> Result<(), GitError>;

    /// `git diff --cached --name-only`
    async fn staged_status(&self) -> Result<WorktreeStatus, GitError>;

    /// `git commit -m <message>`
    async fn commit(&self, message: &str) -> Result<(), GitError>;

    /// `git branch --show-current`
    async fn current_branch(&self) -> Result<String, GitError>;

    /// `git checkout <branch>` (with `-b` when `create`)
    async fn checkout(&self, branch: &str, create: bool) -> Result<(), GitError>;

    /// `git push -u origin <branch>`
    async fn push_upstream(&self, branch: &str) -> Result<(), GitError>;

    /// `git remote get-url origin`
    async fn remote_url(&self) -> Result<String, GitError>;

    /// `git ls-remote <url>` — network reachability check
    async fn ls_remote(&self, url: &str) -> Result<(), GitError>;

    /// `git config user.name` / `git config user.email`
    async fn identity(&self) -> Result<(Option<String>, Option<String>), GitError>;
}

/// Real git client running in a fixed working directory.
#[derive(Debug, Clone)]
pub struct SystemGit {
    cwd: PathBuf,
}

impl SystemGit {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let label = args.join(" ");
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.cwd);
        let output = run_with_timeout(cmd, GIT_COMMAND_TIMEOUT, "git")
            .await
            .map_err(|e| GitError::new(label.clone(), e))?;
        if !output.status.success() {
            return Err(GitError::new(label, error_text(&output)));
        }
        Ok(stdout_trimmed(&output))
    }

    /// Variant tolerating non-zero exit (git config on unset keys).
    async fn run_optional(&self, args: &[&str]) -> Result<Option<String>, GitError> {
        let label = args.join(" ");
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.cwd);
        let output = run_with_timeout(cmd, GIT_COMMAND_TIMEOUT, "git")
            .await
            .map_err(|e| GitError::new(label, e))?;
        if !output.status.success() {
            return Ok(None);
        }
        let value = stdout_trimmed(&output);
        Ok((!value.is_empty()).then_some(value))
    }
}

#[async_trait]
impl GitAdapter for SystemGit {
    async fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "--all"]).await.map(|_| ())
    }

    async fn staged_status(&self) -> Result<WorktreeStatus, GitError> {
        let out = self.run(&["diff", "--cached", "--name-only"]).await?;
        let staged_files = out
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect();
        Ok(WorktreeStatus { staged_files })
    }

    async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message]).await.map(|_| ())
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        self.run(&["branch", "--show-current"]).await
    }

    async fn checkout(&self, branch: &str, create: bool) -> Result<(), GitError> {
        if create {
            self.run(&["checkout", "-b", branch]).await.map(|_| ())
        } else {
            self.run(&["checkout", branch]).await.map(|_| ())
        }
    }

    async fn push_upstream(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["push", "-u", "origin", branch]).await.map(|_| ())
    }

    async fn remote_url(&self) -> Result<String, GitError> {
        self.run(&["remote", "get-url", "origin"]).await
    }

    async fn ls_remote(&self, url: &str) -> Result<(), GitError> {
        self.run(&["ls-remote", url]).await.map(|_| ())
    }

    async fn identity(&self) -> Result<(Option<String>, Option<String>), GitError> {
        let name = self.run_optional(&["config", "user.name"]).await?;
        let email = self.run_optional(&["config", "user.email"]).await?;
        Ok((name, email))
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Scriptable in-memory git for engine tests.
    #[derive(Clone, Default)]
    pub struct FakeGit {
        inner: Arc<Mutex<FakeGitState>>,
    }

    #[derive(Default)]
    struct FakeGitState {
        current_branch: String,
        branches: HashSet<String>,
        staged: Vec<String>,
        remote_url: Option<String>,
        identity: (Option<String>, Option<String>),
        ls_remote_fails: bool,
        commits: Vec<String>,
        pushes: Vec<String>,
        add_all_calls: u32,
    }

    impl FakeGit {
        pub fn new(current_branch: &str) -> Self {
            let fake = Self::default();
            {
                let mut state = fake.inner.lock();
                state.current_branch = current_branch.to_string();
                state.branches.insert(current_branch.to_string());
                state.remote_url = Some("git@github.com:demo/repo.git".to_string());
                state.identity = (
                    Some("Dev".to_string()),
                    Some("dev@example.com".to_string()),
                );
            }
            fake
        }

        pub fn stage(&self, files: &[&str]) {
            self.inner.lock().staged = files.iter().map(|f| f.to_string()).collect();
        }

        pub fn set_identity(&self, name: Option<&str>, email: Option<&str>) {
            self.inner.lock().identity =
                (name.map(String::from), email.map(String::from));
        }

        pub fn fail_ls_remote(&self) {
            self.inner.lock().ls_remote_fails = true;
        }

        pub fn commits(&self) -> Vec<String> {
            self.inner.lock().commits.clone()
        }

        pub fn pushes(&self) -> Vec<String> {
            self.inner.lock().pushes.clone()
        }

        pub fn add_all_calls(&self) -> u32 {
            self.inner.lock().add_all_calls
        }

        pub fn current_branch_value(&self) -> String {
            self.inner.lock().current_branch.clone()
        }
    }

    #[async_trait]
    impl GitAdapter for FakeGit {
        async fn add_all(&self) -> Result<(), GitError> {
            self.inner.lock().add_all_calls += 1;
            Ok(())
        }

        async fn staged_status(&self) -> Result<WorktreeStatus, GitError> {
            Ok(WorktreeStatus {
                staged_files: self.inner.lock().staged.clone(),
            })
        }

        async fn commit(&self, message: &str) -> Result<(), GitError> {
            let mut state = self.inner.lock();
            state.commits.push(message.to_string());
            state.staged.clear();
            Ok(())
        }

        async fn current_branch(&self) -> Result<String, GitError> {
            Ok(self.inner.lock().current_branch.clone())
        }

        async fn checkout(&self, branch: &str, create: bool) -> Result<(), GitError> {
            let mut state = self.inner.lock();
            if create {
                if !state.branches.insert(branch.to_string()) {
                    return Err(GitError::new(
                        format!("checkout -b {branch}"),
                        "branch already exists",
                    ));
                }
            } else if !state.branches.contains(branch) {
                return Err(GitError::new(
                    format!("checkout {branch}"),
                    "no such branch",
                ));
            }
            state.current_branch = branch.to_string();
            Ok(())
        }

        async fn push_upstream(&self, branch: &str) -> Result<(), GitError> {
            self.inner.lock().pushes.push(branch.to_string());
            Ok(())
        }

        async fn remote_url(&self) -> Result<String, GitError> {
            self.inner
                .lock()
                .remote_url
                .clone()
                .ok_or_else(|| GitError::new("remote get-url origin", "no remote"))
        }

        async fn ls_remote(&self, url: &str) -> Result<(), GitError> {
            if self.inner.lock().ls_remote_fails {
                return Err(GitError::new(
                    format!("ls-remote {url}"),
                    "could not resolve host",
                ));
            }
            Ok(())
        }

        async fn identity(&self) -> Result<(Option<String>, Option<String>), GitError> {
            Ok(self.inner.lock().identity.clone())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeGit;

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
