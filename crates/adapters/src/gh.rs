// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whitelisted `gh` invocations.
//!
//! The kernel issues `gh --version`, `gh auth status`, `gh pr create`,
//! `gh pr view` and `gh run list` — nothing else. CI polling parses the
//! JSON check summary from `gh pr view`.

use crate::subprocess::{error_text, run_with_timeout, stdout_trimmed, GH_COMMAND_TIMEOUT};
use async_trait::async_trait;
use ixado_core::CiOverall;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;

/// Errors from gh operations.
#[derive(Debug, Clone, Error)]
pub enum GhError {
    #[error("gh is not installed: {0}")]
    MissingBinary(String),
    #[error("gh {command}: {message}")]
    CommandFailed { command: String, message: String },
    #[error("gh produced unparseable output: {0}")]
    Unparseable(String),
}

/// One CI check observed on the PR.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CiCheck {
    pub name: String,
    #[serde(default)]
    pub conclusion: String,
    #[serde(default)]
    pub summary: String,
}

/// One polling observation of the PR's CI state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiStatusReading {
    pub overall: CiOverall,
    pub checks: Vec<CiCheck>,
}

impl CiStatusReading {
    /// Checks that concluded unsuccessfully, in PR order.
    pub fn failed_checks(&self) -> Vec<&CiCheck> {
        self.checks
            .iter()
            .filter(|c| {
                matches!(
                    c.conclusion.to_ascii_uppercase().as_str(),
                    "FAILURE" | "CANCELLED" | "TIMED_OUT" | "ACTION_REQUIRED"
                )
            })
            .collect()
    }
}

/// A freshly created pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPr {
    pub url: String,
    pub number: Option<u64>,
}

/// Boundary trait over the whitelisted gh surface.
#[async_trait]
pub trait GhAdapter: Clone + Send + Sync + 'static {
    /// `gh --version` — first line.
    async fn version(&self) -> Result<String, GhError>;

    /// `gh auth status` — returns the authenticated login when available.
    async fn auth_status(&self) -> Result<Option<String>, GhError>;

    /// `gh pr create --title .. --body .. --head <branch>`
    async fn pr_create(
        &self,
        title: &str,
        body: &str,
        branch: &str,
    ) -> Result<CreatedPr, GhError>;

    /// `gh pr view <branch> --json statusCheckRollup`
    async fn ci_status(&self, branch: &str) -> Result<CiStatusReading, GhError>;
}

/// Real gh client running in a fixed working directory.
#[derive(Debug, Clone)]
pub struct SystemGh {
    cwd: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RollupEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrView {
    #[serde(default)]
    status_check_rollup: Vec<RollupEntry>,
}

/// Fold per-check conclusions into one aggregate reading.
pub fn fold_overall(checks: &[CiCheck]) -> CiOverall {
    if checks.is_empty() {
        return CiOverall::Pending;
    }
    let mut saw_pending = false;
    let mut saw_failure = false;
    for check in checks {
        match check.conclusion.to_ascii_uppercase().as_str() {
            "SUCCESS" | "NEUTRAL" | "SKIPPED" => {}
            "FAILURE" | "CANCELLED" | "TIMED_OUT" | "ACTION_REQUIRED" => saw_failure = true,
            _ => saw_pending = true,
        }
    }
    if saw_failure {
        CiOverall::Failure
    } else if saw_pending {
        CiOverall::Pending
    } else {
        CiOverall::Success
    }
}

impl SystemGh {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<String, GhError> {
        let label = args.join(" ");
        let mut cmd = Command::new("gh");
        cmd.args(args).current_dir(&self.cwd);
        let output = run_with_timeout(cmd, GH_COMMAND_TIMEOUT, "gh")
            .await
            .map_err(GhError::MissingBinary)?;
        if !output.status.success() {
            return Err(GhError::CommandFailed {
                command: label,
                message: error_text(&output),
            });
        }
        Ok(stdout_trimmed(&output))
    }
}

#[async_trait]
impl GhAdapter for SystemGh {
    async fn version(&self) -> Result<String, GhError> {
        let out = self.run(&["--version"]).await?;
        Ok(out.lines().next().unwrap_or_default().to_string())
    }

    async fn auth_status(&self) -> Result<Option<String>, GhError> {
        let out = self.run(&["auth", "status"]).await?;
        // `gh auth status` prints "Logged in to github.com account <login>".
        let login = out.lines().find_map(|line| {
            let mut words = line.trim().split_whitespace();
            while let Some(word) = words.next() {
                if word == "account" {
                    return words
                        .next()
                        .map(|login| login.trim_matches(['(', ')']).to_string());
                }
            }
            None
        });
        Ok(login)
    }

    async fn pr_create(
        &self,
        title: &str,
        body: &str,
        branch: &str,
    ) -> Result<CreatedPr, GhError> {
        let url = self
            .run(&["pr", "create", "--title", title, "--body", body, "--head", branch])
            .await?;
        let url = url
            .lines()
            .rev()
            .find(|l| l.starts_with("http"))
            .unwrap_or(&url)
            .to_string();
        let number = url
            .rsplit('/')
            .next()
            .and_then(|n| n.parse::<u64>().ok());
        Ok(CreatedPr { url, number })
    }

    async fn ci_status(&self, branch: &str) -> Result<CiStatusReading, GhError> {
        let out = self
            .run(&["pr", "view", branch, "--json", "statusCheckRollup"])
            .await?;
        let view: PrView =
            serde_json::from_str(&out).map_err(|e| GhError::Unparseable(e.to_string()))?;
        let checks: Vec<CiCheck> = view
            .status_check_rollup
            .into_iter()
            .map(|entry| CiCheck {
                name: entry
                    .name
                    .or(entry.context)
                    .unwrap_or_else(|| "unnamed check".to_string()),
                conclusion: entry
                    .conclusion
                    .or(entry.state)
                    .unwrap_or_default(),
                summary: String::new(),
            })
            .collect();
        let overall = fold_overall(&checks);
        Ok(CiStatusReading { overall, checks })
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scriptable gh for engine tests: readings are served in order, the
    /// last one repeating once the script is exhausted.
    #[derive(Clone, Default)]
    pub struct FakeGh {
        inner: Arc<Mutex<FakeGhState>>,
    }

    #[derive(Default)]
    struct FakeGhState {
        readings: VecDeque<CiStatusReading>,
        last: Option<CiStatusReading>,
        created: Vec<(String, String)>,
        auth_login: Option<String>,
        fail_auth: bool,
        missing_binary: bool,
    }

    impl FakeGh {
        pub fn new() -> Self {
            let fake = Self::default();
            fake.inner.lock().auth_login = Some("dev".to_string());
            fake
        }

        pub fn push_reading(&self, reading: CiStatusReading) {
            self.inner.lock().readings.push_back(reading);
        }

        pub fn push_overall(&self, overall: CiOverall) {
            self.push_reading(CiStatusReading {
                overall,
                checks: Vec::new(),
            });
        }

        pub fn fail_auth(&self) {
            self.inner.lock().fail_auth = true;
        }

        pub fn go_missing(&self) {
            self.inner.lock().missing_binary = true;
        }

        pub fn created_prs(&self) -> Vec<(String, String)> {
            self.inner.lock().created.clone()
        }
    }

    #[async_trait]
    impl GhAdapter for FakeGh {
        async fn version(&self) -> Result<String, GhError> {
            if self.inner.lock().missing_binary {
                return Err(GhError::MissingBinary("gh: command not found".to_string()));
            }
            Ok("gh version 2.62.0".to_string())
        }

        async fn auth_status(&self) -> Result<Option<String>, GhError> {
            let state = self.inner.lock();
            if state.missing_binary {
                return Err(GhError::MissingBinary("gh: command not found".to_string()));
            }
            if state.fail_auth {
                return Err(GhError::CommandFailed {
                    command: "auth status".to_string(),
                    message: "You are not logged into any GitHub hosts".to_string(),
                });
            }
            Ok(state.auth_login.clone())
        }

        async fn pr_create(
            &self,
            title: &str,
            _body: &str,
            branch: &str,
        ) -> Result<CreatedPr, GhError> {
            let mut state = self.inner.lock();
            state.created.push((title.to_string(), branch.to_string()));
            let number = state.created.len() as u64;
            Ok(CreatedPr {
                url: format!("https://github.com/demo/repo/pull/{number}"),
                number: Some(number),
            })
        }

        async fn ci_status(&self, _branch: &str) -> Result<CiStatusReading, GhError> {
            let mut state = self.inner.lock();
            if let Some(reading) = state.readings.pop_front() {
                state.last = Some(reading.clone());
                return Ok(reading);
            }
            state.last.clone().ok_or_else(|| GhError::CommandFailed {
                command: "pr view".to_string(),
                message: "no scripted reading".to_string(),
            })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeGh;

#[cfg(test)]
#[path = "gh_tests.rs"]
mod tests;
