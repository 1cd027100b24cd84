// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CI side-effect probes.
//!
//! Before CREATING_PR the runner verifies that the environment can actually
//! perform the side effects CI integration needs: a working `gh` binary, an
//! authenticated session, a git identity, and network reachability to the
//! origin remote. Failures carry a kind and an actionable remediation
//! string, plus an environment fingerprint for bug reports.

use crate::gh::{GhAdapter, GhError};
use crate::git::GitAdapter;
use serde::Serialize;
use std::fmt;

/// Classification of a failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeFailureKind {
    Auth,
    Network,
    MissingBinary,
}

impl fmt::Display for ProbeFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeFailureKind::Auth => "auth",
            ProbeFailureKind::Network => "network",
            ProbeFailureKind::MissingBinary => "missing-binary",
        };
        write!(f, "{}", s)
    }
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeOutcome {
    Ok {
        detail: String,
    },
    Failed {
        kind: ProbeFailureKind,
        message: String,
        remediation: String,
    },
}

/// A named probe with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub name: String,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    pub fn ok(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            outcome: ProbeOutcome::Ok {
                detail: detail.into(),
            },
        }
    }

    pub fn failed(
        name: &str,
        kind: ProbeFailureKind,
        message: impl Into<String>,
        remediation: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            outcome: ProbeOutcome::Failed {
                kind,
                message: message.into(),
                remediation: remediation.to_string(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Ok { .. })
    }
}

/// Environment fingerprint attached to probe envelopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentFingerprint {
    pub gh_version: Option<String>,
    pub gh_user: Option<String>,
    pub git_user_name: Option<String>,
    pub git_user_email: Option<String>,
    pub hostname: Option<String>,
}

/// Envelope summarizing all probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CiProbeReport {
    pub probes: Vec<ProbeResult>,
    pub fingerprint: EnvironmentFingerprint,
}

impl CiProbeReport {
    pub fn all_ok(&self) -> bool {
        self.probes.iter().all(ProbeResult::is_ok)
    }

    /// Failed probes with their remediation strings.
    pub fn missing_side_effects(&self) -> Vec<(String, String)> {
        self.probes
            .iter()
            .filter_map(|p| match &p.outcome {
                ProbeOutcome::Failed { remediation, .. } => {
                    Some((p.name.clone(), remediation.clone()))
                }
                ProbeOutcome::Ok { .. } => None,
            })
            .collect()
    }
}

const REMEDIATION_GH_INSTALL: &str = "install the GitHub CLI: https://cli.github.com";
const REMEDIATION_GH_AUTH: &str = "gh auth login --hostname github.com";
const REMEDIATION_GIT_IDENTITY: &str =
    "git config user.name \"Your Name\" && git config user.email you@example.com";
const REMEDIATION_NETWORK: &str = "check VPN/proxy/firewall for outbound 443";

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
}

/// Run the full probe battery.
pub async fn run_ci_probes<G: GitAdapter, H: GhAdapter>(git: &G, gh: &H) -> CiProbeReport {
    let mut probes = Vec::new();
    let mut fingerprint = EnvironmentFingerprint {
        hostname: hostname(),
        ..Default::default()
    };

    match gh.version().await {
        Ok(version) => {
            fingerprint.gh_version = Some(version.clone());
            probes.push(ProbeResult::ok("gh-version", version));
        }
        Err(e) => {
            probes.push(ProbeResult::failed(
                "gh-version",
                ProbeFailureKind::MissingBinary,
                e.to_string(),
                REMEDIATION_GH_INSTALL,
            ));
        }
    }

    match gh.auth_status().await {
        Ok(login) => {
            fingerprint.gh_user = login.clone();
            probes.push(ProbeResult::ok(
                "gh-auth",
                login.unwrap_or_else(|| "authenticated".to_string()),
            ));
        }
        Err(GhError::MissingBinary(message)) => {
            probes.push(ProbeResult::failed(
                "gh-auth",
                ProbeFailureKind::MissingBinary,
                message,
                REMEDIATION_GH_INSTALL,
            ));
        }
        Err(e) => {
            probes.push(ProbeResult::failed(
                "gh-auth",
                ProbeFailureKind::Auth,
                e.to_string(),
                REMEDIATION_GH_AUTH,
            ));
        }
    }

    match git.identity().await {
        Ok((name, email)) => {
            fingerprint.git_user_name = name.clone();
            fingerprint.git_user_email = email.clone();
            match (name, email) {
                (Some(name), Some(email)) => {
                    probes.push(ProbeResult::ok(
                        "git-identity",
                        format!("{name} <{email}>"),
                    ));
                }
                _ => {
                    probes.push(ProbeResult::failed(
                        "git-identity",
                        ProbeFailureKind::Auth,
                        "git user.name/user.email not configured",
                        REMEDIATION_GIT_IDENTITY,
                    ));
                }
            }
        }
        Err(e) => {
            probes.push(ProbeResult::failed(
                "git-identity",
                ProbeFailureKind::MissingBinary,
                e.to_string(),
                "install git and re-run",
            ));
        }
    }

    match git.remote_url().await {
        Ok(url) => match git.ls_remote(&url).await {
            Ok(()) => probes.push(ProbeResult::ok("origin-reachable", url)),
            Err(e) => probes.push(ProbeResult::failed(
                "origin-reachable",
                ProbeFailureKind::Network,
                e.to_string(),
                REMEDIATION_NETWORK,
            )),
        },
        Err(e) => {
            probes.push(ProbeResult::failed(
                "origin-reachable",
                ProbeFailureKind::Network,
                e.to_string(),
                "add an origin remote: git remote add origin <url>",
            ));
        }
    }

    CiProbeReport {
        probes,
        fingerprint,
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
