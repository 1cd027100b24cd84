// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O
//!
//! Everything the orchestration kernel hands off to the outside world lives
//! here: the coding-CLI adapter catalog, subprocess helpers, whitelisted
//! `git`/`gh` invocations, CI side-effect probes, and the notify sinks.

pub mod catalog;
pub mod gh;
pub mod git;
pub mod notify;
pub mod probe;
pub mod subprocess;

pub use catalog::{AdapterCatalog, AdapterInvocation};
pub use gh::{CiCheck, CiStatusReading, CreatedPr, GhAdapter, GhError, SystemGh};
pub use git::{GitAdapter, GitError, SystemGit, WorktreeStatus};
pub use notify::{NoOpNotifySink, NotifyError, NotifySink, TelegramSink};
pub use probe::{
    run_ci_probes, CiProbeReport, EnvironmentFingerprint, ProbeFailureKind, ProbeOutcome,
    ProbeResult,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use gh::FakeGh;
#[cfg(any(test, feature = "test-support"))]
pub use git::FakeGit;
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifySink, NotifyCall};
