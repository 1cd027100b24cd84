// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! IxADO execution engine
//!
//! The agent supervisor, the phase runner, the exception-recovery policy,
//! and the control-center façade every surface (CLI, web, Telegram) goes
//! through.

mod bus;
mod diagnostics;
mod error;
mod prompts;
mod recovery;
mod runner;
mod service;
mod supervisor;

pub use bus::RuntimeBus;
pub use diagnostics::{
    format_marker_line, parse_marker_line, AgentDiagnostic, AGENT_RUNTIME_PREFIX,
};
pub use error::{PreflightError, RunnerError, ServiceError};
pub use prompts::{compose_prompt, PromptError};
pub use recovery::{classify_failure, RecoveryPolicy};
pub use runner::{PhaseRunner, ReconcileReport, RunOutcome as PhaseRunOutcome};
pub use service::{ControlCenter, TaskPatch};
pub use supervisor::{
    pid_alive, AgentSupervisor, OnFailure, RunToCompletion, SpawnSpec, SupervisorError,
};
