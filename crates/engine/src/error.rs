// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use ixado_adapters::{GhError, GitError};
use ixado_storage::{ActivePhaseError, RegistryError, SettingsError, StateError};
use thiserror::Error;

use crate::prompts::PromptError;
use crate::supervisor::SupervisorError;

/// Phase preconditions unmet before dispatch.
///
/// Fatal to the current operation, non-fatal to the process; the message
/// is written for a human to act on.
#[derive(Debug, Error)]
#[error("phase preflight failed: {message}")]
pub struct PreflightError {
    pub message: String,
}

impl PreflightError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from control-center operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation: {message}")]
    Validation {
        message: String,
        usage: String,
        hint: String,
    },
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    ActivePhase(#[from] ActivePhaseError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("phase not found: {0}")]
    PhaseNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("project lock: {0}")]
    Lock(String),
}

impl ServiceError {
    pub fn validation(
        message: impl Into<String>,
        usage: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            usage: usage.into(),
            hint: hint.into(),
        }
    }
}

/// Errors from the execution loop.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Preflight(#[from] PreflightError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("git: {0}")]
    Git(#[from] GitError),
    #[error("gh: {0}")]
    Gh(#[from] GhError),
    #[error("CI preflight: {0}")]
    CiProbes(String),
    #[error("internal invariant violated: {0}")]
    Internal(String),
}
