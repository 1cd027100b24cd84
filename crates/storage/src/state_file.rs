// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic document store for `ProjectState`.
//!
//! The rename is the commit point: readers see either the previous or the
//! next full document, and a crash between tmp-write and rename leaves the
//! previous state file intact. Concurrent writers on the same file are not
//! supported; the control-center façade serializes writes per project.

use chrono::Duration;
use ixado_core::{Clock, Phase, ProjectState, StateInvariantError};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from state-file operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file not found: {path}")]
    FileNotFound { path: PathBuf },
    #[error("state file is not valid JSON: {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("state document violates the schema: {0}")]
    SchemaViolation(String),
    #[error("state invariant violated: {0}")]
    Invariant(#[from] StateInvariantError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Strict active-phase selector error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePhaseErrorCode {
    NoPhases,
    ActivePhaseIdMissing,
    ActivePhaseIdNotFound,
}

impl ActivePhaseErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivePhaseErrorCode::NoPhases => "NO_PHASES",
            ActivePhaseErrorCode::ActivePhaseIdMissing => "ACTIVE_PHASE_ID_MISSING",
            ActivePhaseErrorCode::ActivePhaseIdNotFound => "ACTIVE_PHASE_ID_NOT_FOUND",
        }
    }
}

/// Failure to resolve the active phase, with a machine code and hint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({})", code.as_str())]
pub struct ActivePhaseError {
    pub code: ActivePhaseErrorCode,
    pub message: String,
    pub hint: String,
}

/// Resolve the active phase strictly.
///
/// Never falls back to `phases[0]`: an unset pointer is an error even when
/// exactly one phase exists.
pub fn resolve_active_phase_strict(
    state: &ProjectState,
) -> Result<&Phase, ActivePhaseError> {
    if state.phases.is_empty() {
        return Err(ActivePhaseError {
            code: ActivePhaseErrorCode::NoPhases,
            message: "project has no phases".to_string(),
            hint: "create one with `ixado phase create <name> <branch>`".to_string(),
        });
    }
    let Some(active_id) = &state.active_phase_id else {
        return Err(ActivePhaseError {
            code: ActivePhaseErrorCode::ActivePhaseIdMissing,
            message: "no active phase is selected".to_string(),
            hint: "select one with `ixado phase active <phase-id>`".to_string(),
        });
    };
    state.phase(active_id).ok_or_else(|| ActivePhaseError {
        code: ActivePhaseErrorCode::ActivePhaseIdNotFound,
        message: format!("activePhaseId {} does not match any phase", active_id),
        hint: "select an existing phase with `ixado phase active <phase-id>`".to_string(),
    })
}

/// Handle to one project's `state.json`.
#[derive(Debug, Clone)]
pub struct StateFile<C: Clock> {
    path: PathBuf,
    clock: C,
}

impl<C: Clock> StateFile<C> {
    pub fn new(path: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the state file exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write an empty, schema-valid state for a new project.
    pub fn initialize(
        &self,
        project_name: &str,
        root_dir: &Path,
    ) -> Result<ProjectState, StateError> {
        let state = ProjectState::new(project_name, root_dir, self.clock.now_utc());
        self.persist(&state)?;
        Ok(state)
    }

    /// Read and validate the current document.
    pub fn read(&self) -> Result<ProjectState, StateError> {
        let file = File::open(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StateError::FileNotFound {
                    path: self.path.clone(),
                }
            } else {
                StateError::Io(e)
            }
        })?;
        let reader = BufReader::new(file);
        // Parse to a generic value first so JSON syntax errors and schema
        // mismatches report as distinct failures.
        let value: serde_json::Value =
            serde_json::from_reader(reader).map_err(|source| StateError::InvalidJson {
                path: self.path.clone(),
                source,
            })?;
        let state: ProjectState = serde_json::from_value(value)
            .map_err(|e| StateError::SchemaViolation(e.to_string()))?;
        state.validate()?;
        Ok(state)
    }

    /// Validate and persist `next`, stamping a monotonic `updatedAt`.
    pub fn write(&self, mut next: ProjectState) -> Result<ProjectState, StateError> {
        next.validate()?;
        let now = self.clock.now_utc();
        // updatedAt never moves backward, even across clock adjustments.
        next.updated_at = if now > next.updated_at {
            now
        } else {
            next.updated_at + Duration::milliseconds(1)
        };
        self.persist(&next)?;
        Ok(next)
    }

    fn persist(&self, state: &ProjectState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, state)
                .map_err(|e| StateError::SchemaViolation(e.to_string()))?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_file_tests.rs"]
mod tests;
