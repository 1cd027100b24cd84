// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ProjectState: the root aggregate persisted at `<rootDir>/.ixado/state.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::phase::{Phase, PhaseId};
use crate::task::TaskId;

/// Violations detected by [`ProjectState::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateInvariantError {
    #[error("activePhaseId {0} does not match any phase")]
    ActivePhaseNotFound(String),
    #[error("phase {0} has an empty branchName")]
    EmptyBranchName(String),
    #[error("phase {phase} is {status} without a failureKind")]
    MissingFailureKind { phase: String, status: String },
    #[error("phase {phase} carries failureKind {kind} in non-failure status {status}")]
    StrayFailureKind {
        phase: String,
        status: String,
        kind: String,
    },
    #[error("duplicate phase id {0}")]
    DuplicatePhaseId(String),
    #[error("task {task} in phase {phase} depends on unknown task {dep}")]
    UnknownDependency {
        phase: String,
        task: String,
        dep: String,
    },
}

/// The root aggregate: one project, its phases, and the active-phase pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectState {
    pub project_name: String,
    /// Absolute path of the owned project directory
    pub root_dir: PathBuf,
    #[serde(default)]
    pub phases: Vec<Phase>,
    /// Either absent or equal to some `phases[i].id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_phase_id: Option<PhaseId>,
    pub created_at: DateTime<Utc>,
    /// Monotonic per write
    pub updated_at: DateTime<Utc>,
}

impl ProjectState {
    /// Create an empty, schema-valid state.
    pub fn new(
        project_name: impl Into<String>,
        root_dir: impl Into<PathBuf>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            root_dir: root_dir.into(),
            phases: Vec::new(),
            active_phase_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn phase(&self, id: &PhaseId) -> Option<&Phase> {
        self.phases.iter().find(|p| &p.id == id)
    }

    pub fn phase_mut(&mut self, id: &PhaseId) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|p| &p.id == id)
    }

    /// Locate a task anywhere in the document.
    pub fn find_task(&self, task_id: &TaskId) -> Option<(&Phase, &crate::task::Task)> {
        self.phases
            .iter()
            .find_map(|p| p.task(task_id).map(|t| (p, t)))
    }

    /// Check the document invariants beyond what serde enforces.
    pub fn validate(&self) -> Result<(), StateInvariantError> {
        for (i, phase) in self.phases.iter().enumerate() {
            if self.phases[..i].iter().any(|p| p.id == phase.id) {
                return Err(StateInvariantError::DuplicatePhaseId(
                    phase.id.to_string(),
                ));
            }
            if phase.branch_name.is_empty() {
                return Err(StateInvariantError::EmptyBranchName(phase.id.to_string()));
            }
            if phase.status.is_failure() && phase.failure_kind.is_none() {
                return Err(StateInvariantError::MissingFailureKind {
                    phase: phase.id.to_string(),
                    status: phase.status.to_string(),
                });
            }
            if !phase.status.is_failure() {
                if let Some(kind) = phase.failure_kind {
                    return Err(StateInvariantError::StrayFailureKind {
                        phase: phase.id.to_string(),
                        status: phase.status.to_string(),
                        kind: kind.to_string(),
                    });
                }
            }
            for task in &phase.tasks {
                for dep in &task.dependencies {
                    if phase.task(dep).is_none() {
                        return Err(StateInvariantError::UnknownDependency {
                            phase: phase.id.to_string(),
                            task: task.id.to_string(),
                            dep: dep.to_string(),
                        });
                    }
                }
            }
        }
        if let Some(active) = &self.active_phase_id {
            if self.phase(active).is_none() {
                return Err(StateInvariantError::ActivePhaseNotFound(
                    active.to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
