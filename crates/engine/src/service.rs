// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-center service.
//!
//! The single entry point every surface (CLI, web, Telegram) uses for state
//! mutations. Each operation is a transaction — read, modify, write — run
//! under an advisory file lock so concurrent surfaces serialize on the
//! same project. Execution-side operations (dispatching tasks, running the
//! loop) live on `PhaseRunner`, which writes through this service.

use fs2::FileExt;
use ixado_core::{
    Assignee, Clock, ExceptionCategory, FailureKind, Phase, PhaseId, PhaseStatus, ProjectState,
    Settings, Task, TaskId, TaskStatus, truncate_output_default,
};
use ixado_storage::{load_settings, ProjectPaths, RegistryFile, StateFile};
use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::error::ServiceError;

/// Partial task update accepted by `update_task` (web PATCH body).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub dependencies: Option<Vec<TaskId>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// Transactional façade over one project's state.
#[derive(Clone)]
pub struct ControlCenter<C: Clock> {
    paths: ProjectPaths,
    state_file: StateFile<C>,
    registry: RegistryFile,
    settings: Settings,
    clock: C,
}

impl<C: Clock> ControlCenter<C> {
    /// Open the service for a project root, loading settings.
    pub fn open(root_dir: impl AsRef<Path>, clock: C) -> Result<Self, ServiceError> {
        let paths = ProjectPaths::resolve(root_dir.as_ref());
        let settings = load_settings(paths.settings_file())?;
        Ok(Self::with_paths(paths, settings, clock))
    }

    /// Build the service from already-resolved paths and settings.
    pub fn with_paths(paths: ProjectPaths, settings: Settings, clock: C) -> Self {
        let state_file = StateFile::new(paths.state_file(), clock.clone());
        let registry = RegistryFile::new(paths.registry_file());
        Self {
            paths,
            state_file,
            registry,
            settings,
            clock,
        }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &RegistryFile {
        &self.registry
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Acquire the per-project lock for the duration of `f`.
    fn transaction<R>(
        &self,
        f: impl FnOnce(&mut ProjectState) -> Result<R, ServiceError>,
    ) -> Result<R, ServiceError> {
        let _guard = self.lock()?;
        let mut state = self.state_file.read()?;
        let result = f(&mut state)?;
        self.state_file.write(state)?;
        Ok(result)
    }

    fn lock(&self) -> Result<File, ServiceError> {
        let path = self.paths.lock_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServiceError::Lock(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| ServiceError::Lock(e.to_string()))?;
        file.lock_exclusive()
            .map_err(|e| ServiceError::Lock(e.to_string()))?;
        Ok(file)
    }

    /// Create the state file if absent; otherwise return the current state.
    pub fn ensure_initialized(
        &self,
        project_name: &str,
        root_dir: &Path,
    ) -> Result<ProjectState, ServiceError> {
        let _guard = self.lock()?;
        if self.state_file.exists() {
            return Ok(self.state_file.read()?);
        }
        Ok(self.state_file.initialize(project_name, root_dir)?)
    }

    pub fn get_state(&self) -> Result<ProjectState, ServiceError> {
        Ok(self.state_file.read()?)
    }

    /// Create a phase; the first phase created becomes active.
    pub fn create_phase(
        &self,
        name: &str,
        branch_name: &str,
    ) -> Result<Phase, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::validation(
                "phase name must not be empty",
                "ixado phase create <name> <branch>",
                "give the phase a short descriptive name",
            ));
        }
        if branch_name.trim().is_empty() {
            return Err(ServiceError::validation(
                "branch name must not be empty",
                "ixado phase create <name> <branch>",
                "every phase targets exactly one git branch",
            ));
        }
        self.transaction(|state| {
            let phase = Phase::new(
                PhaseId::new(uuid::Uuid::new_v4().to_string()),
                name,
                branch_name,
            );
            if state.active_phase_id.is_none() {
                state.active_phase_id = Some(phase.id.clone());
            }
            state.phases.push(phase.clone());
            Ok(phase)
        })
    }

    pub fn set_active_phase(&self, phase_id: &PhaseId) -> Result<Phase, ServiceError> {
        self.transaction(|state| {
            let phase = state
                .phase(phase_id)
                .cloned()
                .ok_or_else(|| ServiceError::PhaseNotFound(phase_id.to_string()))?;
            state.active_phase_id = Some(phase_id.clone());
            Ok(phase)
        })
    }

    /// Set a phase status; `failure_kind` is kept only for failure statuses.
    pub fn set_phase_status(
        &self,
        phase_id: &PhaseId,
        status: PhaseStatus,
        failure_kind: Option<FailureKind>,
    ) -> Result<Phase, ServiceError> {
        self.transaction(|state| {
            let phase = state
                .phase_mut(phase_id)
                .ok_or_else(|| ServiceError::PhaseNotFound(phase_id.to_string()))?;
            phase.set_status(status, failure_kind);
            Ok(phase.clone())
        })
    }

    pub fn set_phase_pr_url(
        &self,
        phase_id: &PhaseId,
        pr_url: &str,
    ) -> Result<Phase, ServiceError> {
        self.transaction(|state| {
            let phase = state
                .phase_mut(phase_id)
                .ok_or_else(|| ServiceError::PhaseNotFound(phase_id.to_string()))?;
            phase.pr_url = Some(pr_url.to_string());
            Ok(phase.clone())
        })
    }

    /// Create a task in a phase.
    pub fn create_task(
        &self,
        phase_id: &PhaseId,
        title: &str,
        description: &str,
        assignee: Assignee,
        dependencies: Vec<TaskId>,
    ) -> Result<Task, ServiceError> {
        if title.trim().is_empty() {
            return Err(ServiceError::validation(
                "task title must not be empty",
                "ixado task create <phase-id> <title> [description]",
                "give the task a short imperative title",
            ));
        }
        self.transaction(|state| {
            let phase = state
                .phase_mut(phase_id)
                .ok_or_else(|| ServiceError::PhaseNotFound(phase_id.to_string()))?;
            for dep in &dependencies {
                if phase.task(dep).is_none() {
                    return Err(ServiceError::TaskNotFound(dep.to_string()));
                }
            }
            let mut task = Task::new(
                TaskId::new(uuid::Uuid::new_v4().to_string()),
                title,
                description,
                assignee,
            );
            task.dependencies = dependencies;
            phase.tasks.push(task.clone());
            Ok(task)
        })
    }

    /// Apply a partial update to a task.
    pub fn update_task(&self, task_id: &TaskId, patch: TaskPatch) -> Result<Task, ServiceError> {
        self.transaction(|state| {
            let phase_id = state
                .find_task(task_id)
                .map(|(p, _)| p.id.clone())
                .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;
            let phase = state
                .phase_mut(&phase_id)
                .ok_or_else(|| ServiceError::PhaseNotFound(phase_id.to_string()))?;
            if let Some(dependencies) = &patch.dependencies {
                for dep in dependencies {
                    if phase.task(dep).is_none() {
                        return Err(ServiceError::TaskNotFound(dep.to_string()));
                    }
                }
            }
            let task = phase
                .task_mut(task_id)
                .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;
            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(assignee) = patch.assignee {
                task.assignee = assignee;
            }
            if let Some(dependencies) = patch.dependencies {
                task.dependencies = dependencies;
            }
            if let Some(status) = patch.status {
                task.status = status;
            }
            Ok(task.clone())
        })
    }

    /// Transition a task to IN_PROGRESS for dispatch.
    pub fn mark_task_in_progress(&self, task_id: &TaskId) -> Result<Task, ServiceError> {
        self.transaction(|state| {
            let task = find_task_mut(state, task_id)?;
            task.status = TaskStatus::InProgress;
            Ok(task.clone())
        })
    }

    /// Record a successful dispatch: DONE plus bounded result context.
    pub fn complete_task(
        &self,
        task_id: &TaskId,
        result_context: &str,
    ) -> Result<Task, ServiceError> {
        self.transaction(|state| {
            let task = find_task_mut(state, task_id)?;
            task.status = TaskStatus::Done;
            task.result_context = Some(truncate_output_default(result_context));
            task.error_logs = None;
            task.error_category = None;
            Ok(task.clone())
        })
    }

    /// Record a failed dispatch: FAILED plus bounded error logs.
    pub fn fail_task(
        &self,
        task_id: &TaskId,
        error_logs: &str,
        category: ExceptionCategory,
    ) -> Result<Task, ServiceError> {
        self.transaction(|state| {
            let task = find_task_mut(state, task_id)?;
            task.status = TaskStatus::Failed;
            task.error_logs = Some(truncate_output_default(error_logs));
            task.error_category = Some(category);
            Ok(task.clone())
        })
    }

    /// FAILED only when the task is still IN_PROGRESS (used by stop paths).
    pub fn fail_task_if_in_progress(
        &self,
        task_id: &TaskId,
        error_logs: &str,
        category: ExceptionCategory,
    ) -> Result<Option<Task>, ServiceError> {
        self.transaction(|state| {
            let task = find_task_mut(state, task_id)?;
            if task.status != TaskStatus::InProgress {
                return Ok(None);
            }
            task.status = TaskStatus::Failed;
            task.error_logs = Some(truncate_output_default(error_logs));
            task.error_category = Some(category);
            Ok(Some(task.clone()))
        })
    }

    /// Back to TODO, clearing diagnostic scratch fields.
    pub fn reset_task_to_todo(&self, task_id: &TaskId) -> Result<Task, ServiceError> {
        self.transaction(|state| {
            let task = find_task_mut(state, task_id)?;
            task.status = TaskStatus::Todo;
            task.clear_diagnostics();
            Ok(task.clone())
        })
    }

    /// Reset to TODO only when IN_PROGRESS. Idempotent.
    pub fn reconcile_in_progress_task_to_todo(
        &self,
        task_id: &TaskId,
    ) -> Result<Task, ServiceError> {
        self.transaction(|state| {
            let task = find_task_mut(state, task_id)?;
            if task.status == TaskStatus::InProgress {
                task.status = TaskStatus::Todo;
                task.clear_diagnostics();
            }
            Ok(task.clone())
        })
    }

    /// Reset every IN_PROGRESS task without a live agent, across all phases.
    ///
    /// Returns the number of tasks reset. `has_running_agent` is consulted
    /// per task ID against the caller's view of the registry.
    pub fn reconcile_in_progress_tasks(
        &self,
        has_running_agent: impl Fn(&TaskId) -> bool,
    ) -> Result<usize, ServiceError> {
        self.transaction(|state| {
            let mut count = 0;
            for phase in state.phases.iter_mut() {
                for task in phase.tasks.iter_mut() {
                    if task.status == TaskStatus::InProgress && !has_running_agent(&task.id) {
                        task.status = TaskStatus::Todo;
                        task.clear_diagnostics();
                        count += 1;
                    }
                }
            }
            Ok(count)
        })
    }

    /// Record the latest CI status context line on a phase.
    pub fn set_phase_ci_context(
        &self,
        phase_id: &PhaseId,
        context: Option<String>,
    ) -> Result<Phase, ServiceError> {
        self.transaction(|state| {
            let phase = state
                .phase_mut(phase_id)
                .ok_or_else(|| ServiceError::PhaseNotFound(phase_id.to_string()))?;
            phase.ci_status_context = context;
            Ok(phase.clone())
        })
    }

    /// Create CI_FIX tasks from parsed failure items, capped at `fan_out`.
    ///
    /// Returns the created tasks; one transaction regardless of count.
    pub fn create_ci_fix_tasks(
        &self,
        phase_id: &PhaseId,
        items: &[(String, String)],
        fan_out: u32,
        assignee: Assignee,
    ) -> Result<Vec<Task>, ServiceError> {
        self.transaction(|state| {
            let phase = state
                .phase_mut(phase_id)
                .ok_or_else(|| ServiceError::PhaseNotFound(phase_id.to_string()))?;
            let mut created = Vec::new();
            for (title, description) in items.iter().take(fan_out as usize) {
                let mut task = Task::new(
                    TaskId::new(uuid::Uuid::new_v4().to_string()),
                    title.clone(),
                    description.clone(),
                    assignee,
                );
                task.status = TaskStatus::CiFix;
                phase.tasks.push(task.clone());
                created.push(task);
            }
            Ok(created)
        })
    }

    /// Append a recovery attempt to a task (and optionally its phase).
    pub fn record_recovery_attempt(
        &self,
        task_id: &TaskId,
        record: ixado_core::RecoveryAttemptRecord,
        also_on_phase: bool,
    ) -> Result<(), ServiceError> {
        self.transaction(|state| {
            let phase_id = state
                .find_task(task_id)
                .map(|(p, _)| p.id.clone())
                .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;
            let phase = state
                .phase_mut(&phase_id)
                .ok_or_else(|| ServiceError::PhaseNotFound(phase_id.to_string()))?;
            if also_on_phase {
                phase.record_recovery_attempt(record.clone());
            }
            let task = phase
                .task_mut(task_id)
                .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;
            task.record_recovery_attempt(record);
            Ok(())
        })
    }
}

fn find_task_mut<'a>(
    state: &'a mut ProjectState,
    task_id: &TaskId,
) -> Result<&'a mut Task, ServiceError> {
    let phase_id = state
        .find_task(task_id)
        .map(|(p, _)| p.id.clone())
        .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;
    state
        .phase_mut(&phase_id)
        .and_then(|p| p.task_mut(task_id))
        .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
