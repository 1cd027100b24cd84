// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution loop / phase runner.
//!
//! A single-writer control loop per project: pick the next actionable task,
//! dispatch it to its adapter through the supervisor, observe the outcome,
//! invoke recovery, and advance the phase through the GitOps lifecycle
//! (BRANCHING → CODING → CREATING_PR → AWAITING_CI → READY_FOR_REVIEW),
//! including CI_FIX fanout under the configured guardrails.

use ixado_adapters::{
    run_ci_probes, AdapterCatalog, CiStatusReading, GhAdapter, GitAdapter,
};
use ixado_core::{
    AgentId, Assignee, CiOverall, Clock, EventContext, EventPayload, EventSource,
    ExceptionCategory, FailureKind, Phase, PhaseId, PhaseStatus, RecoveryAttemptRecord,
    RecoveryException, RuntimeEvent, Task, TaskId, TaskStatus, WorkerArchetype,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::bus::RuntimeBus;
use crate::error::{PreflightError, RunnerError, ServiceError};
use crate::prompts::compose_prompt;
use crate::recovery::{classify_failure, RecoveryPolicy};
use crate::service::ControlCenter;
use crate::supervisor::{pid_alive, AgentSupervisor, RunToCompletion, SpawnSpec};

/// Outcome of one `run_active_phase` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The phase reached the given status (READY_FOR_REVIEW or DONE)
    Completed(PhaseStatus),
    /// No dispatchable work remains but the phase is not finished
    Parked { reason: String },
    /// `stop()` was requested mid-run
    Cancelled,
}

/// Counts from startup reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    /// RUNNING registry rows whose process was dead
    pub stale_agents: usize,
    /// IN_PROGRESS tasks without a live agent
    pub reset_tasks: usize,
}

/// The per-project execution loop.
pub struct PhaseRunner<C: Clock, G: GitAdapter, H: GhAdapter> {
    service: ControlCenter<C>,
    supervisor: AgentSupervisor<C>,
    catalog: AdapterCatalog,
    git: G,
    gh: H,
    bus: RuntimeBus,
    recovery: RecoveryPolicy<G>,
    cancel: Arc<AtomicBool>,
    active_agent: Arc<Mutex<Option<(AgentId, TaskId)>>>,
    /// CI_FIX → CI_FAILED cycle depth per phase, this controller session
    ci_fix_depth: Arc<Mutex<HashMap<PhaseId, u32>>>,
}

impl<C, G, H> Clone for PhaseRunner<C, G, H>
where
    C: Clock,
    G: GitAdapter,
    H: GhAdapter,
{
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            supervisor: self.supervisor.clone(),
            catalog: self.catalog.clone(),
            git: self.git.clone(),
            gh: self.gh.clone(),
            bus: self.bus.clone(),
            recovery: self.recovery.clone(),
            cancel: Arc::clone(&self.cancel),
            active_agent: Arc::clone(&self.active_agent),
            ci_fix_depth: Arc::clone(&self.ci_fix_depth),
        }
    }
}

impl<C, G, H> PhaseRunner<C, G, H>
where
    C: Clock + Send + Sync + 'static,
    G: GitAdapter,
    H: GhAdapter,
{
    pub fn new(
        service: ControlCenter<C>,
        supervisor: AgentSupervisor<C>,
        git: G,
        gh: H,
    ) -> Self {
        let settings = service.settings().clone();
        let bus = supervisor.bus().clone();
        let recovery = RecoveryPolicy::new(
            git.clone(),
            settings.exception_recovery.max_attempts,
        );
        Self {
            service,
            supervisor,
            catalog: AdapterCatalog::new(settings),
            git,
            gh,
            bus,
            recovery,
            cancel: Arc::new(AtomicBool::new(false)),
            active_agent: Arc::new(Mutex::new(None)),
            ci_fix_depth: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn service(&self) -> &ControlCenter<C> {
        &self.service
    }

    pub fn supervisor(&self) -> &AgentSupervisor<C> {
        &self.supervisor
    }

    pub fn bus(&self) -> &RuntimeBus {
        &self.bus
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn context_for(&self, phase: &Phase, task: Option<&Task>) -> EventContext {
        let state = self.service.get_state().ok();
        EventContext {
            project_name: state.map(|s| s.project_name),
            phase_id: Some(phase.id.clone()),
            phase_name: Some(phase.name.clone()),
            task_id: task.map(|t| t.id.clone()),
            task_title: task.map(|t| t.title.clone()),
            task_number: task.and_then(|t| phase.task_number(&t.id)),
            agent_id: None,
            adapter_id: task.and_then(|t| t.assignee.adapter()),
        }
    }

    fn emit(&self, context: EventContext, payload: EventPayload) {
        self.bus
            .emit(RuntimeEvent::now(EventSource::PhaseRunner, context, payload));
    }

    // --- startup reconciliation ---

    /// Mark dead RUNNING agents STOPPED and reset orphaned IN_PROGRESS
    /// tasks to TODO. Run once before the loop.
    pub fn reconcile_on_startup(&self) -> Result<ReconcileReport, RunnerError> {
        let stale_agents = self
            .supervisor
            .reconcile_running_agents_where(|record| {
                record.pid.map(|pid| !pid_alive(pid)).unwrap_or(true)
            })?;

        let running_tasks: Vec<TaskId> = self
            .supervisor
            .list()
            .into_iter()
            .filter(|r| r.is_running())
            .filter_map(|r| r.task_id)
            .collect();
        let reset_tasks = self
            .service
            .reconcile_in_progress_tasks(|task_id| running_tasks.contains(task_id))?;

        info!(stale_agents, reset_tasks, "startup reconciliation complete");
        Ok(ReconcileReport {
            stale_agents,
            reset_tasks,
        })
    }

    // --- preflight ---

    /// Verify phase preconditions; performs BRANCHING when the phase
    /// branch does not exist yet.
    async fn preflight(&self) -> Result<Phase, RunnerError> {
        let state = self.service.get_state()?;
        let phase = ixado_storage::resolve_active_phase_strict(&state)
            .map_err(|e| PreflightError::new(format!("{e}. Hint: {}", e.hint)))?
            .clone();

        if phase.status.is_terminal() {
            return Err(PreflightError::new(format!(
                "phase {} is DONE; select another phase before running",
                phase.name
            ))
            .into());
        }
        if phase.branch_name.trim().is_empty() {
            return Err(PreflightError::new(format!(
                "phase {} has an empty branch name",
                phase.name
            ))
            .into());
        }

        let current = self.git.current_branch().await?;
        if current != phase.branch_name {
            // Not on the phase branch: switch to it, creating it when it
            // does not exist yet (the BRANCHING step).
            if self.git.checkout(&phase.branch_name, false).await.is_err() {
                self.service.set_phase_status(
                    &phase.id,
                    PhaseStatus::Branching,
                    None,
                )?;
                self.emit(
                    self.context_for(&phase, None),
                    EventPayload::PhaseUpdate {
                        status: PhaseStatus::Branching,
                        message: Some(format!("creating branch {}", phase.branch_name)),
                    },
                );
                self.git
                    .checkout(&phase.branch_name, true)
                    .await
                    .map_err(|e| {
                        PreflightError::new(format!(
                            "cannot create branch {}: {e}. Hint: commit or stash local \
                             changes and re-run",
                            phase.branch_name
                        ))
                    })?;
            }
        }
        Ok(phase)
    }

    // --- main loop ---

    /// Drive the active phase until it completes, parks, or is stopped.
    pub async fn run_active_phase(&self) -> Result<RunOutcome, RunnerError> {
        self.cancel.store(false, Ordering::SeqCst);
        loop {
            if self.cancelled() {
                return Ok(RunOutcome::Cancelled);
            }

            let phase = self.preflight().await?;
            if matches!(
                phase.status,
                PhaseStatus::Planning | PhaseStatus::Branching
            ) {
                let updated = self.service.set_phase_status(
                    &phase.id,
                    PhaseStatus::Coding,
                    None,
                )?;
                self.emit(
                    self.context_for(&updated, None),
                    EventPayload::PhaseUpdate {
                        status: PhaseStatus::Coding,
                        message: None,
                    },
                );
                continue;
            }

            // AWAITING_CI survives restarts: resume polling before looking
            // at tasks.
            if phase.status == PhaseStatus::AwaitingCi {
                match self.await_ci(&phase).await? {
                    CiVerdict::Green => continue,
                    CiVerdict::Red => continue,
                    CiVerdict::Cancelled => return Ok(RunOutcome::Cancelled),
                    CiVerdict::Exhausted => {
                        return Ok(RunOutcome::Parked {
                            reason: "CI fix depth exhausted".to_string(),
                        })
                    }
                }
            }
            if phase.status == PhaseStatus::ReadyForReview {
                return Ok(RunOutcome::Completed(PhaseStatus::ReadyForReview));
            }

            match phase.next_actionable_task().cloned() {
                Some(task) => {
                    self.dispatch_task(&phase, &task).await?;
                }
                None if phase.all_tasks_done() => {
                    if self.service.settings().ci.enabled {
                        match self.create_pr(&phase).await? {
                            CiVerdict::Green | CiVerdict::Red => continue,
                            CiVerdict::Cancelled => return Ok(RunOutcome::Cancelled),
                            CiVerdict::Exhausted => {
                                return Ok(RunOutcome::Parked {
                                    reason: "CI fix depth exhausted".to_string(),
                                })
                            }
                        }
                    }
                    let updated = self.service.set_phase_status(
                        &phase.id,
                        PhaseStatus::ReadyForReview,
                        None,
                    )?;
                    self.emit(
                        self.context_for(&updated, None),
                        EventPayload::PhaseUpdate {
                            status: PhaseStatus::ReadyForReview,
                            message: None,
                        },
                    );
                    return Ok(RunOutcome::Completed(PhaseStatus::ReadyForReview));
                }
                None => {
                    let failed = phase
                        .tasks
                        .iter()
                        .filter(|t| t.status == TaskStatus::Failed)
                        .count();
                    return Ok(RunOutcome::Parked {
                        reason: format!(
                            "no dispatchable task ({failed} failed task(s) block the phase)"
                        ),
                    });
                }
            }
        }
    }

    // --- dispatch ---

    /// Dispatch one task: IN_PROGRESS → adapter run → DONE/FAILED (+ recovery).
    pub async fn dispatch_task(&self, phase: &Phase, task: &Task) -> Result<Task, RunnerError> {
        let Some(adapter) = task.assignee.adapter() else {
            let failed = self.service.fail_task(
                &task.id,
                "task has no assignee; assign an adapter before dispatch",
                ExceptionCategory::Unknown,
            )?;
            self.emit(
                self.context_for(phase, Some(task)),
                EventPayload::TaskFinish {
                    status: TaskStatus::Failed,
                    message: "task has no assignee".to_string(),
                },
            );
            return Ok(failed);
        };

        let resume = task.next_attempt_number() > 1;
        self.service.mark_task_in_progress(&task.id)?;
        let context = self.context_for(phase, Some(task));
        self.emit(
            context.clone(),
            EventPayload::TaskStart {
                assignee: task.assignee,
                resume,
                message: format!("dispatching to {}", task.assignee),
            },
        );

        let archetype = task.archetype();
        let diff_context = if archetype == WorkerArchetype::Reviewer {
            let status = self.git.staged_status().await?;
            Some(status.staged_files.join("\n"))
        } else {
            None
        };
        let prompt = match compose_prompt(archetype, phase, task, diff_context.as_deref()) {
            Ok(prompt) => prompt,
            Err(e) => {
                let failed =
                    self.service
                        .fail_task(&task.id, &e.to_string(), ExceptionCategory::Unknown)?;
                self.emit(
                    context,
                    EventPayload::TaskFinish {
                        status: TaskStatus::Failed,
                        message: e.to_string(),
                    },
                );
                return Ok(failed);
            }
        };

        let outcome = self.run_adapter(adapter, &prompt, phase, Some(task)).await?;

        if outcome.cancelled {
            // stop() killed the child; the task goes back to TODO with its
            // diagnostic fields cleared.
            let reset = self.service.reset_task_to_todo(&task.id)?;
            self.emit(
                context,
                EventPayload::TaskFinish {
                    status: TaskStatus::Todo,
                    message: "dispatch cancelled; task reset to TODO".to_string(),
                },
            );
            return Ok(reset);
        }

        if outcome.succeeded() {
            let done = self.service.complete_task(&task.id, &outcome.stdout)?;
            self.emit(
                context,
                EventPayload::TaskFinish {
                    status: TaskStatus::Done,
                    message: format!("completed in {}ms", outcome.duration_ms),
                },
            );
            return Ok(done);
        }

        // Failure path: classify, persist, then hand off to recovery.
        let category = classify_failure(outcome.timed_out, outcome.exit_code, &outcome.stderr);
        let error_logs = if outcome.stderr.trim().is_empty() {
            outcome.stdout.clone()
        } else {
            outcome.stderr.clone()
        };
        let failed = self.service.fail_task(&task.id, &error_logs, category)?;
        self.emit(
            context.clone(),
            EventPayload::TaskFinish {
                status: TaskStatus::Failed,
                message: format!(
                    "adapter failed (exit {:?}, category {category})",
                    outcome.exit_code
                ),
            },
        );

        self.recover_task(phase, &failed, category, &error_logs).await?;
        Ok(self
            .service
            .get_state()?
            .find_task(&task.id)
            .map(|(_, t)| t.clone())
            .unwrap_or(failed))
    }

    /// Spawn the adapter and track it as the active agent for `stop()`.
    async fn run_adapter(
        &self,
        adapter: ixado_core::AdapterId,
        prompt: &str,
        phase: &Phase,
        task: Option<&Task>,
    ) -> Result<RunToCompletion, RunnerError> {
        let invocation = self.catalog.invocation(adapter, prompt);
        let state = self.service.get_state()?;
        let mut spec = SpawnSpec::new(
            AdapterCatalog::display_name(adapter),
            invocation.program,
            state.root_dir.clone(),
        )
        .with_args(invocation.args)
        .approved(adapter);
        spec.project_name = Some(state.project_name.clone());
        spec.phase_id = Some(phase.id.clone());
        spec.task_id = task.map(|t| t.id.clone());
        spec.timeout = invocation.timeout;
        spec.startup_silence_timeout = invocation.startup_silence_timeout;

        let record = self.supervisor.start(spec).await?;
        if let Some(task) = task {
            *self.active_agent.lock() = Some((record.id.clone(), task.id.clone()));
        }
        // start() registered the child; wait on the same record.
        let outcome = self.supervisor.wait_to_completion(&record.id).await?;
        *self.active_agent.lock() = None;
        Ok(outcome)
    }

    // --- recovery ---

    async fn recover_task(
        &self,
        phase: &Phase,
        task: &Task,
        category: ExceptionCategory,
        error_message: &str,
    ) -> Result<(), RunnerError> {
        let max = self.recovery.max_attempts();
        if max == 0 {
            return Ok(());
        }
        let attempt_number = task.next_attempt_number();
        if attempt_number > max {
            self.emit(
                self.context_for(phase, Some(task)),
                EventPayload::RecoveryActivity {
                    stage: "exhausted".to_string(),
                    summary: format!("recovery budget of {max} attempt(s) spent"),
                    attempt_number: Some(attempt_number),
                    category: Some(category),
                },
            );
            return Ok(());
        }

        let context = self.context_for(phase, Some(task));
        self.emit(
            context.clone(),
            EventPayload::RecoveryActivity {
                stage: "attempt-started".to_string(),
                summary: format!("remediating {category}"),
                attempt_number: Some(attempt_number),
                category: Some(category),
            },
        );

        let result = self.recovery.remediate(category, attempt_number).await;
        let record = RecoveryAttemptRecord {
            id: uuid::Uuid::new_v4().to_string(),
            occurred_at: self.service.clock().now_utc(),
            attempt_number,
            exception: RecoveryException {
                category,
                message: ixado_core::truncate_output_default(error_message),
                phase_id: Some(phase.id.clone()),
                task_id: Some(task.id.clone()),
            },
            result: result.clone(),
        };
        let phase_level = category == ExceptionCategory::AgentFailure;
        self.service
            .record_recovery_attempt(&task.id, record, phase_level)?;

        if result.is_fixed() {
            // Re-attempt: back to TODO so the loop re-dispatches it.
            self.service.reset_task_to_todo(&task.id)?;
            self.emit(
                context,
                EventPayload::RecoveryActivity {
                    stage: "attempt-succeeded".to_string(),
                    summary: result.reasoning.clone(),
                    attempt_number: Some(attempt_number),
                    category: Some(category),
                },
            );
        } else {
            self.emit(
                context,
                EventPayload::RecoveryActivity {
                    stage: "attempt-failed".to_string(),
                    summary: result.reasoning.clone(),
                    attempt_number: Some(attempt_number),
                    category: Some(category),
                },
            );
        }
        Ok(())
    }

    // --- CI integration ---

    /// CREATING_PR: probes, stage/commit/push, open the PR, then poll.
    async fn create_pr(&self, phase: &Phase) -> Result<CiVerdict, RunnerError> {
        let context = self.context_for(phase, None);
        self.service
            .set_phase_status(&phase.id, PhaseStatus::CreatingPr, None)?;
        self.emit(
            context.clone(),
            EventPayload::PhaseUpdate {
                status: PhaseStatus::CreatingPr,
                message: None,
            },
        );

        let report = run_ci_probes(&self.git, &self.gh).await;
        if !report.all_ok() {
            let missing = report
                .missing_side_effects()
                .into_iter()
                .map(|(name, remediation)| format!("{name}: {remediation}"))
                .collect::<Vec<_>>()
                .join("; ");
            self.emit(
                context,
                EventPayload::PrActivity {
                    stage: "probe-failed".to_string(),
                    summary: missing.clone(),
                    pr_url: None,
                    pr_number: None,
                },
            );
            return Err(RunnerError::CiProbes(missing));
        }

        self.git.add_all().await?;
        let status = self.git.staged_status().await?;
        if status.has_staged_changes() {
            self.git
                .commit(&format!("chore: finalize phase {}", phase.name))
                .await?;
        }
        self.emit(
            context.clone(),
            EventPayload::PrActivity {
                stage: "pushing".to_string(),
                summary: format!("pushing {} to origin", phase.branch_name),
                pr_url: None,
                pr_number: None,
            },
        );
        self.git.push_upstream(&phase.branch_name).await?;

        // A phase that already has a PR (CI_FIX cycle) just updates it by
        // pushing; open one only on the first pass.
        if phase.pr_url.is_none() {
            let pr = self
                .gh
                .pr_create(
                    &phase.name,
                    &format!("Automated pull request for phase {}", phase.name),
                    &phase.branch_name,
                )
                .await?;
            self.service.set_phase_pr_url(&phase.id, &pr.url)?;
            self.emit(
                context.clone(),
                EventPayload::PrActivity {
                    stage: "opened".to_string(),
                    summary: format!("opened {}", pr.url),
                    pr_url: Some(pr.url.clone()),
                    pr_number: pr.number,
                },
            );
        }

        let updated =
            self.service
                .set_phase_status(&phase.id, PhaseStatus::AwaitingCi, None)?;
        self.emit(
            self.context_for(&updated, None),
            EventPayload::PhaseUpdate {
                status: PhaseStatus::AwaitingCi,
                message: None,
            },
        );
        self.await_ci(&updated).await
    }

    /// AWAITING_CI: poll until N identical consecutive readings.
    async fn await_ci(&self, phase: &Phase) -> Result<CiVerdict, RunnerError> {
        let settings = self.service.settings().ci.clone();
        let needed = settings.terminal_observation_count.max(2);
        let interval = Duration::from_millis(settings.poll_interval_ms);
        let context = self.context_for(phase, None);

        let mut poll_count: u32 = 0;
        let mut streak: Option<(CiOverall, u32)> = None;
        let mut last_emitted: Option<CiOverall> = None;
        loop {
            if self.cancelled() {
                return Ok(CiVerdict::Cancelled);
            }
            poll_count += 1;
            let reading = self.gh.ci_status(&phase.branch_name).await?;
            self.service.set_phase_ci_context(
                &phase.id,
                Some(format!("{} after {} poll(s)", reading.overall, poll_count)),
            )?;

            if last_emitted != Some(reading.overall) {
                last_emitted = Some(reading.overall);
                self.emit(
                    context.clone(),
                    EventPayload::CiActivity {
                        stage: "poll-transition".to_string(),
                        summary: format!("CI is {}", reading.overall),
                        overall: Some(reading.overall),
                        poll_count: Some(poll_count),
                        created_fix_task_count: None,
                    },
                );
            }

            streak = match streak {
                Some((overall, count)) if overall == reading.overall => {
                    Some((overall, count + 1))
                }
                _ => Some((reading.overall, 1)),
            };
            // A terminal observation needs `needed` identical consecutive
            // readings; PENDING never terminates.
            if let Some((overall, count)) = streak {
                if overall != CiOverall::Pending && count >= needed {
                    if overall == CiOverall::Success {
                        let updated = self.service.set_phase_status(
                            &phase.id,
                            PhaseStatus::ReadyForReview,
                            None,
                        )?;
                        self.emit(
                            context.clone(),
                            EventPayload::CiActivity {
                                stage: "succeeded".to_string(),
                                summary: "CI is green".to_string(),
                                overall: Some(overall),
                                poll_count: Some(poll_count),
                                created_fix_task_count: None,
                            },
                        );
                        self.emit(
                            self.context_for(&updated, None),
                            EventPayload::PhaseUpdate {
                                status: PhaseStatus::ReadyForReview,
                                message: None,
                            },
                        );
                        return Ok(CiVerdict::Green);
                    }
                    return self.on_ci_failure(phase, &reading, poll_count).await;
                }
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// CI_FAILED: record the failure and fan out CI_FIX tasks under the
    /// depth/width guardrails.
    async fn on_ci_failure(
        &self,
        phase: &Phase,
        reading: &CiStatusReading,
        poll_count: u32,
    ) -> Result<CiVerdict, RunnerError> {
        let context = self.context_for(phase, None);
        let updated = self.service.set_phase_status(
            &phase.id,
            PhaseStatus::CiFailed,
            Some(FailureKind::RemoteCi),
        )?;
        self.emit(
            self.context_for(&updated, None),
            EventPayload::PhaseUpdate {
                status: PhaseStatus::CiFailed,
                message: None,
            },
        );

        let settings = self.service.settings().ci.clone();
        let depth = {
            let mut depths = self.ci_fix_depth.lock();
            let depth = depths.entry(phase.id.clone()).or_insert(0);
            *depth += 1;
            *depth
        };
        if depth > settings.ci_fix_max_depth {
            self.emit(
                context,
                EventPayload::CiActivity {
                    stage: "validation-max-retries".to_string(),
                    summary: format!(
                        "aborting after {depth} CI_FIX cycles (max {})",
                        settings.ci_fix_max_depth
                    ),
                    overall: Some(CiOverall::Failure),
                    poll_count: Some(poll_count),
                    created_fix_task_count: None,
                },
            );
            return Ok(CiVerdict::Exhausted);
        }

        let mut items: Vec<(String, String)> = reading
            .failed_checks()
            .iter()
            .map(|check| {
                (
                    format!("Fix CI check: {}", check.name),
                    format!(
                        "CI check `{}` concluded {} on branch {}. Reproduce locally, fix, and commit.",
                        check.name,
                        check.conclusion,
                        phase.branch_name
                    ),
                )
            })
            .collect();
        if items.is_empty() {
            items.push((
                "Investigate CI failure".to_string(),
                format!(
                    "CI reported failure on branch {} without named checks; inspect the run logs.",
                    phase.branch_name
                ),
            ));
        }

        // Assign fixes to the adapter that did the most work in the phase,
        // falling back to the first assigned task.
        let assignee = phase
            .tasks
            .iter()
            .find_map(|t| t.assignee.adapter())
            .map(Assignee::Adapter)
            .unwrap_or(Assignee::Unassigned);
        let created = self.service.create_ci_fix_tasks(
            &phase.id,
            &items,
            settings.ci_fix_max_fan_out,
            assignee,
        )?;
        self.emit(
            context,
            EventPayload::CiActivity {
                stage: "failed".to_string(),
                summary: format!(
                    "CI failed; created {} fix task(s) from {} item(s)",
                    created.len(),
                    items.len()
                ),
                overall: Some(CiOverall::Failure),
                poll_count: Some(poll_count),
                created_fix_task_count: Some(created.len() as u32),
            },
        );

        // Back to CODING so the loop dispatches the fixes.
        let updated = self
            .service
            .set_phase_status(&phase.id, PhaseStatus::Coding, None)?;
        self.emit(
            self.context_for(&updated, None),
            EventPayload::PhaseUpdate {
                status: PhaseStatus::Coding,
                message: Some("dispatching CI fixes".to_string()),
            },
        );
        Ok(CiVerdict::Red)
    }

    // --- cancellation ---

    /// Cooperative stop: kill the active agent, settle writes, reset the
    /// killed task back to TODO.
    pub async fn stop(&self) -> Result<(), RunnerError> {
        self.cancel.store(true, Ordering::SeqCst);
        let active = self.active_agent.lock().clone();
        if let Some((agent_id, task_id)) = active {
            if let Err(e) = self.supervisor.kill(&agent_id).await {
                warn!(error = %e, "stop: killing active agent failed");
            }
            self.service.reset_task_to_todo(&task_id)?;
        }
        Ok(())
    }

    // --- direct dispatch (façade operations) ---

    /// Dispatch a single task immediately and wait for the result.
    pub async fn start_task_and_wait(&self, task_id: &TaskId) -> Result<Task, RunnerError> {
        let state = self.service.get_state()?;
        let (phase, task) = state
            .find_task(task_id)
            .map(|(p, t)| (p.clone(), t.clone()))
            .ok_or_else(|| {
                RunnerError::Service(ServiceError::TaskNotFound(task_id.to_string()))
            })?;
        if !task.status.is_actionable() {
            return Err(RunnerError::Service(ServiceError::validation(
                format!("task {} is {}, not startable", task.title, task.status),
                "ixado task start <task-id>",
                "only TODO and CI_FIX tasks can start; reset it first with `ixado task reset <task-id>`",
            )));
        }
        self.dispatch_task(&phase, &task).await
    }

    /// Fire-and-forget variant of `start_task_and_wait`.
    pub fn start_task(&self, task_id: TaskId) {
        let runner = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.start_task_and_wait(&task_id).await {
                warn!(error = %e, task = %task_id, "background task dispatch failed");
            }
        });
    }

    /// Run an ad-hoc prompt through an adapter; the result is returned to
    /// the caller instead of being committed to a task.
    pub async fn run_internal_work(
        &self,
        assignee: Assignee,
        prompt: &str,
    ) -> Result<RunToCompletion, RunnerError> {
        let adapter = assignee.adapter().ok_or_else(|| {
            RunnerError::Service(ServiceError::validation(
                "internal work requires a concrete adapter",
                "ixado work <adapter> <prompt>",
                "pass one of CODEX_CLI, CLAUDE_CLI, GEMINI_CLI, MOCK_CLI",
            ))
        })?;
        let state = self.service.get_state()?;
        let invocation = self.catalog.invocation(adapter, prompt);
        let mut spec = SpawnSpec::new(
            AdapterCatalog::display_name(adapter),
            invocation.program,
            state.root_dir.clone(),
        )
        .with_args(invocation.args)
        .approved(adapter);
        spec.project_name = Some(state.project_name);
        spec.timeout = invocation.timeout;
        spec.startup_silence_timeout = invocation.startup_silence_timeout;
        self.supervisor
            .run_to_completion(spec)
            .await
            .map_err(Into::into)
    }
}

/// Internal verdicts from the CI sub-machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CiVerdict {
    Green,
    Red,
    Cancelled,
    Exhausted,
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
