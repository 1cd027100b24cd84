// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent supervisor.
//!
//! Spawns adapter subprocesses, captures stdout/stderr line-by-line into
//! the registry tail and the event bus, emits heartbeat/idle diagnostics,
//! classifies terminal outcomes, and reconciles stale registry rows on
//! startup. Only adapter-approved spawns are accepted: a raw command with
//! no adapter identity is rejected before any process is created.

use ixado_core::{
    AdapterId, AgentId, AgentRecord, AgentRecordStatus, Clock, EventContext, EventPayload,
    EventSource, OutcomeKind, OutputStream, PhaseId, RuntimeEvent, TaskId,
};
use ixado_storage::{RegistryError, RegistryFile};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, warn};

use crate::bus::RuntimeBus;
use crate::diagnostics::{format_marker_line, parse_marker_line, AgentDiagnostic};

/// Per-agent subscription buffer.
const AGENT_CHANNEL_CAPACITY: usize = 1024;

/// Errors from supervisor operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Spawn requests must carry an adapter identity and approval.
    #[error("raw command spawns are blocked; only approved adapter spawns are allowed")]
    RawCommandBlocked,
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("agent {0} was spawned by another controller; its output cannot be subscribed")]
    ForeignAgent(String),
    #[error("agent {0} has terminated")]
    AgentTerminated(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Everything needed to spawn one adapter.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub adapter_id: Option<AdapterId>,
    pub project_name: Option<String>,
    pub phase_id: Option<PhaseId>,
    pub task_id: Option<TaskId>,
    /// Must be set by the caller; raw-command spawns are rejected.
    pub approved_adapter_spawn: bool,
    /// Kill the child past this total runtime
    pub timeout: Duration,
    /// Kill the child if it never produces output within this window
    pub startup_silence_timeout: Duration,
    /// Idle diagnostics fire past this output silence
    pub idle_threshold: Duration,
    /// Heartbeat diagnostic cadence
    pub heartbeat_interval: Duration,
}

impl SpawnSpec {
    /// A spec with the documented default timings.
    pub fn new(name: impl Into<String>, command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            adapter_id: None,
            project_name: None,
            phase_id: None,
            task_id: None,
            approved_adapter_spawn: false,
            timeout: Duration::from_millis(3_600_000),
            startup_silence_timeout: Duration::from_millis(60_000),
            idle_threshold: Duration::from_secs(120),
            heartbeat_interval: Duration::from_secs(60),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn approved(mut self, adapter_id: AdapterId) -> Self {
        self.adapter_id = Some(adapter_id);
        self.approved_adapter_spawn = true;
        self
    }
}

/// How a supervised child reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Terminal {
    exit_code: Option<i32>,
    cancelled: bool,
    timed_out: bool,
}

/// Captured result of `run_to_completion`.
#[derive(Debug, Clone)]
pub struct RunToCompletion {
    pub id: AgentId,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub cancelled: bool,
    pub timed_out: bool,
}

impl RunToCompletion {
    pub fn succeeded(&self) -> bool {
        !self.cancelled && !self.timed_out && self.exit_code == Some(0)
    }
}

/// In-memory handle to a child this controller spawned.
struct AgentHandle {
    spec: SpawnSpec,
    agent_tx: broadcast::Sender<RuntimeEvent>,
    kill_tx: mpsc::Sender<()>,
    terminal_rx: watch::Receiver<Option<Terminal>>,
    stdout_buf: Arc<Mutex<String>>,
    stderr_buf: Arc<Mutex<String>>,
}

/// Retained result of a child that already exited this session.
struct CompletedRun {
    spec: SpawnSpec,
    terminal: Terminal,
    stdout_buf: Arc<Mutex<String>>,
    stderr_buf: Arc<Mutex<String>>,
}

/// Callback invoked with the registry row of every agent that ends FAILED.
pub type OnFailure = Arc<dyn Fn(&AgentRecord) + Send + Sync>;

/// The supervisor: registry + spawned-child table + event fanout.
#[derive(Clone)]
pub struct AgentSupervisor<C: Clock> {
    registry: RegistryFile,
    bus: RuntimeBus,
    clock: C,
    handles: Arc<Mutex<HashMap<AgentId, AgentHandle>>>,
    completed: Arc<Mutex<HashMap<AgentId, CompletedRun>>>,
    on_failure: Arc<Mutex<Option<OnFailure>>>,
}

/// Whether a PID refers to a live process.
pub fn pid_alive(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
        || std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
}

impl<C: Clock + 'static> AgentSupervisor<C> {
    pub fn new(registry: RegistryFile, bus: RuntimeBus, clock: C) -> Self {
        Self {
            registry,
            bus,
            clock,
            handles: Arc::new(Mutex::new(HashMap::new())),
            completed: Arc::new(Mutex::new(HashMap::new())),
            on_failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn bus(&self) -> &RuntimeBus {
        &self.bus
    }

    /// Install a callback invoked with the record of every FAILED agent.
    pub fn set_on_failure(&self, callback: OnFailure) {
        *self.on_failure.lock() = Some(callback);
    }

    fn context_for(&self, id: &AgentId, spec: &SpawnSpec) -> EventContext {
        EventContext {
            project_name: spec.project_name.clone(),
            phase_id: spec.phase_id.clone(),
            task_id: spec.task_id.clone(),
            agent_id: Some(id.clone()),
            adapter_id: spec.adapter_id,
            ..Default::default()
        }
    }

    /// Spawn an approved adapter and record it in the registry.
    pub async fn start(&self, spec: SpawnSpec) -> Result<AgentRecord, SupervisorError> {
        if !spec.approved_adapter_spawn || spec.adapter_id.is_none() {
            return Err(SupervisorError::RawCommandBlocked);
        }

        let id = AgentId::new(uuid::Uuid::new_v4().to_string());
        let mut child = Command::new(&spec.command)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SupervisorError::SpawnFailed(format!("{}: {e}", spec.command)))?;
        let pid = child.id();

        let record = AgentRecord {
            id: id.clone(),
            name: spec.name.clone(),
            command: spec.command.clone(),
            args: spec.args.clone(),
            cwd: spec.cwd.clone(),
            adapter_id: spec.adapter_id,
            project_name: spec.project_name.clone(),
            phase_id: spec.phase_id.clone(),
            task_id: spec.task_id.clone(),
            status: AgentRecordStatus::Running,
            pid,
            started_at: Some(self.clock.now_utc()),
            last_exit_code: None,
            output_tail: Vec::new(),
        };
        self.registry.mutate(|records| {
            records.retain(|r| r.id != record.id);
            records.push(record.clone());
        })?;

        let (agent_tx, _) = broadcast::channel(AGENT_CHANNEL_CAPACITY);
        let (kill_tx, kill_rx) = mpsc::channel(1);
        let (terminal_tx, terminal_rx) = watch::channel(None);
        let stdout_buf = Arc::new(Mutex::new(String::new()));
        let stderr_buf = Arc::new(Mutex::new(String::new()));

        let handle = AgentHandle {
            spec: spec.clone(),
            agent_tx: agent_tx.clone(),
            kill_tx,
            terminal_rx,
            stdout_buf: Arc::clone(&stdout_buf),
            stderr_buf: Arc::clone(&stderr_buf),
        };
        self.handles.lock().insert(id.clone(), handle);

        let context = self.context_for(&id, &spec);
        let last_output = Arc::new(Mutex::new(None::<Instant>));

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = self.spawn_reader(
            stdout,
            OutputStream::Stdout,
            context.clone(),
            agent_tx.clone(),
            Arc::clone(&stdout_buf),
            Arc::clone(&last_output),
            id.clone(),
        );
        let stderr_task = self.spawn_reader(
            stderr,
            OutputStream::Stderr,
            context.clone(),
            agent_tx.clone(),
            Arc::clone(&stderr_buf),
            Arc::clone(&last_output),
            id.clone(),
        );

        // Monitor: waits for exit, drives timeouts and diagnostics.
        let supervisor = self.clone();
        let monitor_id = id.clone();
        tokio::spawn(async move {
            supervisor
                .monitor(
                    monitor_id,
                    child,
                    kill_rx,
                    terminal_tx,
                    context,
                    agent_tx,
                    last_output,
                    vec![stdout_task, stderr_task],
                )
                .await;
        });

        self.registry.get(&id).map_err(Into::into)
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_reader(
        &self,
        stream: Option<impl tokio::io::AsyncRead + Unpin + Send + 'static>,
        kind: OutputStream,
        context: EventContext,
        agent_tx: broadcast::Sender<RuntimeEvent>,
        buffer: Arc<Mutex<String>>,
        last_output: Arc<Mutex<Option<Instant>>>,
        id: AgentId,
    ) -> tokio::task::JoinHandle<()> {
        let registry = self.registry.clone();
        let bus = self.bus.clone();
        tokio::spawn(async move {
            let Some(stream) = stream else { return };
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                *last_output.lock() = Some(Instant::now());
                {
                    let mut buf = buffer.lock();
                    buf.push_str(&line);
                    buf.push('\n');
                }
                if let Err(e) = registry.update(&id, |r| r.push_tail_line(line.clone())) {
                    debug!(error = %e, "tail update failed");
                }
                let diagnostic = parse_marker_line(&line);
                let event = RuntimeEvent::now(
                    EventSource::AgentSupervisor,
                    context.clone(),
                    EventPayload::AdapterOutput {
                        stream: kind,
                        line,
                        is_diagnostic: diagnostic.is_some().then_some(true),
                        metadata: diagnostic
                            .and_then(|d| serde_json::to_value(d).ok()),
                    },
                );
                let _ = agent_tx.send(event.clone());
                bus.emit(event);
            }
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn monitor(
        &self,
        id: AgentId,
        mut child: tokio::process::Child,
        mut kill_rx: mpsc::Receiver<()>,
        terminal_tx: watch::Sender<Option<Terminal>>,
        context: EventContext,
        agent_tx: broadcast::Sender<RuntimeEvent>,
        last_output: Arc<Mutex<Option<Instant>>>,
        readers: Vec<tokio::task::JoinHandle<()>>,
    ) {
        let started = Instant::now();
        let spec = {
            let handles = self.handles.lock();
            handles.get(&id).map(|h| h.spec.clone())
        };
        let (timeout, silence, idle_threshold, heartbeat_interval) = spec
            .map(|s| {
                (
                    s.timeout,
                    s.startup_silence_timeout,
                    s.idle_threshold,
                    s.heartbeat_interval,
                )
            })
            .unwrap_or((
                Duration::from_millis(3_600_000),
                Duration::from_millis(60_000),
                Duration::from_secs(120),
                Duration::from_secs(60),
            ));

        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_heartbeat = started;
        let mut last_idle_emit: Option<Instant> = None;
        let mut cancelled = false;
        let mut timed_out = false;

        let status = loop {
            tokio::select! {
                status = child.wait() => break status.ok(),
                _ = kill_rx.recv() => {
                    cancelled = true;
                    let _ = child.start_kill();
                    break child.wait().await.ok();
                }
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(started);
                    let last = *last_output.lock();
                    let seen_output = last.is_some();
                    let idle = last.map(|t| now.duration_since(t)).unwrap_or(elapsed);

                    if elapsed >= timeout {
                        timed_out = true;
                        self.emit_system_line(
                            &context,
                            &agent_tx,
                            format!("adapter exceeded timeout after {}s, killing", timeout.as_secs()),
                        );
                        let _ = child.start_kill();
                        break child.wait().await.ok();
                    }
                    if !seen_output && elapsed >= silence {
                        timed_out = true;
                        self.emit_system_line(
                            &context,
                            &agent_tx,
                            format!(
                                "adapter produced no output within {}s, killing",
                                silence.as_secs()
                            ),
                        );
                        let _ = child.start_kill();
                        break child.wait().await.ok();
                    }
                    if now.duration_since(last_heartbeat) >= heartbeat_interval {
                        last_heartbeat = now;
                        self.emit_diagnostic(
                            &context,
                            &agent_tx,
                            AgentDiagnostic::Heartbeat {
                                elapsed_ms: elapsed.as_millis() as u64,
                                idle_ms: idle.as_millis() as u64,
                            },
                        );
                        if idle > idle_threshold
                            && last_idle_emit
                                .map(|t| now.duration_since(t) >= heartbeat_interval)
                                .unwrap_or(true)
                        {
                            last_idle_emit = Some(now);
                            self.emit_diagnostic(
                                &context,
                                &agent_tx,
                                AgentDiagnostic::IdleDiagnostic {
                                    elapsed_ms: elapsed.as_millis() as u64,
                                    idle_ms: idle.as_millis() as u64,
                                    idle_threshold_ms: idle_threshold.as_millis() as u64,
                                },
                            );
                        }
                    }
                }
            }
        };

        // Drain readers so every adapter.output precedes the terminal event.
        for reader in readers {
            let _ = reader.await;
        }

        let exit_code = status.and_then(|s| s.code());
        let terminal = Terminal {
            exit_code,
            cancelled,
            timed_out,
        };
        let agent_status = if cancelled {
            AgentRecordStatus::Stopped
        } else if timed_out || exit_code != Some(0) {
            AgentRecordStatus::Failed
        } else {
            AgentRecordStatus::Stopped
        };

        match self.registry.update(&id, |r| {
            r.status = agent_status;
            r.last_exit_code = exit_code;
        }) {
            Ok(record) => {
                if agent_status == AgentRecordStatus::Failed {
                    let callback = self.on_failure.lock().clone();
                    if let Some(callback) = callback {
                        callback(&record);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, agent = %id, "terminal registry update failed");
            }
        }

        let outcome = if cancelled {
            OutcomeKind::Cancelled
        } else if agent_status == AgentRecordStatus::Failed {
            OutcomeKind::Failure
        } else {
            OutcomeKind::Success
        };
        let summary = if timed_out {
            "adapter killed after timeout".to_string()
        } else if cancelled {
            "adapter killed on request".to_string()
        } else {
            match exit_code {
                Some(0) => "adapter exited cleanly".to_string(),
                Some(code) => format!("adapter exited with code {code}"),
                None => "adapter terminated by signal".to_string(),
            }
        };
        let event = RuntimeEvent::now(
            EventSource::AgentSupervisor,
            context,
            EventPayload::TerminalOutcome {
                outcome,
                summary,
                agent_status: Some(agent_status),
                exit_code,
            },
        );
        let _ = agent_tx.send(event.clone());
        self.bus.emit(event);

        // Retain the captured output for late run_to_completion callers,
        // then drop the handle so the per-agent channel closes. Both maps
        // are updated under the completed lock so readers never observe
        // the agent in neither.
        {
            let mut completed = self.completed.lock();
            if let Some(handle) = self.handles.lock().remove(&id) {
                completed.insert(
                    id.clone(),
                    CompletedRun {
                        spec: handle.spec,
                        terminal,
                        stdout_buf: handle.stdout_buf,
                        stderr_buf: handle.stderr_buf,
                    },
                );
            }
        }
        let _ = terminal_tx.send(Some(terminal));
    }

    fn emit_diagnostic(
        &self,
        context: &EventContext,
        agent_tx: &broadcast::Sender<RuntimeEvent>,
        diagnostic: AgentDiagnostic,
    ) {
        let line = format_marker_line(diagnostic);
        let event = RuntimeEvent::now(
            EventSource::AgentSupervisor,
            context.clone(),
            EventPayload::AdapterOutput {
                stream: OutputStream::System,
                line,
                is_diagnostic: Some(true),
                metadata: serde_json::to_value(diagnostic).ok(),
            },
        );
        let _ = agent_tx.send(event.clone());
        self.bus.emit(event);
    }

    fn emit_system_line(
        &self,
        context: &EventContext,
        agent_tx: &broadcast::Sender<RuntimeEvent>,
        line: String,
    ) {
        let event = RuntimeEvent::now(
            EventSource::AgentSupervisor,
            context.clone(),
            EventPayload::AdapterOutput {
                stream: OutputStream::System,
                line,
                is_diagnostic: None,
                metadata: None,
            },
        );
        let _ = agent_tx.send(event.clone());
        self.bus.emit(event);
    }

    /// All registry rows, tolerantly loaded.
    pub fn list(&self) -> Vec<AgentRecord> {
        self.registry.load()
    }

    /// One registry row.
    pub fn get(&self, id: &AgentId) -> Result<AgentRecord, SupervisorError> {
        self.registry.get(id).map_err(|e| match e {
            RegistryError::AgentNotFound(s) => SupervisorError::AgentNotFound(s),
            other => SupervisorError::Registry(other),
        })
    }

    /// Kill an agent and wait for it to stop.
    ///
    /// Foreign rows (spawned by another controller) are killed by PID.
    pub async fn kill(&self, id: &AgentId) -> Result<AgentRecord, SupervisorError> {
        let record = self.get(id)?;
        if !record.is_running() {
            return Ok(record);
        }
        let handle = {
            let handles = self.handles.lock();
            handles
                .get(id)
                .map(|h| (h.kill_tx.clone(), h.terminal_rx.clone()))
        };
        match handle {
            Some((kill_tx, mut terminal_rx)) => {
                let _ = kill_tx.send(()).await;
                while terminal_rx.borrow().is_none() {
                    if terminal_rx.changed().await.is_err() {
                        break;
                    }
                }
            }
            None => {
                if let Some(pid) = record.pid {
                    let _ = Command::new("kill")
                        .args(["-TERM", &pid.to_string()])
                        .status()
                        .await;
                }
                self.registry
                    .update(id, |r| r.status = AgentRecordStatus::Stopped)?;
            }
        }
        self.get(id)
    }

    /// Kill and re-spawn with the original spec.
    ///
    /// Works for live children and for children that already exited this
    /// session; rows spawned by another controller cannot be restarted.
    pub async fn restart(&self, id: &AgentId) -> Result<AgentRecord, SupervisorError> {
        let spec = {
            let handles = self.handles.lock();
            handles.get(id).map(|h| h.spec.clone())
        }
        .or_else(|| {
            let completed = self.completed.lock();
            completed.get(id).map(|c| c.spec.clone())
        })
        .ok_or_else(|| SupervisorError::ForeignAgent(id.to_string()))?;
        self.kill(id).await?;
        self.start(spec).await
    }

    /// Update only the phase/task assignment of a registry row.
    pub fn assign(
        &self,
        id: &AgentId,
        phase_id: Option<PhaseId>,
        task_id: Option<TaskId>,
    ) -> Result<AgentRecord, SupervisorError> {
        self.registry
            .update(id, |r| {
                if phase_id.is_some() {
                    r.phase_id = phase_id.clone();
                }
                if task_id.is_some() {
                    r.task_id = task_id.clone();
                }
            })
            .map_err(|e| match e {
                RegistryError::AgentNotFound(s) => SupervisorError::AgentNotFound(s),
                other => SupervisorError::Registry(other),
            })
    }

    /// Subscribe to an agent's live events.
    ///
    /// The channel closes when the agent reaches a terminal state. Foreign
    /// rows cannot be subscribed.
    pub fn subscribe(
        &self,
        id: &AgentId,
    ) -> Result<broadcast::Receiver<RuntimeEvent>, SupervisorError> {
        if let Some(handle) = self.handles.lock().get(id) {
            return Ok(handle.agent_tx.subscribe());
        }
        if self.completed.lock().contains_key(id) {
            return Err(SupervisorError::AgentTerminated(id.to_string()));
        }
        if self.registry.get(id).is_ok() {
            Err(SupervisorError::ForeignAgent(id.to_string()))
        } else {
            Err(SupervisorError::AgentNotFound(id.to_string()))
        }
    }

    /// Start, await exit, and hand the caller the captured output.
    pub async fn run_to_completion(
        &self,
        spec: SpawnSpec,
    ) -> Result<RunToCompletion, SupervisorError> {
        let record = self.start(spec).await?;
        self.wait_to_completion(&record.id).await
    }

    /// Await the exit of an agent this controller already started.
    pub async fn wait_to_completion(
        &self,
        id: &AgentId,
    ) -> Result<RunToCompletion, SupervisorError> {
        let started = Instant::now();
        let id = id.clone();

        let live = {
            let handles = self.handles.lock();
            handles.get(&id).map(|handle| {
                (
                    handle.terminal_rx.clone(),
                    Arc::clone(&handle.stdout_buf),
                    Arc::clone(&handle.stderr_buf),
                )
            })
        };

        let (terminal, stdout_buf, stderr_buf) = match live {
            Some((mut terminal_rx, stdout_buf, stderr_buf)) => {
                let terminal = loop {
                    if let Some(terminal) = *terminal_rx.borrow() {
                        break terminal;
                    }
                    if terminal_rx.changed().await.is_err() {
                        break Terminal {
                            exit_code: None,
                            cancelled: false,
                            timed_out: false,
                        };
                    }
                };
                (terminal, stdout_buf, stderr_buf)
            }
            None => {
                // The child already exited; the monitor parked its result.
                let completed = self.completed.lock();
                let run = completed
                    .get(&id)
                    .ok_or_else(|| SupervisorError::AgentNotFound(id.to_string()))?;
                (
                    run.terminal,
                    Arc::clone(&run.stdout_buf),
                    Arc::clone(&run.stderr_buf),
                )
            }
        };

        let stdout = stdout_buf.lock().clone();
        let stderr = stderr_buf.lock().clone();

        Ok(RunToCompletion {
            id,
            stdout,
            stderr,
            exit_code: terminal.exit_code,
            duration_ms: started.elapsed().as_millis() as u64,
            cancelled: terminal.cancelled,
            timed_out: terminal.timed_out,
        })
    }

    /// Mark every RUNNING record matching `predicate` as STOPPED.
    ///
    /// Returns the number of rows reconciled. Used at startup to clear
    /// rows left behind by a crashed controller.
    pub fn reconcile_running_agents_where(
        &self,
        predicate: impl Fn(&AgentRecord) -> bool,
    ) -> Result<usize, SupervisorError> {
        let owned: std::collections::HashSet<AgentId> =
            self.handles.lock().keys().cloned().collect();
        self.registry
            .mutate(|records| {
                let mut count = 0;
                for record in records.iter_mut() {
                    if record.is_running() && !owned.contains(&record.id) && predicate(record) {
                        record.status = AgentRecordStatus::Stopped;
                        count += 1;
                    }
                }
                count
            })
            .map_err(Into::into)
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
