// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ixado_core::{test_support, SystemClock};
use std::time::Duration;
use tempfile::TempDir;

fn supervisor(dir: &TempDir) -> AgentSupervisor<SystemClock> {
    let registry = RegistryFile::new(dir.path().join("agents.json"));
    AgentSupervisor::new(registry, RuntimeBus::new(), SystemClock)
}

fn shell_spec(script: &str, dir: &TempDir) -> SpawnSpec {
    SpawnSpec::new("mock", "/bin/sh", dir.path())
        .with_args(vec!["-c".to_string(), script.to_string()])
        .approved(ixado_core::AdapterId::MockCli)
}

#[tokio::test]
async fn raw_command_spawns_are_blocked() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let mut spec = shell_spec("echo hi", &dir);
    spec.approved_adapter_spawn = false;
    assert!(matches!(
        sup.start(spec).await,
        Err(SupervisorError::RawCommandBlocked)
    ));

    let mut spec = shell_spec("echo hi", &dir);
    spec.adapter_id = None;
    assert!(matches!(
        sup.start(spec).await,
        Err(SupervisorError::RawCommandBlocked)
    ));
}

#[tokio::test]
async fn run_to_completion_captures_output_and_exit() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let outcome = sup
        .run_to_completion(shell_spec("echo done; echo oops >&2", &dir))
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.succeeded());
    assert_eq!(outcome.stdout, "done\n");
    assert_eq!(outcome.stderr, "oops\n");
    assert!(!outcome.cancelled);
    assert!(!outcome.timed_out);

    // The registry row ends STOPPED with the exit code recorded.
    let record = sup.get(&outcome.id).unwrap();
    assert_eq!(record.status, AgentRecordStatus::Stopped);
    assert_eq!(record.last_exit_code, Some(0));
    assert_eq!(record.output_tail, vec!["done".to_string(), "oops".to_string()]);
}

#[tokio::test]
async fn nonzero_exit_marks_failed() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let outcome = sup
        .run_to_completion(shell_spec("echo broken >&2; exit 3", &dir))
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, Some(3));
    assert!(!outcome.succeeded());

    let record = sup.get(&outcome.id).unwrap();
    assert_eq!(record.status, AgentRecordStatus::Failed);
    assert_eq!(record.last_exit_code, Some(3));
}

#[tokio::test]
async fn startup_silence_kills_the_child() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let mut spec = shell_spec("sleep 30", &dir);
    spec.startup_silence_timeout = Duration::from_millis(200);
    let outcome = sup.run_to_completion(spec).await.unwrap();
    assert!(outcome.timed_out);
    assert!(!outcome.succeeded());

    let record = sup.get(&outcome.id).unwrap();
    assert_eq!(record.status, AgentRecordStatus::Failed);
}

#[tokio::test]
async fn overall_timeout_kills_a_chatty_child() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    // Emits output immediately (so silence does not trigger) then hangs.
    let mut spec = shell_spec("echo starting; sleep 30", &dir);
    spec.timeout = Duration::from_millis(400);
    let outcome = sup.run_to_completion(spec).await.unwrap();
    assert!(outcome.timed_out);
    assert_eq!(outcome.stdout, "starting\n");
}

#[tokio::test]
async fn kill_stops_a_running_agent() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let record = sup
        .start(shell_spec("echo up; sleep 30", &dir))
        .await
        .unwrap();
    // Give the child a moment to come up.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let killed = sup.kill(&record.id).await.unwrap();
    assert_eq!(killed.status, AgentRecordStatus::Stopped);

    // Idempotent: killing a stopped agent is a no-op.
    let again = sup.kill(&record.id).await.unwrap();
    assert_eq!(again.status, AgentRecordStatus::Stopped);
}

#[tokio::test]
async fn kill_unknown_agent_fails() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);
    assert!(matches!(
        sup.kill(&"ghost".into()).await,
        Err(SupervisorError::AgentNotFound(_))
    ));
}

#[tokio::test]
async fn subscribe_streams_output_then_closes() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let record = sup
        .start(shell_spec("sleep 0.2; echo one; echo two", &dir))
        .await
        .unwrap();
    let mut rx = sup.subscribe(&record.id).unwrap();

    let mut lines = Vec::new();
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let ixado_core::EventPayload::AdapterOutput { line, .. } = event.payload {
                    lines.push(line);
                } else if let ixado_core::EventPayload::TerminalOutcome { .. } = event.payload {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
}

#[tokio::test]
async fn restart_respawns_with_the_original_spec() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let outcome = sup
        .run_to_completion(shell_spec("echo first", &dir))
        .await
        .unwrap();
    let restarted = sup.restart(&outcome.id).await.unwrap();
    assert_ne!(restarted.id, outcome.id);
    assert_eq!(restarted.command, "/bin/sh");

    let second = sup.wait_to_completion(&restarted.id).await.unwrap();
    assert_eq!(second.stdout, "first\n");
}

#[tokio::test]
async fn assign_updates_only_the_registry_row() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let outcome = sup
        .run_to_completion(shell_spec("echo x", &dir))
        .await
        .unwrap();
    let updated = sup
        .assign(
            &outcome.id,
            Some("phase-1".into()),
            Some("task-1".into()),
        )
        .unwrap();
    assert_eq!(updated.phase_id, Some("phase-1".into()));
    assert_eq!(updated.task_id, Some("task-1".into()));
}

#[tokio::test]
async fn reconcile_marks_dead_rows_stopped() {
    let dir = TempDir::new().unwrap();
    let registry = RegistryFile::new(dir.path().join("agents.json"));

    // Pre-seed a RUNNING row whose PID cannot be alive.
    let mut stale = test_support::running_agent(1);
    stale.pid = Some(999_999);
    registry.save(&[stale]).unwrap();

    let sup = AgentSupervisor::new(registry.clone(), RuntimeBus::new(), SystemClock);
    let count = sup
        .reconcile_running_agents_where(|r| r.pid.map(|p| !pid_alive(p)).unwrap_or(true))
        .unwrap();
    assert_eq!(count, 1);

    let rows = registry.load();
    assert_eq!(rows[0].status, AgentRecordStatus::Stopped);

    // Second run reconciles nothing.
    let count = sup
        .reconcile_running_agents_where(|_| true)
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn on_failure_callback_fires_for_failed_agents() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);
    let seen: Arc<Mutex<Vec<AgentId>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    sup.set_on_failure(Arc::new(move |record: &AgentRecord| {
        sink.lock().push(record.id.clone());
    }));

    let failed = sup
        .run_to_completion(shell_spec("exit 7", &dir))
        .await
        .unwrap();
    let ok = sup
        .run_to_completion(shell_spec("echo fine", &dir))
        .await
        .unwrap();

    let seen = seen.lock().clone();
    assert_eq!(seen, vec![failed.id]);
    assert_ne!(ok.exit_code, Some(7));
}

#[tokio::test]
async fn heartbeat_diagnostics_flow_through_the_stream() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let mut spec = shell_spec("sleep 1", &dir);
    spec.heartbeat_interval = Duration::from_millis(150);
    spec.startup_silence_timeout = Duration::from_secs(10);
    let record = sup.start(spec).await.unwrap();
    let mut rx = sup.subscribe(&record.id).unwrap();

    let mut saw_heartbeat = false;
    loop {
        match rx.recv().await {
            Ok(event) => match event.payload {
                ixado_core::EventPayload::AdapterOutput {
                    line,
                    is_diagnostic: Some(true),
                    ..
                } => {
                    if crate::diagnostics::parse_marker_line(&line).is_some() {
                        saw_heartbeat = true;
                    }
                }
                ixado_core::EventPayload::TerminalOutcome { .. } => break,
                _ => {}
            },
            Err(_) => break,
        }
    }
    assert!(saw_heartbeat);
}

#[tokio::test]
async fn marker_lines_from_the_child_are_flagged_diagnostic() {
    let dir = TempDir::new().unwrap();
    let sup = supervisor(&dir);

    let marker = crate::diagnostics::format_marker_line(
        crate::diagnostics::AgentDiagnostic::Heartbeat {
            elapsed_ms: 1000,
            idle_ms: 0,
        },
    );
    let script = format!("sleep 0.2; echo '{marker}'");
    let record = sup.start(shell_spec(&script, &dir)).await.unwrap();
    let mut rx = sup.subscribe(&record.id).unwrap();

    let mut diagnostic_seen = false;
    loop {
        match rx.recv().await {
            Ok(event) => match event.payload {
                ixado_core::EventPayload::AdapterOutput {
                    is_diagnostic,
                    metadata,
                    ..
                } => {
                    if is_diagnostic == Some(true) {
                        diagnostic_seen = true;
                        assert!(metadata.is_some());
                    }
                }
                ixado_core::EventPayload::TerminalOutcome { .. } => break,
                _ => {}
            },
            Err(_) => break,
        }
    }
    assert!(diagnostic_seen);
}
