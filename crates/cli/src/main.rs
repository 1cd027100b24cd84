// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ixado: local multi-agent orchestrator CLI

mod exit_error;
mod logging;
mod output;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use ixado_adapters::notify::{TelegramConsumer, TelegramSink};
use ixado_adapters::{SystemGh, SystemGit};
use ixado_core::{Assignee, FailureKind, PhaseId, PhaseStatus, SystemClock, TaskId};
use ixado_engine::{AgentSupervisor, ControlCenter, PhaseRunner, RuntimeBus};
use ixado_storage::{ProjectPaths, RegistryFile};
use ixado_web::AppState;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ixado", version, about = "Local multi-agent orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a project in the current directory
    Init {
        /// Project name
        name: String,
        /// Project root (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print a project summary
    Status,
    /// Phase operations
    Phase {
        #[command(subcommand)]
        command: PhaseCommand,
    },
    /// Task operations
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Run the execution loop for the active phase
    Run,
    /// Agent registry operations
    Agents {
        #[command(subcommand)]
        command: AgentCommand,
    },
    /// Run an ad-hoc prompt through an adapter without touching tasks
    Work {
        /// Adapter (CODEX_CLI, CLAUDE_CLI, GEMINI_CLI, MOCK_CLI)
        adapter: String,
        prompt: String,
    },
    /// Serve the web control plane
    Serve {
        #[arg(long, default_value_t = 4400)]
        port: u16,
    },
}

#[derive(Subcommand)]
enum PhaseCommand {
    /// Create a phase
    Create { name: String, branch: String },
    /// Select the active phase
    Active { phase_id: String },
    /// Set a phase status
    Status {
        phase_id: String,
        status: String,
        #[arg(long)]
        failure_kind: Option<String>,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Create a task in a phase
    Create {
        phase_id: String,
        title: String,
        #[arg(default_value = "")]
        description: String,
        /// Adapter assignee (CODEX_CLI, CLAUDE_CLI, GEMINI_CLI, MOCK_CLI)
        #[arg(long, default_value = "UNASSIGNED")]
        assignee: String,
        /// Task IDs this task depends on
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
    },
    /// List tasks of the active phase
    List,
    /// Dispatch a task and wait for the result
    Start { task_id: String },
    /// Reset a task back to TODO
    Reset { task_id: String },
}

#[derive(Subcommand)]
enum AgentCommand {
    /// List registry rows, newest first
    List,
    /// Kill an agent
    Kill { agent_id: String },
    /// Kill and re-spawn an agent with its original spec
    Restart { agent_id: String },
    /// Re-point a registry row at a phase/task
    Assign {
        agent_id: String,
        #[arg(long)]
        phase: Option<String>,
        #[arg(long)]
        task: Option<String>,
    },
}

/// Parse a SCREAMING_SNAKE wire value via its serde representation.
fn parse_wire<T: DeserializeOwned>(kind: &str, value: &str) -> anyhow::Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| anyhow!("unknown {kind}: {value}"))
}

struct Workspace {
    service: ControlCenter<SystemClock>,
    runner: PhaseRunner<SystemClock, SystemGit, SystemGh>,
}

fn open_workspace() -> anyhow::Result<Workspace> {
    let root = std::env::current_dir().context("cannot resolve current directory")?;
    let service = ControlCenter::open(&root, SystemClock)?;
    let registry = RegistryFile::new(service.paths().registry_file());
    let supervisor = AgentSupervisor::new(registry, RuntimeBus::new(), SystemClock);
    let runner = PhaseRunner::new(
        service.clone(),
        supervisor,
        SystemGit::new(&root),
        SystemGh::new(&root),
    );
    Ok(Workspace { service, runner })
}

#[tokio::main]
async fn main() {
    // Argument errors exit 1 like every other validation failure; help and
    // version requests exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                clap::error::ErrorKind::DisplayHelp
                | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let paths = ProjectPaths::resolve(&root);
    let _log_guard = logging::init(paths.cli_log_file());

    if let Err(error) = run(cli).await {
        eprintln!("{}", exit_error::render(&error));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init { name, root } => {
            let root = match root {
                Some(root) => root,
                None => std::env::current_dir()?,
            };
            let service = ControlCenter::open(&root, SystemClock)?;
            let state = service.ensure_initialized(&name, &root)?;
            println!(
                "Initialized project {} at {}",
                state.project_name,
                state.root_dir.display()
            );
        }
        Command::Status => {
            let ws = open_workspace()?;
            let state = ws.service.get_state()?;
            println!("Project: {}", state.project_name);
            for phase in &state.phases {
                let marker = if state.active_phase_id.as_ref() == Some(&phase.id) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {} [{}] ({} task(s)) {}",
                    phase.name,
                    phase.status,
                    phase.tasks.len(),
                    phase.pr_url.as_deref().unwrap_or("")
                );
                for task in &phase.tasks {
                    println!("    - {} [{}] {}", task.title, task.status, task.assignee);
                }
            }
        }
        Command::Phase { command } => run_phase(command).await?,
        Command::Task { command } => run_task(command).await?,
        Command::Run => {
            let ws = open_workspace()?;
            let report = ws.runner.reconcile_on_startup()?;
            println!(
                "Reconciled {} stale agent(s), {} orphaned task(s)",
                report.stale_agents, report.reset_tasks
            );
            let printer = output::spawn_printer(ws.runner.bus());
            let telegram = spawn_telegram_consumer(&ws);
            let outcome = ws.runner.run_active_phase().await?;
            printer.abort();
            if let Some(telegram) = telegram {
                telegram.abort();
            }
            println!("Run finished: {outcome:?}");
        }
        Command::Agents { command } => run_agents(command).await?,
        Command::Work { adapter, prompt } => {
            let ws = open_workspace()?;
            let assignee: Assignee = parse_wire("assignee", &adapter)?;
            let result = ws.runner.run_internal_work(assignee, &prompt).await?;
            print!("{}", result.stdout);
            if !result.succeeded() {
                eprint!("{}", result.stderr);
                return Err(anyhow!(
                    "adapter exited with {:?}",
                    result.exit_code
                ));
            }
        }
        Command::Serve { port } => {
            let ws = open_workspace()?;
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            let state = Arc::new(AppState { runner: ws.runner });
            ixado_web::serve(state, addr).await?;
        }
    }
    Ok(())
}

/// Bridge bus events to Telegram when a bot is configured.
fn spawn_telegram_consumer(ws: &Workspace) -> Option<tokio::task::JoinHandle<()>> {
    let telegram = &ws.service.settings().telegram;
    let (token, chat_id) = match (&telegram.bot_token, &telegram.chat_id) {
        (Some(token), Some(chat_id)) => (token.clone(), chat_id.clone()),
        _ => return None,
    };
    let consumer = TelegramConsumer::new(
        TelegramSink::new(token, chat_id),
        telegram.noise_level,
        telegram.suppress_duplicates,
    );
    let mut rx = ws.runner.bus().subscribe();
    Some(tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    consumer.handle(&event).await;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }))
}

async fn run_phase(command: PhaseCommand) -> anyhow::Result<()> {
    let ws = open_workspace()?;
    match command {
        PhaseCommand::Create { name, branch } => {
            let phase = ws.service.create_phase(&name, &branch)?;
            println!("Created phase {} ({})", phase.name, phase.id);
        }
        PhaseCommand::Active { phase_id } => {
            let phase = ws.service.set_active_phase(&PhaseId::new(phase_id))?;
            println!("Active phase: {}", phase.name);
        }
        PhaseCommand::Status {
            phase_id,
            status,
            failure_kind,
        } => {
            let status: PhaseStatus = parse_wire("phase status", &status)?;
            let failure_kind: Option<FailureKind> = failure_kind
                .map(|k| parse_wire("failure kind", &k))
                .transpose()?;
            let phase =
                ws.service
                    .set_phase_status(&PhaseId::new(phase_id), status, failure_kind)?;
            println!("Phase {} → {}", phase.name, phase.status);
        }
    }
    Ok(())
}

async fn run_task(command: TaskCommand) -> anyhow::Result<()> {
    let ws = open_workspace()?;
    match command {
        TaskCommand::Create {
            phase_id,
            title,
            description,
            assignee,
            depends_on,
        } => {
            let assignee: Assignee = parse_wire("assignee", &assignee)?;
            let dependencies = depends_on.into_iter().map(TaskId::new).collect();
            let task = ws.service.create_task(
                &PhaseId::new(phase_id),
                &title,
                &description,
                assignee,
                dependencies,
            )?;
            println!("Created task {} ({})", task.title, task.id);
        }
        TaskCommand::List => {
            let state = ws.service.get_state()?;
            let phase = ixado_storage::resolve_active_phase_strict(&state)?;
            for (i, task) in phase.tasks.iter().enumerate() {
                println!(
                    "{}. {} [{}] {} ({})",
                    i + 1,
                    task.title,
                    task.status,
                    task.assignee,
                    task.id
                );
            }
        }
        TaskCommand::Start { task_id } => {
            let printer = output::spawn_printer(ws.runner.bus());
            let task = ws.runner.start_task_and_wait(&TaskId::new(task_id)).await?;
            printer.abort();
            println!("Task {} finished as {}", task.title, task.status);
        }
        TaskCommand::Reset { task_id } => {
            let task = ws.service.reset_task_to_todo(&TaskId::new(task_id))?;
            println!("Task {} reset to {}", task.title, task.status);
        }
    }
    Ok(())
}

async fn run_agents(command: AgentCommand) -> anyhow::Result<()> {
    let ws = open_workspace()?;
    let supervisor = ws.runner.supervisor();
    match command {
        AgentCommand::List => {
            for record in ixado_web::sort_agents(supervisor.list()) {
                println!(
                    "{} {} [{}] pid={} {}",
                    record.id.short(8),
                    record.name,
                    record.status,
                    record
                        .pid
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    record
                        .adapter_id
                        .map(|a| a.to_string())
                        .unwrap_or_default()
                );
            }
        }
        AgentCommand::Kill { agent_id } => {
            let record = supervisor.kill(&agent_id.into()).await?;
            println!("Agent {} is {}", record.name, record.status);
        }
        AgentCommand::Restart { agent_id } => {
            let record = supervisor.restart(&agent_id.into()).await?;
            println!("Agent {} restarted as {}", record.name, record.id);
        }
        AgentCommand::Assign {
            agent_id,
            phase,
            task,
        } => {
            let record = supervisor.assign(
                &agent_id.into(),
                phase.map(PhaseId::new),
                task.map(TaskId::new),
            )?;
            println!("Agent {} assigned", record.id.short(8));
        }
    }
    Ok(())
}

