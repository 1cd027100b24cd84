// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the control plane.
//!
//! Bodies are JSON; validation failures and domain errors return status
//! 400 with `{"error": string}`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, patch, post},
    Router,
};
use ixado_adapters::{AdapterCatalog, GhAdapter, GitAdapter, SystemGh, SystemGit};
use ixado_core::{
    AdapterId, AgentId, AgentRecord, Assignee, EventContext, EventPayload, EventSource,
    OutputStream, PhaseId, RuntimeEvent, SystemClock, TaskId,
};
use ixado_engine::{
    ControlCenter, PhaseRunner, RunnerError, ServiceError, SpawnSpec, SupervisorError, TaskPatch,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::stream::enrich_event;

/// The production runner type served by `ixado serve`.
pub type WebRunner = PhaseRunner<SystemClock, SystemGit, SystemGh>;

/// Shared handler state.
pub struct AppState<G: GitAdapter = SystemGit, H: GhAdapter = SystemGh> {
    pub runner: PhaseRunner<SystemClock, G, H>,
}

/// Uniform error envelope: status 400 + `{"error"}`.
pub struct ApiError(String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.0 }))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e.to_string())
    }
}

impl From<SupervisorError> for ApiError {
    fn from(e: SupervisorError) -> Self {
        ApiError(e.to_string())
    }
}

impl From<RunnerError> for ApiError {
    fn from(e: RunnerError) -> Self {
        ApiError(e.to_string())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the control-plane router.
pub fn router<G: GitAdapter, H: GhAdapter>(state: Arc<AppState<G, H>>) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/phases", post(create_phase))
        .route("/api/phases/active", post(set_active_phase))
        .route("/api/tasks", post(create_task))
        .route("/api/tasks/:id", patch(update_task))
        .route("/api/tasks/start", post(start_task))
        .route("/api/tasks/reset", post(reset_task))
        .route("/api/agents", get(list_agents))
        .route("/api/agents/start", post(start_agent))
        .route("/api/agents/:id/kill", post(kill_agent))
        .route("/api/agents/:id/assign", post(assign_agent))
        .route("/api/agents/:id/restart", post(restart_agent))
        .route("/api/agents/:id/logs/stream", get(agent_log_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl<G: GitAdapter, H: GhAdapter> AppState<G, H> {
    fn service(&self) -> &ControlCenter<SystemClock> {
        self.runner.service()
    }
}

// --- state & phases ---

async fn get_state<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
) -> ApiResult<ixado_core::ProjectState> {
    Ok(Json(state.service().get_state()?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreatePhaseBody {
    name: String,
    branch_name: String,
}

async fn create_phase<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Json(body): Json<CreatePhaseBody>,
) -> ApiResult<ixado_core::Phase> {
    Ok(Json(
        state.service().create_phase(&body.name, &body.branch_name)?,
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SetActivePhaseBody {
    phase_id: PhaseId,
}

async fn set_active_phase<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Json(body): Json<SetActivePhaseBody>,
) -> ApiResult<ixado_core::Phase> {
    Ok(Json(state.service().set_active_phase(&body.phase_id)?))
}

// --- tasks ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateTaskBody {
    phase_id: PhaseId,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    assignee: Assignee,
    #[serde(default)]
    dependencies: Vec<TaskId>,
}

async fn create_task<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Json(body): Json<CreateTaskBody>,
) -> ApiResult<ixado_core::Task> {
    Ok(Json(state.service().create_task(
        &body.phase_id,
        &body.title,
        &body.description,
        body.assignee,
        body.dependencies,
    )?))
}

async fn update_task<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<ixado_core::Task> {
    Ok(Json(state.service().update_task(&TaskId::new(id), patch)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TaskIdBody {
    task_id: TaskId,
}

async fn start_task<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Json(body): Json<TaskIdBody>,
) -> ApiResult<ixado_core::Task> {
    // Validate existence before handing off to the background dispatch.
    let current = state.service().get_state()?;
    let task = current
        .find_task(&body.task_id)
        .map(|(_, t)| t.clone())
        .ok_or_else(|| ApiError(format!("task not found: {}", body.task_id)))?;
    state.runner.start_task(body.task_id);
    Ok(Json(task))
}

async fn reset_task<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Json(body): Json<TaskIdBody>,
) -> ApiResult<ixado_core::Task> {
    Ok(Json(state.service().reset_task_to_todo(&body.task_id)?))
}

// --- agents ---

/// Sort registry rows by `startedAt` descending; undated rows last.
pub fn sort_agents(mut records: Vec<AgentRecord>) -> Vec<AgentRecord> {
    records.sort_by(|a, b| match (&b.started_at, &a.started_at) {
        (Some(b_at), Some(a_at)) => b_at.cmp(a_at),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => std::cmp::Ordering::Equal,
    });
    records
}

async fn list_agents<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
) -> ApiResult<Vec<AgentRecord>> {
    Ok(Json(sort_agents(state.runner.supervisor().list())))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StartAgentBody {
    adapter_id: AdapterId,
    prompt: String,
    #[serde(default)]
    phase_id: Option<PhaseId>,
    #[serde(default)]
    task_id: Option<TaskId>,
}

async fn start_agent<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Json(body): Json<StartAgentBody>,
) -> ApiResult<AgentRecord> {
    // Adapter-approved spawns only: the body names a catalog adapter and
    // the composed invocation carries the approval flag.
    let current = state.service().get_state()?;
    let catalog = AdapterCatalog::new(state.service().settings().clone());
    let invocation = catalog.invocation(body.adapter_id, &body.prompt);
    let mut spec = SpawnSpec::new(
        AdapterCatalog::display_name(body.adapter_id),
        invocation.program,
        current.root_dir.clone(),
    )
    .with_args(invocation.args)
    .approved(body.adapter_id);
    spec.project_name = Some(current.project_name);
    spec.phase_id = body.phase_id;
    spec.task_id = body.task_id;
    spec.timeout = invocation.timeout;
    spec.startup_silence_timeout = invocation.startup_silence_timeout;

    Ok(Json(state.runner.supervisor().start(spec).await?))
}

async fn kill_agent<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Path(id): Path<String>,
) -> ApiResult<AgentRecord> {
    Ok(Json(
        state.runner.supervisor().kill(&AgentId::new(id)).await?,
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AssignBody {
    #[serde(default)]
    phase_id: Option<PhaseId>,
    #[serde(default)]
    task_id: Option<TaskId>,
}

async fn assign_agent<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Path(id): Path<String>,
    Json(body): Json<AssignBody>,
) -> ApiResult<AgentRecord> {
    Ok(Json(state.runner.supervisor().assign(
        &AgentId::new(id),
        body.phase_id,
        body.task_id,
    )?))
}

async fn restart_agent<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Path(id): Path<String>,
) -> ApiResult<AgentRecord> {
    let agent_id = AgentId::new(id);
    // Reconcile the attached task back to TODO first; the restart proceeds
    // even when reconciliation fails.
    if let Ok(record) = state.runner.supervisor().get(&agent_id) {
        if let Some(task_id) = record.task_id {
            if let Err(e) = state
                .service()
                .reconcile_in_progress_task_to_todo(&task_id)
            {
                warn!(error = %e, task = %task_id, "restart: task reconcile failed");
            }
        }
    }
    Ok(Json(state.runner.supervisor().restart(&agent_id).await?))
}

// --- live log stream ---

async fn agent_log_stream<G: GitAdapter, H: GhAdapter>(
    State(state): State<Arc<AppState<G, H>>>,
    Path(id): Path<String>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>, ApiError>
{
    let agent_id = AgentId::new(id);
    let supervisor = state.runner.supervisor().clone();
    let record = supervisor.get(&agent_id)?;
    // Subscribe before replaying the tail so no line is lost in between.
    let live = supervisor.subscribe(&agent_id);
    let project_state = state.service().get_state().ok();

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    let replay_context = EventContext {
        project_name: record.project_name.clone(),
        phase_id: record.phase_id.clone(),
        task_id: record.task_id.clone(),
        agent_id: Some(record.id.clone()),
        adapter_id: record.adapter_id,
        ..Default::default()
    };
    for line in &record.output_tail {
        let event = RuntimeEvent::now(
            EventSource::WebApi,
            replay_context.clone(),
            EventPayload::AdapterOutput {
                stream: OutputStream::Stdout,
                line: line.clone(),
                is_diagnostic: None,
                metadata: None,
            },
        );
        if let Some(frame) = enrich_event(&event, &record, project_state.as_ref()) {
            if let Ok(json) = serde_json::to_string(&frame) {
                let _ = tx.send(json);
            }
        }
    }

    match live {
        Ok(mut events) => {
            let service = state.runner.service().clone();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => {
                            let terminal = matches!(
                                event.payload,
                                EventPayload::TerminalOutcome { .. }
                            );
                            // Re-fetch the row so terminal frames see the
                            // final tail for their failure summary.
                            let row = supervisor
                                .get(&agent_id)
                                .unwrap_or_else(|_| record.clone());
                            let current_state = service.get_state().ok();
                            if let Some(frame) =
                                enrich_event(&event, &row, current_state.as_ref())
                            {
                                if let Ok(json) = serde_json::to_string(&frame) {
                                    if tx.send(json).is_err() {
                                        return;
                                    }
                                }
                            }
                            if terminal {
                                return;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => return,
                    }
                }
            });
        }
        Err(SupervisorError::AgentTerminated(_)) | Err(SupervisorError::ForeignAgent(_)) => {
            // Nothing live to follow: the replayed tail is the whole story.
        }
        Err(e) => return Err(e.into()),
    }

    let stream = UnboundedReceiverStream::new(rx)
        .map(|data| Ok::<_, std::convert::Infallible>(Event::default().data(data)));
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    ))
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
