// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Axum HTTP endpoints for browsing revisions, current resources and per-service change history.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::domain::{Graph, Node, Resource, ResourceType};
use crate::history::{diff_graphs, service_history};
use crate::repository::{RevisionError, RevisionId, RevisionMeta};
use crate::state::{ActivityEvent, ActivityOverview, AppContext};

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

#[derive(Serialize)]
struct HealthResponse {
    service: String,
    version: String,
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    service: String,
    version: String,
    ready: bool,
    storage_ok: bool,
}

#[derive(Clone)]
struct HttpState {
    cfg: AppConfig,
    ctx: AppContext,
}

pub fn router(cfg: AppConfig, ctx: AppContext) -> Router {
    let state = HttpState { cfg, ctx };

    let api_router = Router::new()
        .route("/overview", get(api_overview))
        .route("/activity", get(api_activity))
        .route("/activity/clear", post(api_activity_clear))
        .route("/revisions", get(api_revisions))
        .route("/revisions/:id/:service", get(api_revision_snapshot))
        .route("/services/:service/resources", get(api_resources))
        .route("/services/:service/history", get(api_history))
        .route("/services/:service/diff", get(api_diff));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .nest("/api", api_router)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn serve(cfg: AppConfig, ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = cfg.http_addr;
    let app = router(cfg, ctx);

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind HTTP listener")?;

    tracing::info!(%addr, "http server listening");

    axum::serve(listener, app)
        .await
        .context("http server error")
}

async fn health_handler(State(state): State<HttpState>) -> Json<HealthResponse> {
    let cfg = state.cfg;
    Json(HealthResponse {
        service: cfg.service_name,
        version: cfg.version,
        status: "ok".to_string(),
    })
}

async fn ready_handler(State(state): State<HttpState>) -> Json<ReadyResponse> {
    let HttpState { cfg, ctx } = state;
    let storage_ok = match ctx.repo.health_check().await {
        Ok(_) => true,
        Err(err) => {
            tracing::error!(?err, "revision store health check failed");
            false
        }
    };
    Json(ReadyResponse {
        service: cfg.service_name,
        version: cfg.version,
        ready: storage_ok,
        storage_ok,
    })
}

#[derive(Debug, Deserialize)]
struct ResourceQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    by_day: bool,
}

#[derive(Debug, Deserialize)]
struct DiffQuery {
    from: String,
    to: String,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Serialize)]
struct DiffResponse {
    extras: Vec<String>,
    missings: Vec<String>,
}

impl DiffResponse {
    fn new(extras: &[Node], missings: &[Node]) -> Self {
        Self {
            extras: extras.iter().map(Node::to_string).collect(),
            missings: missings.iter().map(Node::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    from: Option<RevisionId>,
    to: RevisionId,
    date: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    changes: DiffResponse,
}

async fn api_overview(State(state): State<HttpState>) -> Json<ActivityOverview> {
    Json(state.ctx.activity.overview())
}

async fn api_activity(State(state): State<HttpState>) -> Json<Vec<ActivityEvent>> {
    Json(state.ctx.activity.history())
}

async fn api_activity_clear(State(state): State<HttpState>) -> Json<ApiMessage> {
    state.ctx.activity.clear_history();
    Json(ApiMessage {
        message: "activity cleared".into(),
    })
}

async fn api_revisions(State(state): State<HttpState>) -> ApiResult<Json<Vec<RevisionMeta>>> {
    let revisions = state.ctx.repo.list().await.map_err(revision_error)?;
    Ok(Json(revisions))
}

async fn api_revision_snapshot(
    State(state): State<HttpState>,
    Path((id, service)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let id: RevisionId = id.parse().map_err(revision_error)?;
    let mut rev = state.ctx.repo.load_rev(&id).await.map_err(revision_error)?;
    let graph = rev
        .graphs
        .remove(&service)
        .ok_or_else(|| unknown_service(&service))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        graph.to_string(),
    ))
}

async fn api_resources(
    State(state): State<HttpState>,
    Path(service): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Json<Vec<Resource>>> {
    let definition = *state
        .ctx
        .registry
        .get(&service)
        .ok_or_else(|| unknown_service(&service))?;

    let kinds: Vec<ResourceType> = match query.kind.as_deref() {
        Some(raw) => vec![raw.parse::<ResourceType>().map_err(|err| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
        })?],
        None => definition.resource_types.to_vec(),
    };

    let graph = state
        .ctx
        .repo
        .load_current(&service)
        .await
        .map_err(revision_error)?;

    let mut resources = Vec::new();
    for kind in kinds {
        resources.extend(graph.resources(kind).map_err(internal_error)?);
    }
    Ok(Json(resources))
}

async fn api_history(
    State(state): State<HttpState>,
    Path(service): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let history = service_history(
        state.ctx.repo.as_ref(),
        &service,
        state.cfg.history_limit,
        query.by_day,
    )
    .await
    .map_err(revision_error)?;

    let entries = history
        .into_iter()
        .map(|entry| HistoryEntry {
            from: entry.from.map(|meta| meta.id),
            to: entry.to.id,
            date: entry.to.date,
            changes: DiffResponse::new(entry.diff.extras(), entry.diff.missings()),
        })
        .collect();
    Ok(Json(entries))
}

async fn api_diff(
    State(state): State<HttpState>,
    Path(service): Path<String>,
    Query(query): Query<DiffQuery>,
) -> ApiResult<Json<DiffResponse>> {
    let from: RevisionId = query.from.parse().map_err(revision_error)?;
    let to: RevisionId = query.to.parse().map_err(revision_error)?;

    let older = load_service_graph(&state, &from, &service).await?;
    let newer = load_service_graph(&state, &to, &service).await?;

    let diff = diff_graphs(&newer, &older);
    Ok(Json(DiffResponse::new(diff.extras(), diff.missings())))
}

async fn load_service_graph(state: &HttpState, id: &RevisionId, service: &str) -> ApiResult<Graph> {
    let mut rev = state.ctx.repo.load_rev(id).await.map_err(revision_error)?;
    rev.graphs
        .remove(service)
        .ok_or_else(|| unknown_service(service))
}

fn unknown_service(service: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("unknown service '{service}'") })),
    )
}

fn internal_error(err: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    tracing::error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
}

fn revision_error(err: RevisionError) -> (StatusCode, Json<Value>) {
    match err {
        RevisionError::UnknownRevision(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": err.to_string() })),
        ),
        RevisionError::InvalidId(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string() })),
        ),
        other => internal_error(other),
    }
}
