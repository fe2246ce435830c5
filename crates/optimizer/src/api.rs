//! HTTP API: cost queries, optimization triggers, health and metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use optimizer_lib::{
    engine::CostEngine,
    health::{ComponentStatus, HealthRegistry},
    EngineError, TriggerOutcome,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CostEngine>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(engine: Arc<CostEngine>, health_registry: HealthRegistry) -> Self {
        Self {
            engine,
            health_registry,
        }
    }
}

/// JSON error body with a status derived from the engine error
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::ActionNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::ActionInProgress(_) => StatusCode::CONFLICT,
            EngineError::ExecutionFailed { .. } => StatusCode::BAD_GATEWAY,
            EngineError::SchedulerStopped => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn node_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.node_metrics().await)
}

async fn pod_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.pod_metrics().await)
}

async fn recommendations(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.recommendations().await)
}

async fn cost_summary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.cost_summary().await)
}

/// Queue an analysis cycle; returns before the cycle runs
async fn optimize(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let body = match state.engine.trigger_optimize()? {
        TriggerOutcome::Queued => json!({
            "status": "optimization_triggered",
            "message": "Cost analysis has been triggered",
        }),
        TriggerOutcome::Coalesced => json!({
            "status": "optimization_coalesced",
            "message": "A cost analysis is already pending",
        }),
    };
    Ok((StatusCode::ACCEPTED, Json(body)))
}

async fn list_actions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.list_actions().await)
}

async fn execute_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!(action_id = %id, "Executing optimization action");
    let action = state.engine.execute_action(&id).await?;
    Ok(Json(action))
}

/// Health check - 200 while operational, 503 once a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness - 503 until the first cycle has been published
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Plain liveness response
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/metrics/nodes", get(node_metrics))
        .route("/api/metrics/pods", get(pod_metrics))
        .route("/api/recommendations", get(recommendations))
        .route("/api/cost-summary", get(cost_summary))
        .route("/api/optimize", post(optimize))
        .route("/api/actions", get(list_actions))
        .route("/api/actions/:id/execute", post(execute_action))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
