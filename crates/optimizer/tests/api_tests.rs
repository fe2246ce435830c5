//! Integration tests for the optimizer HTTP API

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use cost_optimizer::api::{create_router, AppState};
use optimizer_lib::{
    engine::{CostEngine, RefreshScheduler, RefreshSchedulerBuilder},
    health::{components, HealthRegistry},
    provider::{ActionExecutor, InventoryProvider, LoggingExecutor, MetricsProvider},
    ActionCatalog, ContainerResourceSpec, ContainerUsage, DeploymentDescriptor, NodeDescriptor,
    NodeUsageSample, OptimizationAction, PodDescriptor, PodPhase, PodUsageSample, ProviderError,
    StructuredLogger,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower::ServiceExt;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

struct StaticInventory;

#[async_trait]
impl InventoryProvider for StaticInventory {
    async fn list_nodes(&self) -> Result<Vec<NodeDescriptor>, ProviderError> {
        Ok(vec![NodeDescriptor {
            name: "ip-10-0-1-5".to_string(),
            cpu_capacity_millicores: 2000,
            memory_capacity_bytes: 8 * GIB,
            instance_type_label: Some("t3.large".to_string()),
        }])
    }

    async fn list_pods(&self, _namespace: Option<&str>) -> Result<Vec<PodDescriptor>, ProviderError> {
        Ok(vec![PodDescriptor {
            name: "web-0".to_string(),
            namespace: "shop".to_string(),
            phase: PodPhase::Running,
            containers: vec![ContainerResourceSpec {
                name: "app".to_string(),
                cpu_request_millicores: Some(500),
                memory_request_bytes: Some(512 * MIB),
                cpu_limit_millicores: Some(1000),
                memory_limit_bytes: Some(GIB),
                resource_maps_set: true,
            }],
        }])
    }

    async fn list_deployments(
        &self,
        _namespace: Option<&str>,
    ) -> Result<Vec<DeploymentDescriptor>, ProviderError> {
        Ok(vec![DeploymentDescriptor {
            name: "web".to_string(),
            namespace: "shop".to_string(),
            replicas: 3,
            containers: vec![ContainerResourceSpec {
                name: "app".to_string(),
                cpu_request_millicores: Some(500),
                ..Default::default()
            }],
        }])
    }
}

struct StaticMetrics;

#[async_trait]
impl MetricsProvider for StaticMetrics {
    async fn list_node_metrics(&self) -> Result<Vec<NodeUsageSample>, ProviderError> {
        Ok(vec![NodeUsageSample {
            name: "ip-10-0-1-5".to_string(),
            cpu_millicores: 150,
            memory_bytes: 500 * MIB,
        }])
    }

    async fn list_pod_metrics(
        &self,
        _namespace: Option<&str>,
    ) -> Result<Vec<PodUsageSample>, ProviderError> {
        Ok(vec![PodUsageSample {
            name: "web-0".to_string(),
            namespace: "shop".to_string(),
            containers: vec![ContainerUsage {
                name: "app".to_string(),
                cpu_millicores: 400,
                memory_bytes: 100 * MIB,
            }],
        }])
    }
}

struct RejectingExecutor;

#[async_trait]
impl ActionExecutor for RejectingExecutor {
    async fn execute(&self, _action: &OptimizationAction) -> Result<(), ProviderError> {
        Err(ProviderError::unavailable("scale_deployment", "forbidden"))
    }
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    scheduler: Option<RefreshScheduler>,
    shutdown: broadcast::Sender<()>,
}

impl TestApp {
    fn new(executor: Arc<dyn ActionExecutor>) -> Self {
        let health_registry = HealthRegistry::new();
        let (scheduler, handle) = RefreshSchedulerBuilder::new()
            .inventory(Arc::new(StaticInventory))
            .metrics_provider(Arc::new(StaticMetrics))
            .health(health_registry.clone())
            .build()
            .unwrap();

        let engine = Arc::new(CostEngine::new(
            handle,
            ActionCatalog::with_defaults(),
            executor,
            StructuredLogger::new("api-test"),
        ));
        let state = Arc::new(AppState::new(engine, health_registry));
        let (shutdown, _) = broadcast::channel(1);

        Self {
            router: create_router(state.clone()),
            state,
            scheduler: Some(scheduler),
            shutdown,
        }
    }

    /// Start the scheduler and wait for the first published cycle
    async fn started(executor: Arc<dyn ActionExecutor>) -> Self {
        let mut app = Self::new(executor);
        let scheduler = app.scheduler.take().unwrap();
        tokio::spawn(scheduler.run(app.shutdown.subscribe()));
        app.state
            .engine
            .scheduler()
            .wait_for_generation(1)
            .await
            .unwrap();
        app
    }

    async fn request(&self, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}

#[tokio::test]
async fn test_queries_before_first_cycle_are_empty() {
    let app = TestApp::new(Arc::new(LoggingExecutor));

    let (status, nodes) = app.request(Method::GET, "/api/metrics/nodes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(nodes, serde_json::json!([]));

    let (_, recs) = app.request(Method::GET, "/api/recommendations").await;
    assert_eq!(recs, serde_json::json!([]));

    let (status, summary) = app.request(Method::GET, "/api/cost-summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["node_count"], serde_json::json!(0));
    assert_eq!(summary["pod_count"], serde_json::json!(0));
    assert_eq!(summary["recommendation_count"], serde_json::json!(0));

    let (status, readiness) = app.request(Method::GET, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_node_and_pod_metrics() {
    let app = TestApp::started(Arc::new(LoggingExecutor)).await;

    let (status, nodes) = app.request(Method::GET, "/api/metrics/nodes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(nodes[0]["name"], "ip-10-0-1-5");
    assert_eq!(nodes[0]["instance_type"], "t3.large");
    assert_eq!(nodes[0]["cpu_utilization"], 7.5);

    let (status, pods) = app.request(Method::GET, "/api/metrics/pods").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pods[0]["namespace"], "shop");
    assert_eq!(pods[0]["cpu_request_cores"], 0.5);
}

#[tokio::test]
async fn test_recommendations_and_summary_agree() {
    let app = TestApp::started(Arc::new(LoggingExecutor)).await;

    let (_, recs) = app.request(Method::GET, "/api/recommendations").await;
    let (_, summary) = app.request(Method::GET, "/api/cost-summary").await;

    let recs = recs.as_array().unwrap();
    let types: Vec<&str> = recs.iter().map(|r| r["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec!["node_optimization", "resource_rightsizing", "horizontal_scaling"]
    );
    assert_eq!(recs[0]["priority"], "medium");
    assert!(recs[0].get("namespace").is_none());

    assert_eq!(summary["recommendation_count"], recs.len());
    assert_eq!(summary["storage_cost"], 100.0);
    assert!(summary["namespace_costs"]["shop"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_optimize_is_accepted() {
    let app = TestApp::started(Arc::new(LoggingExecutor)).await;

    let (status, body) = app.request(Method::POST, "/api/optimize").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(
        body["status"] == "optimization_triggered" || body["status"] == "optimization_coalesced"
    );

    app.state
        .engine
        .scheduler()
        .wait_for_generation(2)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_optimize_coalesces_while_pending() {
    // scheduler not running, so the first trigger stays pending
    let app = TestApp::new(Arc::new(LoggingExecutor));

    let (status, first) = app.request(Method::POST, "/api/optimize").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(first["status"], "optimization_triggered");

    let (status, second) = app.request(Method::POST, "/api/optimize").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(second["status"], "optimization_coalesced");
}

#[tokio::test]
async fn test_optimize_without_scheduler_is_unavailable() {
    let mut app = TestApp::new(Arc::new(LoggingExecutor));
    drop(app.scheduler.take());

    let (status, body) = app.request(Method::POST, "/api/optimize").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_list_and_execute_action() {
    let app = TestApp::started(Arc::new(LoggingExecutor)).await;

    let (status, actions) = app.request(Method::GET, "/api/actions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(actions[0]["id"], "1");
    assert_eq!(actions[0]["type"], "scale_down");
    assert_eq!(actions[0]["status"], "pending");
    assert_eq!(actions[0]["parameters"]["replicas"], serde_json::json!(1));

    let (status, executed) = app.request(Method::POST, "/api/actions/1/execute").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(executed["status"], "executed");
    assert!(executed["executed_at"].is_string());

    let (_, actions) = app.request(Method::GET, "/api/actions").await;
    assert_eq!(actions[0]["status"], "executed");
}

#[tokio::test]
async fn test_execute_unknown_action_is_404() {
    let app = TestApp::new(Arc::new(LoggingExecutor));

    let (status, body) = app.request(Method::POST, "/api/actions/99/execute").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("99"));
}

#[tokio::test]
async fn test_executor_failure_is_502_and_action_stays_pending() {
    let app = TestApp::new(Arc::new(RejectingExecutor));

    let (status, _) = app.request(Method::POST, "/api/actions/1/execute").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, actions) = app.request(Method::GET, "/api/actions").await;
    assert_eq!(actions[0]["status"], "pending");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::started(Arc::new(LoggingExecutor)).await;

    let (status, body) = app.request(Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, readiness) = app.request(Method::GET, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);

    app.state
        .health_registry
        .set_degraded(components::METRICS, "metrics-server slow")
        .await;
    let (status, health) = app.request(Method::GET, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");

    app.state
        .health_registry
        .set_unhealthy(components::INVENTORY, "forbidden")
        .await;
    let (status, health) = app.request(Method::GET, "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_cycle_metrics() {
    let app = TestApp::started(Arc::new(LoggingExecutor)).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("cost_optimizer_cycles_total"));
    assert!(text.contains("cost_optimizer_recommendations"));
}
