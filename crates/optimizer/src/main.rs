//! Kubernetes Cost Optimizer
//!
//! Periodically prices the cluster from inventory and metrics-server data,
//! derives recommendations and serves them over HTTP.

use anyhow::{Context, Result};
use cost_optimizer::{api, config::OptimizerConfig};
use optimizer_lib::{
    engine::{CostEngine, RefreshSchedulerBuilder},
    health::HealthRegistry,
    observability::{EngineMetrics, StructuredLogger},
    provider::{self, KubeInventory, KubeMetrics, LoggingExecutor},
    ActionCatalog,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const OPTIMIZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = OptimizerConfig::load()?;
    info!(
        api_port = config.api_port,
        namespace = ?config.namespace,
        "Optimizer configured"
    );

    // The only fatal startup condition: no cluster client
    let client = provider::connect()
        .await
        .context("Kubernetes client is required to run the optimizer")?;

    let health_registry = HealthRegistry::with_optimizer_components().await;
    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new("cost-optimizer");
    logger.log_startup(OPTIMIZER_VERSION, config.refresh_interval_secs);

    let (scheduler, handle) = RefreshSchedulerBuilder::new()
        .inventory(Arc::new(KubeInventory::new(client.clone())))
        .metrics_provider(Arc::new(KubeMetrics::new(client)))
        .cost_model(config.cost_model())
        .config(config.scheduler_config())
        .health(health_registry.clone())
        .engine_metrics(metrics)
        .logger(logger.clone())
        .build()?;

    let engine = Arc::new(CostEngine::new(
        handle,
        ActionCatalog::with_defaults(),
        Arc::new(LoggingExecutor),
        logger.clone(),
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_tx.subscribe()));

    let app_state = Arc::new(api::AppState::new(engine, health_registry));
    let mut api_shutdown = shutdown_tx.subscribe();
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state, async move {
        let _ = api_shutdown.recv().await;
    }));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());

    if let Err(e) = scheduler_handle.await {
        error!(error = %e, "Refresh scheduler task failed");
    }
    match api_handle.await {
        Ok(Err(e)) => error!(error = %e, "API server exited with error"),
        Err(e) => error!(error = %e, "API server task failed"),
        Ok(Ok(())) => {}
    }

    info!("Shutdown complete");
    Ok(())
}
