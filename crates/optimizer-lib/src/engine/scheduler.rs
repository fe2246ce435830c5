//! Single-flight refresh scheduler
//!
//! One worker task owns cycle execution. The interval ticker and on-demand
//! triggers both feed that worker, so at most one cycle runs at a time. The
//! trigger channel holds a single pending request: a trigger that finds it
//! already full is coalesced into the pending run.

use super::snapshot::SnapshotCollector;
use super::state::{run_cycle, CycleResult, ResultStore};
use crate::cost::CostModel;
use crate::error::EngineError;
use crate::health::{components, HealthRegistry};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::provider::{InventoryProvider, MetricsProvider};
use crate::rules::RuleThresholds;
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between scheduled cycles (default: 5 minutes)
    pub interval: Duration,
    /// Bound on each provider call (default: 30 seconds)
    pub provider_timeout: Duration,
    /// Restrict pod and deployment listings to one namespace
    pub namespace: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            provider_timeout: Duration::from_secs(30),
            namespace: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleState {
    Idle,
    Running,
}

/// What became of an on-demand trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new cycle will run
    Queued,
    /// A cycle was already pending and will cover this request
    Coalesced,
}

/// Cheap handle for triggering and observing the scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    trigger_tx: mpsc::Sender<()>,
    state_rx: watch::Receiver<CycleState>,
    generation_rx: watch::Receiver<u64>,
    store: Arc<ResultStore>,
    metrics: EngineMetrics,
}

impl SchedulerHandle {
    /// Request a cycle without waiting for it
    pub fn trigger(&self) -> Result<TriggerOutcome, EngineError> {
        match self.trigger_tx.try_send(()) {
            Ok(()) => Ok(TriggerOutcome::Queued),
            Err(TrySendError::Full(())) => {
                self.metrics.inc_coalesced_trigger();
                debug!("Cycle already pending, coalescing trigger");
                Ok(TriggerOutcome::Coalesced)
            }
            Err(TrySendError::Closed(())) => Err(EngineError::SchedulerStopped),
        }
    }

    pub fn state(&self) -> CycleState {
        *self.state_rx.borrow()
    }

    /// Generation of the last published cycle
    pub fn generation(&self) -> u64 {
        *self.generation_rx.borrow()
    }

    /// Wait until a cycle with at least `generation` has been published
    pub async fn wait_for_generation(&self, generation: u64) -> Result<u64, EngineError> {
        let mut rx = self.generation_rx.clone();
        let reached = rx
            .wait_for(|current| *current >= generation)
            .await
            .map_err(|_| EngineError::SchedulerStopped)?;
        Ok(*reached)
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }
}

pub struct RefreshScheduler {
    collector: SnapshotCollector,
    cost_model: Arc<CostModel>,
    thresholds: RuleThresholds,
    store: Arc<ResultStore>,
    health: HealthRegistry,
    metrics: EngineMetrics,
    logger: StructuredLogger,
    interval: Duration,
    trigger_rx: mpsc::Receiver<()>,
    state_tx: watch::Sender<CycleState>,
    generation_tx: watch::Sender<u64>,
    generation: u64,
}

impl RefreshScheduler {
    /// Run cycles until a shutdown signal arrives
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting refresh scheduler"
        );
        self.health.set_healthy(components::SCHEDULER).await;

        // First tick completes immediately
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                Some(()) = self.trigger_rx.recv() => {
                    debug!("On-demand cycle requested");
                    self.run_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down refresh scheduler");
                    break;
                }
            }
        }

        self.state_tx.send_replace(CycleState::Idle);
        self.health
            .set_unhealthy(components::SCHEDULER, "Scheduler stopped")
            .await;
    }

    /// Collect, analyze and publish one cycle
    async fn run_once(&mut self) {
        self.state_tx.send_replace(CycleState::Running);
        let start = Instant::now();

        let snapshot = self.collector.collect().await;
        self.generation += 1;
        let result = run_cycle(
            self.generation,
            &snapshot,
            &self.cost_model,
            &self.thresholds,
            Utc::now(),
        );

        self.report_providers(&result).await;

        let elapsed = start.elapsed();
        self.metrics.observe_cycle(elapsed.as_secs_f64());
        self.metrics.set_cycle_outputs(
            result.recommendations.len(),
            result.summary.potential_savings,
            result.summary.total_monthly_cost,
        );
        self.logger.log_cycle_completed(
            result.generation,
            result.nodes.len(),
            result.pods.len(),
            result.recommendations.len(),
            result.summary.potential_savings,
            result.failures.len(),
            elapsed.as_millis(),
        );

        self.store.publish(result).await;
        self.health.mark_cycle_published().await;
        self.generation_tx.send_replace(self.generation);
        self.state_tx.send_replace(CycleState::Idle);
    }

    async fn report_providers(&self, result: &CycleResult) {
        for failure in &result.failures {
            self.metrics.inc_provider_failure(failure.kind);
            self.logger
                .log_provider_unavailable(failure.kind, &failure.message);
        }

        for component in [components::INVENTORY, components::METRICS] {
            let messages: Vec<&str> = result
                .failures
                .iter()
                .filter(|f| f.kind.component() == component)
                .map(|f| f.message.as_str())
                .collect();

            if messages.is_empty() {
                self.health.set_healthy(component).await;
            } else {
                self.health
                    .set_degraded(component, messages.join("; "))
                    .await;
            }
        }
    }
}

/// Builder for the scheduler and its handle
pub struct RefreshSchedulerBuilder {
    inventory: Option<Arc<dyn InventoryProvider>>,
    metrics_provider: Option<Arc<dyn MetricsProvider>>,
    cost_model: CostModel,
    thresholds: RuleThresholds,
    health: HealthRegistry,
    metrics: Option<EngineMetrics>,
    logger: StructuredLogger,
    config: SchedulerConfig,
}

impl RefreshSchedulerBuilder {
    pub fn new() -> Self {
        Self {
            inventory: None,
            metrics_provider: None,
            cost_model: CostModel::default(),
            thresholds: RuleThresholds::default(),
            health: HealthRegistry::new(),
            metrics: None,
            logger: StructuredLogger::new("cost-optimizer"),
            config: SchedulerConfig::default(),
        }
    }

    pub fn inventory(mut self, inventory: Arc<dyn InventoryProvider>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn metrics_provider(mut self, metrics: Arc<dyn MetricsProvider>) -> Self {
        self.metrics_provider = Some(metrics);
        self
    }

    pub fn cost_model(mut self, cost_model: CostModel) -> Self {
        self.cost_model = cost_model;
        self
    }

    pub fn thresholds(mut self, thresholds: RuleThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn engine_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.config.provider_timeout = timeout;
        self
    }

    pub fn namespace(mut self, namespace: Option<String>) -> Self {
        self.config.namespace = namespace;
        self
    }

    pub fn build(self) -> Result<(RefreshScheduler, SchedulerHandle)> {
        let inventory = self
            .inventory
            .ok_or_else(|| anyhow::anyhow!("Inventory provider is required"))?;
        let metrics_provider = self
            .metrics_provider
            .ok_or_else(|| anyhow::anyhow!("Metrics provider is required"))?;
        if self.config.interval.is_zero() {
            anyhow::bail!("Refresh interval must be greater than zero");
        }

        let metrics = self.metrics.unwrap_or_default();
        let store = Arc::new(ResultStore::new());
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(CycleState::Idle);
        let (generation_tx, generation_rx) = watch::channel(0);

        let scheduler = RefreshScheduler {
            collector: SnapshotCollector::new(
                inventory,
                metrics_provider,
                self.config.provider_timeout,
                self.config.namespace.clone(),
            ),
            cost_model: Arc::new(self.cost_model),
            thresholds: self.thresholds,
            store: store.clone(),
            health: self.health,
            metrics: metrics.clone(),
            logger: self.logger,
            interval: self.config.interval,
            trigger_rx,
            state_tx,
            generation_tx,
            generation: 0,
        };

        let handle = SchedulerHandle {
            trigger_tx,
            state_rx,
            generation_rx,
            store,
            metrics,
        };

        Ok((scheduler, handle))
    }
}

impl Default for RefreshSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{FixedInventory, FixedMetrics};

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_builder_requires_providers() {
        let result = RefreshSchedulerBuilder::new()
            .metrics_provider(Arc::new(FixedMetrics::default()))
            .build();
        assert!(result.is_err());

        let result = RefreshSchedulerBuilder::new()
            .inventory(Arc::new(FixedInventory::default()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_zero_interval() {
        let result = RefreshSchedulerBuilder::new()
            .inventory(Arc::new(FixedInventory::default()))
            .metrics_provider(Arc::new(FixedMetrics::default()))
            .interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_handle_starts_idle_at_generation_zero() {
        let (_scheduler, handle) = RefreshSchedulerBuilder::new()
            .inventory(Arc::new(FixedInventory::default()))
            .metrics_provider(Arc::new(FixedMetrics::default()))
            .build()
            .unwrap();

        assert_eq!(handle.state(), CycleState::Idle);
        assert_eq!(handle.generation(), 0);
        assert_eq!(handle.store().generation().await, 0);
    }

    #[tokio::test]
    async fn test_trigger_after_scheduler_dropped() {
        let (scheduler, handle) = RefreshSchedulerBuilder::new()
            .inventory(Arc::new(FixedInventory::default()))
            .metrics_provider(Arc::new(FixedMetrics::default()))
            .build()
            .unwrap();
        drop(scheduler);

        assert!(matches!(handle.trigger(), Err(EngineError::SchedulerStopped)));
    }
}
