//! Analysis engine
//!
//! Ties the scheduler, the published result and the action catalog
//! together behind [`CostEngine`], the query surface used by the HTTP API.

mod scheduler;
mod snapshot;
mod state;


pub use scheduler::{
    CycleState, RefreshScheduler, RefreshSchedulerBuilder, SchedulerConfig, SchedulerHandle,
    TriggerOutcome,
};
pub use snapshot::{ProviderFailure, ResourceKind, Snapshot, SnapshotCollector};
pub use state::{run_cycle, CycleResult, ResultStore};

use crate::actions::ActionCatalog;
use crate::error::EngineError;
use crate::models::{
    ClusterCostSummary, NodeResourceRecord, OptimizationAction, PodResourceRecord, Recommendation,
};
use crate::observability::StructuredLogger;
use crate::provider::ActionExecutor;
use std::sync::Arc;

/// Read and trigger interface over the last published cycle
///
/// Reads never wait on a running cycle; they return whatever was last
/// published, or empty results before the first cycle completes.
pub struct CostEngine {
    scheduler: SchedulerHandle,
    catalog: ActionCatalog,
    executor: Arc<dyn ActionExecutor>,
    logger: StructuredLogger,
}

impl CostEngine {
    pub fn new(
        scheduler: SchedulerHandle,
        catalog: ActionCatalog,
        executor: Arc<dyn ActionExecutor>,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            scheduler,
            catalog,
            executor,
            logger,
        }
    }

    /// The whole last published cycle
    pub async fn snapshot(&self) -> Arc<CycleResult> {
        self.scheduler.store().current().await
    }

    pub async fn node_metrics(&self) -> Vec<NodeResourceRecord> {
        self.snapshot().await.nodes.clone()
    }

    pub async fn pod_metrics(&self) -> Vec<PodResourceRecord> {
        self.snapshot().await.pods.clone()
    }

    pub async fn recommendations(&self) -> Vec<Recommendation> {
        self.snapshot().await.recommendations.clone()
    }

    pub async fn cost_summary(&self) -> ClusterCostSummary {
        self.snapshot().await.summary.clone()
    }

    pub fn trigger_optimize(&self) -> Result<TriggerOutcome, EngineError> {
        self.scheduler.trigger()
    }

    pub async fn list_actions(&self) -> Vec<OptimizationAction> {
        self.catalog.list().await
    }

    pub async fn execute_action(&self, id: &str) -> Result<OptimizationAction, EngineError> {
        let action = self.catalog.execute(id, self.executor.as_ref()).await?;
        self.logger.log_action_executed(
            &action.id,
            &action.action_type,
            &action.resource,
            &action.namespace,
        );
        Ok(action)
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }
}
