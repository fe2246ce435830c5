//! Published cycle results
//!
//! A cycle's records, recommendations and summary are built together by
//! [`run_cycle`] and published as one immutable [`CycleResult`]. Readers
//! clone the `Arc` and never observe a half-written cycle.

use super::snapshot::{ProviderFailure, Snapshot};
use crate::aggregate;
use crate::cost::CostModel;
use crate::models::{ClusterCostSummary, NodeResourceRecord, PodResourceRecord, Recommendation};
use crate::rules::{self, RuleThresholds};
use crate::utilization::{analyze_nodes, analyze_pods};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything one analysis cycle produced
#[derive(Debug, Clone, PartialEq)]
pub struct CycleResult {
    /// Monotonic cycle number; 0 is the placeholder before the first cycle
    pub generation: u64,
    pub nodes: Vec<NodeResourceRecord>,
    pub pods: Vec<PodResourceRecord>,
    pub recommendations: Vec<Recommendation>,
    pub summary: ClusterCostSummary,
    pub generated_at: DateTime<Utc>,
    pub failures: Vec<ProviderFailure>,
}

impl CycleResult {
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            generation: 0,
            nodes: Vec::new(),
            pods: Vec::new(),
            recommendations: Vec::new(),
            summary: ClusterCostSummary::empty(at),
            generated_at: at,
            failures: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Turn one snapshot into a complete cycle result
///
/// Node output needs both the node listing and node metrics; pod output
/// needs both pod listing and pod metrics. Deployment rules only need the
/// deployment listing.
pub fn run_cycle(
    generation: u64,
    snapshot: &Snapshot,
    cost_model: &CostModel,
    thresholds: &RuleThresholds,
    now: DateTime<Utc>,
) -> CycleResult {
    let nodes = match (&snapshot.nodes, &snapshot.node_usage) {
        (Some(nodes), Some(usage)) => analyze_nodes(nodes, usage, cost_model),
        _ => Vec::new(),
    };
    let pods = match (&snapshot.pods, &snapshot.pod_usage) {
        (Some(pods), Some(usage)) => analyze_pods(pods, usage, cost_model),
        _ => Vec::new(),
    };
    let deployments = snapshot.deployments.as_deref().unwrap_or_default();

    let recommendations =
        rules::evaluate_all(&nodes, &pods, deployments, cost_model, thresholds, now);

    let node_records: Vec<NodeResourceRecord> = nodes.into_iter().map(|n| n.record).collect();
    let pod_records: Vec<PodResourceRecord> = pods.into_iter().map(|p| p.record).collect();
    let summary = aggregate::summarize(&node_records, &pod_records, &recommendations, cost_model, now);

    CycleResult {
        generation,
        nodes: node_records,
        pods: pod_records,
        recommendations,
        summary,
        generated_at: now,
        failures: snapshot.failures.clone(),
    }
}

/// Holder of the last published cycle
#[derive(Debug)]
pub struct ResultStore {
    current: RwLock<Arc<CycleResult>>,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CycleResult::empty(Utc::now()))),
        }
    }

    pub async fn current(&self) -> Arc<CycleResult> {
        self.current.read().await.clone()
    }

    pub async fn publish(&self, result: CycleResult) {
        let result = Arc::new(result);
        *self.current.write().await = result;
    }

    pub async fn generation(&self) -> u64 {
        self.current.read().await.generation
    }
}
