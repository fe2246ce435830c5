//! Per-cycle collection of inventory and usage data
//!
//! The five provider calls run concurrently, each under its own timeout.
//! A failed call only empties its own slot in the [`Snapshot`].

use crate::error::ProviderError;
use crate::health::components;
use crate::models::{
    DeploymentDescriptor, NodeDescriptor, NodeUsageSample, PodDescriptor, PodUsageSample,
};
use crate::provider::{InventoryProvider, MetricsProvider};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// One of the five provider listings collected per cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Nodes,
    Pods,
    Deployments,
    NodeMetrics,
    PodMetrics,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Nodes => "nodes",
            ResourceKind::Pods => "pods",
            ResourceKind::Deployments => "deployments",
            ResourceKind::NodeMetrics => "node_metrics",
            ResourceKind::PodMetrics => "pod_metrics",
        }
    }

    /// Provider operation name, used in timeout errors
    pub fn operation(&self) -> &'static str {
        match self {
            ResourceKind::Nodes => "list_nodes",
            ResourceKind::Pods => "list_pods",
            ResourceKind::Deployments => "list_deployments",
            ResourceKind::NodeMetrics => "list_node_metrics",
            ResourceKind::PodMetrics => "list_pod_metrics",
        }
    }

    /// Health component that owns this listing
    pub fn component(&self) -> &'static str {
        match self {
            ResourceKind::Nodes | ResourceKind::Pods | ResourceKind::Deployments => {
                components::INVENTORY
            }
            ResourceKind::NodeMetrics | ResourceKind::PodMetrics => components::METRICS,
        }
    }
}

/// A provider call that failed or timed out during collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub kind: ResourceKind,
    pub message: String,
}

/// Inputs for one cycle; `None` marks a listing that could not be fetched
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub nodes: Option<Vec<NodeDescriptor>>,
    pub pods: Option<Vec<PodDescriptor>>,
    pub deployments: Option<Vec<DeploymentDescriptor>>,
    pub node_usage: Option<Vec<NodeUsageSample>>,
    pub pod_usage: Option<Vec<PodUsageSample>>,
    pub failures: Vec<ProviderFailure>,
}

impl Snapshot {
    fn record<T>(&mut self, kind: ResourceKind, result: Result<T, ProviderError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.failures.push(ProviderFailure {
                    kind,
                    message: e.to_string(),
                });
                None
            }
        }
    }
}

/// Pulls a [`Snapshot`] from the inventory and metrics providers
#[derive(Clone)]
pub struct SnapshotCollector {
    inventory: Arc<dyn InventoryProvider>,
    metrics: Arc<dyn MetricsProvider>,
    timeout: Duration,
    namespace: Option<String>,
}

impl SnapshotCollector {
    pub fn new(
        inventory: Arc<dyn InventoryProvider>,
        metrics: Arc<dyn MetricsProvider>,
        timeout: Duration,
        namespace: Option<String>,
    ) -> Self {
        Self {
            inventory,
            metrics,
            timeout,
            namespace,
        }
    }

    pub async fn collect(&self) -> Snapshot {
        let ns = self.namespace.as_deref();
        let limit = self.timeout;

        let (nodes, pods, deployments, node_usage, pod_usage) = tokio::join!(
            bounded(ResourceKind::Nodes, limit, self.inventory.list_nodes()),
            bounded(ResourceKind::Pods, limit, self.inventory.list_pods(ns)),
            bounded(ResourceKind::Deployments, limit, self.inventory.list_deployments(ns)),
            bounded(ResourceKind::NodeMetrics, limit, self.metrics.list_node_metrics()),
            bounded(ResourceKind::PodMetrics, limit, self.metrics.list_pod_metrics(ns)),
        );

        let mut snapshot = Snapshot::default();
        snapshot.nodes = snapshot.record(ResourceKind::Nodes, nodes);
        snapshot.pods = snapshot.record(ResourceKind::Pods, pods);
        snapshot.deployments = snapshot.record(ResourceKind::Deployments, deployments);
        snapshot.node_usage = snapshot.record(ResourceKind::NodeMetrics, node_usage);
        snapshot.pod_usage = snapshot.record(ResourceKind::PodMetrics, pod_usage);
        snapshot
    }
}

async fn bounded<T, F>(kind: ResourceKind, limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| {
            Err(ProviderError::Timeout {
                operation: kind.operation().to_string(),
                timeout: limit,
            })
        })
}
