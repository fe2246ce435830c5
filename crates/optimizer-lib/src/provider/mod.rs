//! Collaborator interfaces consumed by the engine
//!
//! The engine reads cluster inventory and usage through these traits and
//! hands proposed mutations to an [`ActionExecutor`]. Kubernetes-backed
//! implementations live in [`kubernetes`].

pub mod kubernetes;

pub use kubernetes::{connect, KubeInventory, KubeMetrics};

use crate::error::ProviderError;
use crate::models::{
    DeploymentDescriptor, NodeDescriptor, NodeUsageSample, OptimizationAction, PodDescriptor,
    PodUsageSample,
};
use tracing::info;

pub use async_trait::async_trait;

/// Source of nodes, pods and deployments
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<NodeDescriptor>, ProviderError>;

    /// List pods in a namespace, or in all namespaces when `None`
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodDescriptor>, ProviderError>;

    /// List deployments in a namespace, or in all namespaces when `None`
    async fn list_deployments(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<DeploymentDescriptor>, ProviderError>;
}

/// Source of point-in-time usage samples
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn list_node_metrics(&self) -> Result<Vec<NodeUsageSample>, ProviderError>;

    async fn list_pod_metrics(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<PodUsageSample>, ProviderError>;
}

/// Performs the cluster mutation an action describes
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &OptimizationAction) -> Result<(), ProviderError>;
}

/// Executor that records the request and changes nothing in the cluster
#[derive(Debug, Clone, Default)]
pub struct LoggingExecutor;

#[async_trait]
impl ActionExecutor for LoggingExecutor {
    async fn execute(&self, action: &OptimizationAction) -> Result<(), ProviderError> {
        info!(
            action_id = %action.id,
            action_type = %action.action_type,
            resource = %action.resource,
            namespace = %action.namespace,
            parameters = %serde_json::Value::Object(action.parameters.clone()),
            "Optimization action accepted; no cluster mutation performed"
        );
        Ok(())
    }
}
