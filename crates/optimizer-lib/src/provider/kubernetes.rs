//! Kubernetes-backed inventory and metrics providers
//!
//! Inventory comes from the core and apps APIs through typed
//! [`kube::Api`] handles. Usage comes from metrics-server, which is an
//! aggregated API without generated types, so it is fetched with raw GET
//! requests and decoded into local structs.

use super::{async_trait, InventoryProvider, MetricsProvider};
use crate::error::ProviderError;
use crate::models::{
    ContainerResourceSpec, ContainerUsage, DeploymentDescriptor, NodeDescriptor, NodeUsageSample,
    PodDescriptor, PodPhase, PodUsageSample,
};
use crate::quantity::{parse_cpu_millicores, parse_memory_bytes};
use anyhow::Context;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, ListParams};
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Node labels that carry the cloud instance type, newest first
const INSTANCE_TYPE_LABELS: &[&str] = &[
    "node.kubernetes.io/instance-type",
    "beta.kubernetes.io/instance-type",
];

const METRICS_API: &str = "/apis/metrics.k8s.io/v1beta1";

/// Build a client from `KUBECONFIG`, the default kubeconfig or in-cluster config
pub async fn connect() -> anyhow::Result<Client> {
    Client::try_default()
        .await
        .context("Failed to create Kubernetes client")
}

/// Inventory provider over the Kubernetes API
#[derive(Clone)]
pub struct KubeInventory {
    client: Client,
}

impl KubeInventory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn scoped<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl InventoryProvider for KubeInventory {
    async fn list_nodes(&self) -> Result<Vec<NodeDescriptor>, ProviderError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| ProviderError::unavailable("list_nodes", e))?;

        Ok(list.items.iter().map(node_descriptor).collect())
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodDescriptor>, ProviderError> {
        let pods: Api<Pod> = self.scoped(namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .map_err(|e| ProviderError::unavailable("list_pods", e))?;

        Ok(list.items.iter().map(pod_descriptor).collect())
    }

    async fn list_deployments(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<DeploymentDescriptor>, ProviderError> {
        let deployments: Api<Deployment> = self.scoped(namespace);
        let list = deployments
            .list(&ListParams::default())
            .await
            .map_err(|e| ProviderError::unavailable("list_deployments", e))?;

        Ok(list.items.iter().map(deployment_descriptor).collect())
    }
}

/// Metrics provider over the metrics-server aggregated API
#[derive(Clone)]
pub struct KubeMetrics {
    client: Client,
}

impl KubeMetrics {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<T, ProviderError> {
        let request = http::Request::builder()
            .method("GET")
            .uri(path)
            .body(Vec::new())
            .map_err(|e| ProviderError::unavailable(operation, e))?;

        self.client.request::<T>(request).await.map_err(|e| match e {
            kube::Error::SerdeError(e) => ProviderError::decode(operation, e),
            other => ProviderError::unavailable(operation, other),
        })
    }
}

#[async_trait]
impl MetricsProvider for KubeMetrics {
    async fn list_node_metrics(&self) -> Result<Vec<NodeUsageSample>, ProviderError> {
        let path = format!("{}/nodes", METRICS_API);
        let list: MetricsList<NodeMetricsItem> = self.get("list_node_metrics", &path).await?;

        Ok(list
            .items
            .into_iter()
            .map(|item| NodeUsageSample {
                name: item.metadata.name,
                cpu_millicores: cpu(&item.usage.cpu),
                memory_bytes: memory(&item.usage.memory),
            })
            .collect())
    }

    async fn list_pod_metrics(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<PodUsageSample>, ProviderError> {
        let path = match namespace {
            Some(ns) => format!("{}/namespaces/{}/pods", METRICS_API, ns),
            None => format!("{}/pods", METRICS_API),
        };
        let list: MetricsList<PodMetricsItem> = self.get("list_pod_metrics", &path).await?;

        Ok(list
            .items
            .into_iter()
            .map(|item| PodUsageSample {
                name: item.metadata.name,
                namespace: item.metadata.namespace.unwrap_or_default(),
                containers: item
                    .containers
                    .into_iter()
                    .map(|c| ContainerUsage {
                        name: c.name,
                        cpu_millicores: cpu(&c.usage.cpu),
                        memory_bytes: memory(&c.usage.memory),
                    })
                    .collect(),
            })
            .collect())
    }
}

// metrics.k8s.io/v1beta1 wire types

#[derive(Debug, Deserialize)]
struct MetricsList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MetricsMetadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    cpu: String,
    #[serde(default)]
    memory: String,
}

#[derive(Debug, Deserialize)]
struct NodeMetricsItem {
    metadata: MetricsMetadata,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct PodMetricsItem {
    metadata: MetricsMetadata,
    #[serde(default)]
    containers: Vec<ContainerMetricsItem>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetricsItem {
    name: String,
    #[serde(default)]
    usage: Usage,
}

// Conversions from k8s-openapi objects

fn cpu(quantity: &str) -> u64 {
    parse_cpu_millicores(quantity).unwrap_or_else(|e| {
        debug!(error = %e, "Treating unparseable CPU quantity as zero");
        0
    })
}

fn memory(quantity: &str) -> u64 {
    parse_memory_bytes(quantity).unwrap_or_else(|e| {
        debug!(error = %e, "Treating unparseable memory quantity as zero");
        0
    })
}

fn lookup_cpu(map: Option<&BTreeMap<String, Quantity>>) -> Option<u64> {
    let q = map?.get("cpu")?;
    match parse_cpu_millicores(&q.0) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(error = %e, "Ignoring unparseable CPU quantity");
            None
        }
    }
}

fn lookup_memory(map: Option<&BTreeMap<String, Quantity>>) -> Option<u64> {
    let q = map?.get("memory")?;
    match parse_memory_bytes(&q.0) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(error = %e, "Ignoring unparseable memory quantity");
            None
        }
    }
}

fn node_descriptor(node: &Node) -> NodeDescriptor {
    let capacity = node.status.as_ref().and_then(|s| s.capacity.as_ref());
    let instance_type_label = node.metadata.labels.as_ref().and_then(|labels| {
        INSTANCE_TYPE_LABELS
            .iter()
            .find_map(|key| labels.get(*key).cloned())
    });

    NodeDescriptor {
        name: node.metadata.name.clone().unwrap_or_default(),
        cpu_capacity_millicores: lookup_cpu(capacity).unwrap_or(0),
        memory_capacity_bytes: lookup_memory(capacity).unwrap_or(0),
        instance_type_label,
    }
}

fn container_spec(container: &Container) -> ContainerResourceSpec {
    let resources = container.resources.as_ref();
    let requests = resources.and_then(|r| r.requests.as_ref());
    let limits = resources.and_then(|r| r.limits.as_ref());

    ContainerResourceSpec {
        name: container.name.clone(),
        cpu_request_millicores: lookup_cpu(requests),
        memory_request_bytes: lookup_memory(requests),
        cpu_limit_millicores: lookup_cpu(limits),
        memory_limit_bytes: lookup_memory(limits),
        resource_maps_set: requests.is_some() || limits.is_some(),
    }
}

fn pod_descriptor(pod: &Pod) -> PodDescriptor {
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(PodPhase::parse)
        .unwrap_or_default();

    PodDescriptor {
        name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string()),
        phase,
        containers: pod
            .spec
            .as_ref()
            .map(|spec| spec.containers.iter().map(container_spec).collect())
            .unwrap_or_default(),
    }
}

fn deployment_descriptor(deployment: &Deployment) -> DeploymentDescriptor {
    let containers = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .map(|pod_spec| pod_spec.containers.iter().map(container_spec).collect())
        .unwrap_or_default();

    DeploymentDescriptor {
        name: deployment.metadata.name.clone().unwrap_or_default(),
        namespace: deployment
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string()),
        replicas: deployment
            .status
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(0),
        containers,
    }
}
