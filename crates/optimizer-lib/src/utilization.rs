//! Utilization analysis
//!
//! Joins inventory descriptors with usage samples and turns raw quantities
//! into percentages and per-pod totals. Entities without a matching usage
//! sample are left out; this is the normal state for freshly created pods.

use crate::cost::CostModel;
use crate::models::{
    NodeDescriptor, NodeResourceRecord, NodeUsageSample, PodDescriptor, PodPhase,
    PodResourceRecord, PodUsageSample, BYTES_PER_GIB,
};
use std::collections::HashMap;
use tracing::debug;

/// Usage as a percentage of capacity, `None` when the capacity is zero
pub fn utilization_percent(usage: u64, capacity: u64) -> Option<f64> {
    if capacity == 0 {
        None
    } else {
        Some(usage as f64 / capacity as f64 * 100.0)
    }
}

/// A node joined with its usage sample
#[derive(Debug, Clone)]
pub struct NodeAnalysis {
    pub record: NodeResourceRecord,
    pub cpu_usage_millicores: u64,
    pub memory_usage_bytes: u64,
}

/// A running pod joined with its usage sample
#[derive(Debug, Clone)]
pub struct PodAnalysis {
    pub pod: PodDescriptor,
    pub usage: PodUsageSample,
    pub totals: PodTotals,
    pub record: PodResourceRecord,
}

/// Integer sums across a pod's containers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PodTotals {
    pub cpu_usage_millicores: u64,
    pub memory_usage_bytes: u64,
    pub cpu_request_millicores: u64,
    pub memory_request_bytes: u64,
    pub cpu_limit_millicores: u64,
    pub memory_limit_bytes: u64,
}

impl PodTotals {
    /// Sum usage across the sample and requests/limits across the spec
    pub fn sum(pod: &PodDescriptor, usage: &PodUsageSample) -> Self {
        let mut totals = PodTotals::default();

        for container in &usage.containers {
            totals.cpu_usage_millicores += container.cpu_millicores;
            totals.memory_usage_bytes += container.memory_bytes;
        }

        for container in &pod.containers {
            totals.cpu_request_millicores += container.cpu_request_millicores.unwrap_or(0);
            totals.memory_request_bytes += container.memory_request_bytes.unwrap_or(0);
            totals.cpu_limit_millicores += container.cpu_limit_millicores.unwrap_or(0);
            totals.memory_limit_bytes += container.memory_limit_bytes.unwrap_or(0);
        }

        totals
    }
}

/// Analyze every node that has a usage sample
pub fn analyze_nodes(
    nodes: &[NodeDescriptor],
    samples: &[NodeUsageSample],
    cost_model: &CostModel,
) -> Vec<NodeAnalysis> {
    let by_name: HashMap<&str, &NodeUsageSample> =
        samples.iter().map(|s| (s.name.as_str(), s)).collect();

    nodes
        .iter()
        .filter_map(|node| {
            let Some(sample) = by_name.get(node.name.as_str()) else {
                debug!(node = %node.name, "No metrics sample for node, skipping");
                return None;
            };

            let instance_type = cost_model
                .resolve_node_instance_type(&node.name, node.instance_type_label.as_deref());
            let hourly_rate = cost_model.hourly_rate(&instance_type);

            let record = NodeResourceRecord {
                name: node.name.clone(),
                cpu_capacity_cores: node.cpu_capacity_millicores as f64 / 1000.0,
                memory_capacity_gb: node.memory_capacity_bytes as f64 / BYTES_PER_GIB,
                cpu_usage_cores: sample.cpu_millicores as f64 / 1000.0,
                memory_usage_gb: sample.memory_bytes as f64 / BYTES_PER_GIB,
                cpu_utilization: utilization_percent(
                    sample.cpu_millicores,
                    node.cpu_capacity_millicores,
                ),
                memory_utilization: utilization_percent(
                    sample.memory_bytes,
                    node.memory_capacity_bytes,
                ),
                instance_type,
                hourly_rate,
                estimated_monthly_cost: cost_model.monthly_cost(hourly_rate),
            };

            Some(NodeAnalysis {
                record,
                cpu_usage_millicores: sample.cpu_millicores,
                memory_usage_bytes: sample.memory_bytes,
            })
        })
        .collect()
}

/// Analyze every running pod that has a usage sample
pub fn analyze_pods(
    pods: &[PodDescriptor],
    samples: &[PodUsageSample],
    cost_model: &CostModel,
) -> Vec<PodAnalysis> {
    let by_key: HashMap<(&str, &str), &PodUsageSample> = samples
        .iter()
        .map(|s| ((s.namespace.as_str(), s.name.as_str()), s))
        .collect();

    pods.iter()
        .filter(|pod| pod.phase == PodPhase::Running)
        .filter_map(|pod| {
            let Some(usage) = by_key.get(&(pod.namespace.as_str(), pod.name.as_str())) else {
                debug!(
                    pod = %pod.name,
                    namespace = %pod.namespace,
                    "No metrics sample for pod, skipping"
                );
                return None;
            };

            let totals = PodTotals::sum(pod, usage);
            let record = PodResourceRecord {
                name: pod.name.clone(),
                namespace: pod.namespace.clone(),
                cpu_usage_cores: totals.cpu_usage_millicores as f64 / 1000.0,
                memory_usage_gb: totals.memory_usage_bytes as f64 / BYTES_PER_GIB,
                cpu_request_cores: totals.cpu_request_millicores as f64 / 1000.0,
                memory_request_gb: totals.memory_request_bytes as f64 / BYTES_PER_GIB,
                cpu_limit_cores: totals.cpu_limit_millicores as f64 / 1000.0,
                memory_limit_gb: totals.memory_limit_bytes as f64 / BYTES_PER_GIB,
                estimated_monthly_cost: cost_model.pod_monthly_cost(
                    totals.cpu_request_millicores,
                    totals.memory_request_bytes,
                ),
            };

            Some(PodAnalysis {
                pod: pod.clone(),
                usage: (*usage).clone(),
                totals,
                record,
            })
        })
        .collect()
}
