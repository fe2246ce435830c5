//! Core data models for the cost optimizer
//!
//! The first half of this module holds what the engine publishes (records,
//! recommendations, summaries, actions). The second half holds the
//! descriptors and usage samples handed in by the inventory and metrics
//! providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bytes in one GiB, the unit used for reported memory figures
pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Per-node utilization and cost record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResourceRecord {
    pub name: String,
    pub cpu_capacity_cores: f64,
    pub memory_capacity_gb: f64,
    pub cpu_usage_cores: f64,
    pub memory_usage_gb: f64,
    /// Percentage of CPU capacity in use, absent when capacity is zero
    pub cpu_utilization: Option<f64>,
    /// Percentage of memory capacity in use, absent when capacity is zero
    pub memory_utilization: Option<f64>,
    pub instance_type: String,
    pub hourly_rate: f64,
    pub estimated_monthly_cost: f64,
}

/// Requests and limits declared by a single container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResourceSpec {
    pub name: String,
    pub cpu_request_millicores: Option<u64>,
    pub memory_request_bytes: Option<u64>,
    pub cpu_limit_millicores: Option<u64>,
    pub memory_limit_bytes: Option<u64>,
    /// A requests or limits map is set, whatever resources it names
    #[serde(default)]
    pub resource_maps_set: bool,
}

impl ContainerResourceSpec {
    /// True if any request or limit is declared, even an explicit zero
    /// or one for a resource other than CPU and memory
    pub fn declares_resources(&self) -> bool {
        self.resource_maps_set
            || self.cpu_request_millicores.is_some()
            || self.memory_request_bytes.is_some()
            || self.cpu_limit_millicores.is_some()
            || self.memory_limit_bytes.is_some()
    }
}

/// Per-pod usage, request, limit and estimated cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodResourceRecord {
    pub name: String,
    pub namespace: String,
    pub cpu_usage_cores: f64,
    pub memory_usage_gb: f64,
    pub cpu_request_cores: f64,
    pub memory_request_gb: f64,
    pub cpu_limit_cores: f64,
    pub memory_limit_gb: f64,
    pub estimated_monthly_cost: f64,
}

/// Kind of optimization a recommendation proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    NodeOptimization,
    NodeScaling,
    ResourceRightsizing,
    HorizontalScaling,
    ResourceGovernance,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::NodeOptimization => "node_optimization",
            RecommendationType::NodeScaling => "node_scaling",
            RecommendationType::ResourceRightsizing => "resource_rightsizing",
            RecommendationType::HorizontalScaling => "horizontal_scaling",
            RecommendationType::ResourceGovernance => "resource_governance",
        }
    }
}

impl std::fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// A single optimization suggestion produced by one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub namespace: Option<String>,
    pub description: String,
    pub impact: String,
    /// Estimated monthly savings; negative values are cost increases
    pub potential_savings: f64,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
}

/// Cluster-wide rollup of one analysis cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCostSummary {
    pub total_monthly_cost: f64,
    pub compute_cost: f64,
    pub storage_cost: f64,
    pub wasted_resources: f64,
    pub potential_savings: f64,
    pub node_count: usize,
    pub pod_count: usize,
    pub namespace_costs: BTreeMap<String, f64>,
    pub recommendation_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl ClusterCostSummary {
    /// Summary reported before any cycle has completed
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            total_monthly_cost: 0.0,
            compute_cost: 0.0,
            storage_cost: 0.0,
            wasted_resources: 0.0,
            potential_savings: 0.0,
            node_count: 0,
            pod_count: 0,
            namespace_costs: BTreeMap::new(),
            recommendation_count: 0,
            last_updated: at,
        }
    }
}

/// Lifecycle of a proposed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Executed,
}

/// A proposable mutation, described but never performed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationAction {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub resource: String,
    pub namespace: String,
    pub action: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub status: ActionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub executed_at: Option<DateTime<Utc>>,
}

// Provider-side inputs

/// Node as reported by the inventory provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    pub cpu_capacity_millicores: u64,
    pub memory_capacity_bytes: u64,
    /// Instance type label, if the node carries one
    pub instance_type_label: Option<String>,
}

/// Pod lifecycle phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl PodPhase {
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

/// Pod as reported by the inventory provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodDescriptor {
    pub name: String,
    pub namespace: String,
    pub phase: PodPhase,
    pub containers: Vec<ContainerResourceSpec>,
}

/// Deployment as reported by the inventory provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    pub name: String,
    pub namespace: String,
    /// Observed replica count
    pub replicas: i32,
    /// Containers of the pod template
    pub containers: Vec<ContainerResourceSpec>,
}

/// Point-in-time node usage from the metrics provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUsageSample {
    pub name: String,
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
}

/// Point-in-time usage of one container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub name: String,
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
}

/// Point-in-time pod usage from the metrics provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodUsageSample {
    pub name: String,
    pub namespace: String,
    pub containers: Vec<ContainerUsage>,
}

impl PodUsageSample {
    pub fn container(&self, name: &str) -> Option<&ContainerUsage> {
        self.containers.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_wire_names() {
        let rec = Recommendation {
            recommendation_type: RecommendationType::NodeScaling,
            resource: "node-1".to_string(),
            namespace: None,
            description: String::new(),
            impact: String::new(),
            potential_savings: -50.0,
            priority: Priority::High,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "node_scaling");
        assert_eq!(json["priority"], "high");
        assert!(json.get("namespace").is_none());
    }

    #[test]
    fn test_priority_ordering_and_parse() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_declares_resources_counts_explicit_zero() {
        let mut spec = ContainerResourceSpec::default();
        assert!(!spec.declares_resources());

        spec.memory_limit_bytes = Some(0);
        assert!(spec.declares_resources());

        let gpu_only = ContainerResourceSpec {
            resource_maps_set: true,
            ..Default::default()
        };
        assert!(gpu_only.declares_resources());
    }

    #[test]
    fn test_pod_phase_parse() {
        assert_eq!(PodPhase::parse("Running"), PodPhase::Running);
        assert_eq!(PodPhase::parse("Evicted"), PodPhase::Unknown);
    }
}
