//! Threshold-based recommendation rules
//!
//! Each rule looks at one entity at a time and may fire alongside other
//! rules for the same entity. Savings figures other than node consolidation
//! are fixed heuristic amounts rather than cost-model outputs.

use crate::cost::CostModel;
use crate::models::{DeploymentDescriptor, Priority, Recommendation, RecommendationType};
use crate::utilization::{NodeAnalysis, PodAnalysis};
use chrono::{DateTime, Utc};

/// Trigger thresholds and savings constants for every rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleThresholds {
    /// Node is underutilized below this CPU percentage...
    pub underutilized_cpu_percent: f64,
    /// ...and below this memory percentage
    pub underutilized_memory_percent: f64,
    /// Node is overutilized above this percentage on either dimension
    pub overutilized_percent: f64,
    /// Share of a node's monthly cost recoverable by consolidation
    pub consolidation_savings_factor: f64,
    pub node_scaling_savings: f64,
    pub cpu_rightsizing_savings: f64,
    pub memory_rightsizing_savings: f64,
    pub horizontal_scaling_savings: f64,
    pub governance_savings: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            underutilized_cpu_percent: 20.0,
            underutilized_memory_percent: 30.0,
            overutilized_percent: 90.0,
            consolidation_savings_factor: 0.7,
            node_scaling_savings: -50.0,
            cpu_rightsizing_savings: 15.0,
            memory_rightsizing_savings: 10.0,
            horizontal_scaling_savings: 25.0,
            governance_savings: 20.0,
        }
    }
}

/// Format an optional utilization for descriptions
fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn exceeds(value: Option<f64>, threshold: f64) -> bool {
    value.map(|v| v > threshold).unwrap_or(false)
}

/// Node consolidation and node scaling rules
pub fn evaluate_nodes(
    nodes: &[NodeAnalysis],
    cost_model: &CostModel,
    thresholds: &RuleThresholds,
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for node in nodes {
        let record = &node.record;
        let cpu = record.cpu_utilization;
        let memory = record.memory_utilization;

        // Consolidation needs both dimensions measured
        if let (Some(cpu_util), Some(mem_util)) = (cpu, memory) {
            if cpu_util < thresholds.underutilized_cpu_percent
                && mem_util < thresholds.underutilized_memory_percent
            {
                let monthly = cost_model.monthly_cost(record.hourly_rate);
                recommendations.push(Recommendation {
                    recommendation_type: RecommendationType::NodeOptimization,
                    resource: record.name.clone(),
                    namespace: None,
                    description: format!(
                        "Node {} is underutilized (CPU: {:.1}%, Memory: {:.1}%)",
                        record.name, cpu_util, mem_util
                    ),
                    impact: "Consider consolidating workloads or downsizing".to_string(),
                    potential_savings: monthly * thresholds.consolidation_savings_factor,
                    priority: Priority::Medium,
                    timestamp: now,
                });
            }
        }

        if exceeds(cpu, thresholds.overutilized_percent)
            || exceeds(memory, thresholds.overutilized_percent)
        {
            recommendations.push(Recommendation {
                recommendation_type: RecommendationType::NodeScaling,
                resource: record.name.clone(),
                namespace: None,
                description: format!(
                    "Node {} is overutilized (CPU: {}, Memory: {})",
                    record.name,
                    percent(cpu),
                    percent(memory)
                ),
                impact: "Consider scaling up or adding more nodes".to_string(),
                potential_savings: thresholds.node_scaling_savings,
                priority: Priority::High,
                timestamp: now,
            });
        }
    }

    recommendations
}

/// Per-container CPU and memory rightsizing rules
pub fn evaluate_pods(
    pods: &[PodAnalysis],
    thresholds: &RuleThresholds,
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for analysis in pods {
        let pod = &analysis.pod;
        let resource = format!("{}/{}", pod.namespace, pod.name);

        for container in &pod.containers {
            let Some(usage) = analysis.usage.container(&container.name) else {
                continue;
            };

            if let Some(request) = container.cpu_request_millicores {
                if request > 0 && usage.cpu_millicores < request / 2 {
                    recommendations.push(Recommendation {
                        recommendation_type: RecommendationType::ResourceRightsizing,
                        resource: resource.clone(),
                        namespace: Some(pod.namespace.clone()),
                        description: format!(
                            "Container {} is over-provisioned for CPU (request: {}m, usage: {}m)",
                            container.name, request, usage.cpu_millicores
                        ),
                        impact: "Reduce CPU request to optimize resource allocation".to_string(),
                        potential_savings: thresholds.cpu_rightsizing_savings,
                        priority: Priority::Low,
                        timestamp: now,
                    });
                }
            }

            if let Some(request) = container.memory_request_bytes {
                if request > 0 && usage.memory_bytes < request / 2 {
                    recommendations.push(Recommendation {
                        recommendation_type: RecommendationType::ResourceRightsizing,
                        resource: resource.clone(),
                        namespace: Some(pod.namespace.clone()),
                        description: format!(
                            "Container {} is over-provisioned for memory (request: {}, usage: {})",
                            container.name,
                            format_bytes(request),
                            format_bytes(usage.memory_bytes)
                        ),
                        impact: "Reduce memory request to optimize resource allocation"
                            .to_string(),
                        potential_savings: thresholds.memory_rightsizing_savings,
                        priority: Priority::Low,
                        timestamp: now,
                    });
                }
            }
        }
    }

    recommendations
}

/// Autoscaling and resource governance rules
pub fn evaluate_deployments(
    deployments: &[DeploymentDescriptor],
    thresholds: &RuleThresholds,
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for deployment in deployments {
        let resource = format!("{}/{}", deployment.namespace, deployment.name);

        if deployment.replicas > 1 {
            recommendations.push(Recommendation {
                recommendation_type: RecommendationType::HorizontalScaling,
                resource: resource.clone(),
                namespace: Some(deployment.namespace.clone()),
                description: format!(
                    "Deployment {} could benefit from auto-scaling based on metrics ({} replicas)",
                    deployment.name, deployment.replicas
                ),
                impact: "Implement HPA to scale based on CPU/memory usage".to_string(),
                potential_savings: thresholds.horizontal_scaling_savings,
                priority: Priority::Medium,
                timestamp: now,
            });
        }

        if !deployment
            .containers
            .iter()
            .any(|c| c.declares_resources())
        {
            recommendations.push(Recommendation {
                recommendation_type: RecommendationType::ResourceGovernance,
                resource,
                namespace: Some(deployment.namespace.clone()),
                description: format!(
                    "Deployment {} lacks resource requests/limits",
                    deployment.name
                ),
                impact: "Add resource requests and limits for better scheduling and cost control"
                    .to_string(),
                potential_savings: thresholds.governance_savings,
                priority: Priority::Medium,
                timestamp: now,
            });
        }
    }

    recommendations
}

/// Concatenate node, pod and deployment findings in that order
pub fn evaluate_all(
    nodes: &[NodeAnalysis],
    pods: &[PodAnalysis],
    deployments: &[DeploymentDescriptor],
    cost_model: &CostModel,
    thresholds: &RuleThresholds,
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut recommendations = evaluate_nodes(nodes, cost_model, thresholds, now);
    recommendations.extend(evaluate_pods(pods, thresholds, now));
    recommendations.extend(evaluate_deployments(deployments, thresholds, now));
    recommendations
}

fn format_bytes(bytes: u64) -> String {
    const KI: u64 = 1024;
    const MI: u64 = KI * 1024;
    const GI: u64 = MI * 1024;

    if bytes >= GI && bytes % GI == 0 {
        format!("{}Gi", bytes / GI)
    } else if bytes >= MI && bytes % MI == 0 {
        format!("{}Mi", bytes / MI)
    } else if bytes >= KI && bytes % KI == 0 {
        format!("{}Ki", bytes / KI)
    } else {
        bytes.to_string()
    }
}
