//! Cluster cost rollup
//!
//! Folds per-node and per-pod records plus the cycle's recommendations into
//! one [`ClusterCostSummary`].

use crate::cost::CostModel;
use crate::models::{ClusterCostSummary, NodeResourceRecord, PodResourceRecord, Recommendation};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Nodes below this utilization on either dimension count toward waste
pub const WASTE_UTILIZATION_PERCENT: f64 = 50.0;

/// Share of an underused node's monthly cost counted as waste
pub const WASTE_FACTOR: f64 = 0.3;

fn below(value: Option<f64>, threshold: f64) -> bool {
    value.map(|v| v < threshold).unwrap_or(false)
}

/// Estimated monthly spend on underused nodes
pub fn wasted_resources(nodes: &[NodeResourceRecord]) -> f64 {
    nodes
        .iter()
        .filter(|n| {
            below(n.cpu_utilization, WASTE_UTILIZATION_PERCENT)
                || below(n.memory_utilization, WASTE_UTILIZATION_PERCENT)
        })
        .map(|n| n.estimated_monthly_cost * WASTE_FACTOR)
        .sum()
}

/// Pod estimated costs grouped by namespace
pub fn namespace_costs(pods: &[PodResourceRecord]) -> BTreeMap<String, f64> {
    let mut costs = BTreeMap::new();
    for pod in pods {
        *costs.entry(pod.namespace.clone()).or_insert(0.0) += pod.estimated_monthly_cost;
    }
    costs
}

/// Build the cluster summary for one cycle
pub fn summarize(
    nodes: &[NodeResourceRecord],
    pods: &[PodResourceRecord],
    recommendations: &[Recommendation],
    cost_model: &CostModel,
    now: DateTime<Utc>,
) -> ClusterCostSummary {
    let compute_cost: f64 = nodes.iter().map(|n| n.estimated_monthly_cost).sum();
    // No volume inventory yet; price the assumed capacity
    let storage_cost = cost_model.storage_monthly_cost(cost_model.storage_placeholder_gb);
    let potential_savings: f64 = recommendations.iter().map(|r| r.potential_savings).sum();

    ClusterCostSummary {
        total_monthly_cost: compute_cost + storage_cost,
        compute_cost,
        storage_cost,
        wasted_resources: wasted_resources(nodes),
        potential_savings,
        node_count: nodes.len(),
        pod_count: pods.len(),
        namespace_costs: namespace_costs(pods),
        recommendation_count: recommendations.len(),
        last_updated: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, RecommendationType};

    fn node(name: &str, cpu: Option<f64>, mem: Option<f64>, monthly: f64) -> NodeResourceRecord {
        NodeResourceRecord {
            name: name.to_string(),
            cpu_capacity_cores: 2.0,
            memory_capacity_gb: 8.0,
            cpu_usage_cores: 0.0,
            memory_usage_gb: 0.0,
            cpu_utilization: cpu,
            memory_utilization: mem,
            instance_type: "default".to_string(),
            hourly_rate: monthly / 720.0,
            estimated_monthly_cost: monthly,
        }
    }

    fn pod(name: &str, namespace: &str, cost: f64) -> PodResourceRecord {
        PodResourceRecord {
            name: name.to_string(),
            namespace: namespace.to_string(),
            cpu_usage_cores: 0.0,
            memory_usage_gb: 0.0,
            cpu_request_cores: 0.0,
            memory_request_gb: 0.0,
            cpu_limit_cores: 0.0,
            memory_limit_gb: 0.0,
            estimated_monthly_cost: cost,
        }
    }

    fn rec(savings: f64) -> Recommendation {
        Recommendation {
            recommendation_type: RecommendationType::ResourceGovernance,
            resource: "x".to_string(),
            namespace: None,
            description: String::new(),
            impact: String::new(),
            potential_savings: savings,
            priority: Priority::Medium,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_waste_counts_nodes_below_half_on_either_dimension() {
        let nodes = vec![
            node("idle-cpu", Some(10.0), Some(80.0), 100.0),
            node("busy", Some(70.0), Some(60.0), 100.0),
            node("idle-mem", Some(90.0), Some(49.9), 200.0),
            node("unknown-mem", Some(75.0), None, 300.0),
        ];

        let waste = wasted_resources(&nodes);
        assert!((waste - (30.0 + 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_totals() {
        let nodes = vec![
            node("a", Some(10.0), Some(10.0), 60.0),
            node("b", Some(80.0), Some(80.0), 40.0),
        ];
        let pods = vec![
            pod("p1", "shop", 5.0),
            pod("p2", "shop", 2.5),
            pod("p3", "ops", 1.0),
        ];
        let recs = vec![rec(41.93), rec(-50.0), rec(20.0)];

        let summary = summarize(&nodes, &pods, &recs, &CostModel::default(), Utc::now());

        assert!((summary.compute_cost - 100.0).abs() < 1e-9);
        assert_eq!(summary.storage_cost, 100.0);
        assert!((summary.total_monthly_cost - 200.0).abs() < 1e-9);
        assert!((summary.wasted_resources - 18.0).abs() < 1e-9);
        assert!((summary.potential_savings - 11.93).abs() < 1e-9);
        assert_eq!(summary.node_count, 2);
        assert_eq!(summary.pod_count, 3);
        assert_eq!(summary.recommendation_count, 3);
        assert_eq!(summary.namespace_costs["shop"], 7.5);
        assert_eq!(summary.namespace_costs["ops"], 1.0);
    }

    #[test]
    fn test_namespace_costs_sum_to_pod_costs() {
        let pods = vec![pod("p1", "a", 1.25), pod("p2", "b", 3.5), pod("p3", "a", 0.25)];
        let total_pods: f64 = pods.iter().map(|p| p.estimated_monthly_cost).sum();
        let total_ns: f64 = namespace_costs(&pods).values().sum();
        assert!((total_pods - total_ns).abs() < 1e-9);
    }

    #[test]
    fn test_net_savings_can_be_negative() {
        let recs = vec![rec(-50.0), rec(-50.0), rec(15.0)];
        let summary = summarize(&[], &[], &recs, &CostModel::default(), Utc::now());
        assert_eq!(summary.potential_savings, -85.0);
        assert_eq!(summary.compute_cost, 0.0);
        assert_eq!(summary.total_monthly_cost, 100.0);
    }
}
