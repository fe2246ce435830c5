//! Pricing model for nodes, pods and storage
//!
//! Node cost comes from an hourly rate per instance type. Pod cost is an
//! independent estimate from requested CPU and memory at fixed unit rates.

use crate::models::BYTES_PER_GIB;
use serde::{Deserialize, Serialize};

/// Hours in the fixed 30-day billing month
pub const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// Instance type reported when no known label matches
pub const DEFAULT_INSTANCE_TYPE: &str = "default";

/// Sample on-demand pricing, USD per hour
const DEFAULT_PRICING: &[(&str, f64)] = &[
    ("t3.micro", 0.0104),
    ("t3.small", 0.0208),
    ("t3.medium", 0.0416),
    ("t3.large", 0.0832),
    ("t3.xlarge", 0.1664),
    ("t3.2xlarge", 0.3328),
    ("m5.large", 0.096),
    ("m5.xlarge", 0.192),
    ("m5.2xlarge", 0.384),
    ("m5.4xlarge", 0.768),
    ("c5.large", 0.085),
    ("c5.xlarge", 0.17),
    ("c5.2xlarge", 0.34),
    ("c5.4xlarge", 0.68),
];

/// One row of the pricing table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancePrice {
    pub instance_type: String,
    pub hourly_rate: f64,
}

/// Static pricing table plus unit rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Ordered pricing table; name matching scans it front to back
    pub pricing: Vec<InstancePrice>,
    /// Rate for nodes whose instance type is unknown
    pub default_hourly_rate: f64,
    /// Pod estimate, USD per requested core-hour
    pub cpu_core_hour_rate: f64,
    /// Pod estimate, USD per requested GiB-hour
    pub memory_gb_hour_rate: f64,
    /// USD per GB-month of storage
    pub storage_cost_per_gb_month: f64,
    /// Assumed provisioned storage, priced into every summary
    pub storage_placeholder_gb: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            pricing: DEFAULT_PRICING
                .iter()
                .map(|(instance_type, hourly_rate)| InstancePrice {
                    instance_type: instance_type.to_string(),
                    hourly_rate: *hourly_rate,
                })
                .collect(),
            default_hourly_rate: 0.1,
            cpu_core_hour_rate: 0.05,
            memory_gb_hour_rate: 0.01,
            storage_cost_per_gb_month: 0.10,
            storage_placeholder_gb: 1000.0,
        }
    }
}

impl CostModel {
    /// Hourly rate for an instance type, falling back to the default rate
    pub fn hourly_rate(&self, instance_type: &str) -> f64 {
        self.pricing
            .iter()
            .find(|p| p.instance_type == instance_type)
            .map(|p| p.hourly_rate)
            .unwrap_or(self.default_hourly_rate)
    }

    /// Guess a node's instance type from its name.
    ///
    /// Matching is a case-insensitive substring test against each known
    /// label in table order; the first hit wins. Returns
    /// [`DEFAULT_INSTANCE_TYPE`] when nothing matches.
    pub fn resolve_instance_type(&self, node_name: &str) -> String {
        let lowered = node_name.to_lowercase();
        self.pricing
            .iter()
            .find(|p| lowered.contains(&p.instance_type.to_lowercase()))
            .map(|p| p.instance_type.clone())
            .unwrap_or_else(|| DEFAULT_INSTANCE_TYPE.to_string())
    }

    /// Resolve an instance type, preferring an explicit known label over name matching
    pub fn resolve_node_instance_type(&self, node_name: &str, label: Option<&str>) -> String {
        match label {
            Some(label) if self.is_known(label) => label.to_string(),
            _ => self.resolve_instance_type(node_name),
        }
    }

    /// Replace rates for listed types; unlisted types are appended in order
    pub fn override_prices(&mut self, prices: impl IntoIterator<Item = InstancePrice>) {
        for price in prices {
            match self
                .pricing
                .iter_mut()
                .find(|p| p.instance_type == price.instance_type)
            {
                Some(existing) => existing.hourly_rate = price.hourly_rate,
                None => self.pricing.push(price),
            }
        }
    }

    pub fn is_known(&self, instance_type: &str) -> bool {
        self.pricing.iter().any(|p| p.instance_type == instance_type)
    }

    /// Monthly cost over a fixed 30-day month
    pub fn monthly_cost(&self, hourly_rate: f64) -> f64 {
        hourly_rate * HOURS_PER_MONTH
    }

    /// Monthly estimate for a pod from its summed requests
    pub fn pod_monthly_cost(&self, cpu_request_millicores: u64, memory_request_bytes: u64) -> f64 {
        let cores = cpu_request_millicores as f64 / 1000.0;
        let gib = memory_request_bytes as f64 / BYTES_PER_GIB;
        cores * self.cpu_core_hour_rate * HOURS_PER_MONTH
            + gib * self.memory_gb_hour_rate * HOURS_PER_MONTH
    }

    /// Monthly cost of a given amount of storage
    pub fn storage_monthly_cost(&self, gigabytes: f64) -> f64 {
        gigabytes * self.storage_cost_per_gb_month
    }
}

/// Round a currency amount to cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
