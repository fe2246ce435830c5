//! Observability for the cost optimizer
//!
//! Provides:
//! - Prometheus metrics (cycle latency, cycle count, provider failures, cost gauges)
//! - Structured JSON logging with tracing

use crate::engine::ResourceKind;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for cycle durations (in seconds)
const CYCLE_LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    cycle_latency_seconds: Histogram,
    cycles_total: IntCounter,
    provider_failures_total: IntCounterVec,
    recommendations: IntGauge,
    potential_savings: Gauge,
    monthly_cost: Gauge,
    triggers_coalesced_total: IntCounter,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "cost_optimizer_cycle_latency_seconds",
                "Time spent running one analysis cycle",
                CYCLE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            cycles_total: register_int_counter!(
                "cost_optimizer_cycles_total",
                "Number of completed analysis cycles"
            )
            .expect("Failed to register cycles_total"),

            provider_failures_total: register_int_counter_vec!(
                "cost_optimizer_provider_failures_total",
                "Inventory or metrics calls that failed or timed out",
                &["kind"]
            )
            .expect("Failed to register provider_failures_total"),

            recommendations: register_int_gauge!(
                "cost_optimizer_recommendations",
                "Recommendations in the last published cycle"
            )
            .expect("Failed to register recommendations"),

            potential_savings: register_gauge!(
                "cost_optimizer_potential_savings_monthly",
                "Net potential monthly savings of the last published cycle"
            )
            .expect("Failed to register potential_savings"),

            monthly_cost: register_gauge!(
                "cost_optimizer_total_monthly_cost",
                "Estimated total monthly cluster cost"
            )
            .expect("Failed to register monthly_cost"),

            triggers_coalesced_total: register_int_counter!(
                "cost_optimizer_triggers_coalesced_total",
                "On-demand triggers absorbed by an already pending cycle"
            )
            .expect("Failed to register triggers_coalesced_total"),
        }
    }
}

/// Handle to the process-wide optimizer metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct EngineMetrics {
    inner: &'static EngineMetricsInner,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            inner: GLOBAL_METRICS.get_or_init(EngineMetricsInner::new),
        }
    }

    pub fn observe_cycle(&self, duration_secs: f64) {
        self.inner.cycle_latency_seconds.observe(duration_secs);
        self.inner.cycles_total.inc();
    }

    pub fn inc_provider_failure(&self, kind: ResourceKind) {
        self.inner
            .provider_failures_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Update the gauges that mirror the published cycle
    pub fn set_cycle_outputs(&self, recommendations: usize, potential_savings: f64, monthly_cost: f64) {
        self.inner.recommendations.set(recommendations as i64);
        self.inner.potential_savings.set(potential_savings);
        self.inner.monthly_cost.set(monthly_cost);
    }

    pub fn inc_coalesced_trigger(&self) {
        self.inner.triggers_coalesced_total.inc();
    }

    pub fn cycles_completed(&self) -> u64 {
        self.inner.cycles_total.get()
    }
}

/// Structured logger for optimizer events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_cycle_completed(
        &self,
        generation: u64,
        nodes: usize,
        pods: usize,
        recommendations: usize,
        potential_savings: f64,
        failures: usize,
        elapsed_ms: u128,
    ) {
        info!(
            event = "cycle_completed",
            instance = %self.instance,
            generation = generation,
            nodes = nodes,
            pods = pods,
            recommendations = recommendations,
            potential_savings = potential_savings,
            failures = failures,
            elapsed_ms = elapsed_ms as u64,
            "Analysis cycle published"
        );
    }

    pub fn log_provider_unavailable(&self, kind: ResourceKind, error: &str) {
        warn!(
            event = "provider_unavailable",
            instance = %self.instance,
            kind = %kind.as_str(),
            error = %error,
            "Provider call failed, omitting this resource kind for the cycle"
        );
    }

    pub fn log_action_executed(&self, id: &str, action_type: &str, resource: &str, namespace: &str) {
        info!(
            event = "action_executed",
            instance = %self.instance,
            action_id = %id,
            action_type = %action_type,
            resource = %resource,
            namespace = %namespace,
            "Optimization action executed"
        );
    }

    pub fn log_startup(&self, version: &str, refresh_interval_secs: u64) {
        info!(
            event = "optimizer_started",
            instance = %self.instance,
            version = %version,
            refresh_interval_secs = refresh_interval_secs,
            "Cost optimizer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "optimizer_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Cost optimizer shutting down"
        );
    }
}
