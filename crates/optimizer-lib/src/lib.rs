//! Cost attribution and recommendation engine for Kubernetes clusters
//!
//! This crate provides the core functionality for:
//! - Pricing nodes and pods from instance types and resource requests
//! - Utilization analysis over inventory and metrics-server samples
//! - Threshold-based recommendation rules and cluster cost rollups
//! - A single-flight refresh scheduler publishing consistent results
//! - Health checks and observability

pub mod actions;
pub mod aggregate;
pub mod cost;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod provider;
pub mod quantity;
pub mod rules;
pub mod utilization;

pub use actions::ActionCatalog;
pub use cost::CostModel;
pub use engine::{CostEngine, RefreshSchedulerBuilder, SchedulerConfig, TriggerOutcome};
pub use error::{EngineError, ProviderError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use rules::RuleThresholds;
