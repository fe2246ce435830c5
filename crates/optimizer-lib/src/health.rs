//! Component health for liveness and readiness checks
//!
//! The scheduler reports provider outcomes here after every cycle. The
//! service becomes ready once the first cycle has been published.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Last call failed, results for that component are being omitted
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        !matches!(self, ComponentStatus::Unhealthy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|h| h.status)
            .fold(ComponentStatus::Healthy, |worst, status| match (worst, status) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const INVENTORY: &str = "inventory";
    pub const METRICS: &str = "metrics";
    pub const SCHEDULER: &str = "scheduler";
}

#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    first_cycle_published: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every optimizer component registered as healthy
    pub async fn with_optimizer_components() -> Self {
        let registry = Self::new();
        for name in [components::INVENTORY, components::METRICS, components::SCHEDULER] {
            registry.set_healthy(name).await;
        }
        registry
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn mark_cycle_published(&self) {
        *self.first_cycle_published.write().await = true;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let published = *self.first_cycle_published.read().await;
        let health = self.health().await;

        let reason = if !published {
            Some("No analysis cycle has completed yet".to_string())
        } else if !health.status.is_operational() {
            Some("Critical component unhealthy".to_string())
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_optimizer_components_start_healthy() {
        let registry = HealthRegistry::with_optimizer_components().await;
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components.len(), 3);
        assert!(health.components.contains_key(components::SCHEDULER));
    }

    #[tokio::test]
    async fn test_degraded_provider_degrades_overall_status() {
        let registry = HealthRegistry::with_optimizer_components().await;
        registry
            .set_degraded(components::METRICS, "list_pod_metrics timed out after 30s")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.components[components::METRICS].message.is_some());
    }

    #[tokio::test]
    async fn test_unhealthy_wins_over_degraded() {
        let registry = HealthRegistry::with_optimizer_components().await;
        registry.set_degraded(components::INVENTORY, "slow").await;
        registry.set_unhealthy(components::SCHEDULER, "stopped").await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_not_ready_before_first_cycle() {
        let registry = HealthRegistry::with_optimizer_components().await;
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_ready_after_first_cycle_even_if_degraded() {
        let registry = HealthRegistry::with_optimizer_components().await;
        registry.set_degraded(components::METRICS, "metrics-server down").await;
        registry.mark_cycle_published().await;

        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_not_ready_when_unhealthy() {
        let registry = HealthRegistry::with_optimizer_components().await;
        registry.mark_cycle_published().await;
        registry.set_unhealthy(components::SCHEDULER, "stopped").await;

        assert!(!registry.readiness().await.ready);
    }
}
