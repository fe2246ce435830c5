//! Catalog of proposable optimization actions
//!
//! The catalog only tracks status. Performing the mutation is delegated to
//! an [`ActionExecutor`].

use crate::error::EngineError;
use crate::models::{ActionStatus, OptimizationAction};
use crate::provider::ActionExecutor;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct ActionCatalog {
    actions: RwLock<Vec<OptimizationAction>>,
    /// Ids handed to the executor and not yet settled
    in_flight: Mutex<HashSet<String>>,
}

/// Clears an in-flight mark when execution ends or its future is dropped
struct InFlight<'a> {
    catalog: &'a ActionCatalog,
    id: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.catalog.in_flight_ids().remove(self.id);
    }
}

impl ActionCatalog {
    pub fn new(actions: Vec<OptimizationAction>) -> Self {
        Self {
            actions: RwLock::new(actions),
            in_flight: Mutex::default(),
        }
    }

    fn in_flight_ids(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Catalog seeded with the built-in scale-down proposal
    pub fn with_defaults() -> Self {
        let mut parameters = serde_json::Map::new();
        parameters.insert("replicas".to_string(), serde_json::Value::from(1));

        Self::new(vec![OptimizationAction {
            id: "1".to_string(),
            action_type: "scale_down".to_string(),
            resource: "default/nginx-deployment".to_string(),
            namespace: "default".to_string(),
            action: "Scale deployment to 1 replica".to_string(),
            parameters,
            status: ActionStatus::Pending,
            created_at: Utc::now(),
            executed_at: None,
        }])
    }

    pub async fn list(&self) -> Vec<OptimizationAction> {
        self.actions.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<OptimizationAction> {
        self.actions.read().await.iter().find(|a| a.id == id).cloned()
    }

    /// Execute a pending action through `executor`
    ///
    /// Already executed actions are returned as they are. A failed execution
    /// leaves the action pending. The catalog is not locked while the
    /// executor runs; a second request for the same action in that window
    /// gets [`EngineError::ActionInProgress`].
    pub async fn execute(
        &self,
        id: &str,
        executor: &dyn ActionExecutor,
    ) -> Result<OptimizationAction, EngineError> {
        let (pending, mark) = {
            let actions = self.actions.read().await;
            let action = actions
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| EngineError::ActionNotFound(id.to_string()))?;

            if action.status == ActionStatus::Executed {
                info!(action_id = %id, "Action already executed");
                return Ok(action);
            }
            // Checked under the read lock, so a finished run is seen as Executed
            if !self.in_flight_ids().insert(id.to_string()) {
                return Err(EngineError::ActionInProgress(id.to_string()));
            }
            (action, InFlight { catalog: self, id })
        };

        let outcome = executor.execute(&pending).await;

        let mut actions = self.actions.write().await;
        drop(mark);

        if let Err(source) = outcome {
            warn!(action_id = %id, error = %source, "Action execution failed");
            return Err(EngineError::ExecutionFailed {
                id: id.to_string(),
                source,
            });
        }

        let action = actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| EngineError::ActionNotFound(id.to_string()))?;
        action.status = ActionStatus::Executed;
        action.executed_at = Some(Utc::now());
        Ok(action.clone())
    }
}
