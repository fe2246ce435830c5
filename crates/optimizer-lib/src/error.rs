//! Error types for the cost optimizer engine

use std::time::Duration;
use thiserror::Error;

/// Failure of an inventory, metrics or action-executor call
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The collaborator responded with an error or could not be reached
    #[error("{operation} failed: {message}")]
    Unavailable { operation: String, message: String },

    /// The call did not finish within the configured bound
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// The collaborator answered with a payload that could not be decoded
    #[error("{operation} returned an undecodable response: {message}")]
    Decode { operation: String, message: String },
}

impl ProviderError {
    pub fn unavailable(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ProviderError::Unavailable {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ProviderError::Decode {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

/// Errors surfaced by the engine's query and action interface
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("action {0} is already being executed")]
    ActionInProgress(String),

    #[error("action {id} could not be executed: {source}")]
    ExecutionFailed {
        id: String,
        #[source]
        source: ProviderError,
    },

    #[error("refresh scheduler is not running")]
    SchedulerStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Timeout {
            operation: "list_nodes".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "list_nodes timed out after 30s");

        let err = ProviderError::unavailable("list_pod_metrics", "connection refused");
        assert!(err.to_string().contains("connection refused"));
    }
}
