//! HTTP client for the cost optimizer API

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

pub use optimizer_lib::models::{
    ClusterCostSummary, NodeResourceRecord, OptimizationAction, PodResourceRecord, Recommendation,
};

pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        self.send(self.client.get(url)).await
    }

    /// POST without a request body
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        self.send(self.client.post(url)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Failed to send request")?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn nodes(&self) -> Result<Vec<NodeResourceRecord>> {
        self.get("api/metrics/nodes").await
    }

    pub async fn pods(&self) -> Result<Vec<PodResourceRecord>> {
        self.get("api/metrics/pods").await
    }

    pub async fn recommendations(&self) -> Result<Vec<Recommendation>> {
        self.get("api/recommendations").await
    }

    pub async fn cost_summary(&self) -> Result<ClusterCostSummary> {
        self.get("api/cost-summary").await
    }

    pub async fn optimize(&self) -> Result<OptimizeResponse> {
        self.post("api/optimize").await
    }

    pub async fn actions(&self) -> Result<Vec<OptimizationAction>> {
        self.get("api/actions").await
    }

    pub async fn execute_action(&self, id: &str) -> Result<OptimizationAction> {
        let url = self.action_url(id)?;
        self.send(self.client.post(url)).await
    }

    /// Execute URL for an action, with the id percent-encoded as one segment
    fn action_url(&self, id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(["api", "actions", id, "execute"]);
        Ok(url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use optimizer_lib::models::{ActionStatus, Priority, RecommendationType};

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_recommendations_are_decoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/recommendations")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{
                    "type": "node_optimization",
                    "resource": "ip-10-0-1-5",
                    "description": "Node ip-10-0-1-5 is underutilized (CPU: 7.5%, Memory: 6.1%)",
                    "impact": "Consider consolidating workloads or downsizing",
                    "potential_savings": 41.93,
                    "priority": "medium",
                    "timestamp": "2024-05-01T12:00:00Z"
                }]"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let recs = client.recommendations().await.unwrap();

        mock.assert_async().await;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].recommendation_type, RecommendationType::NodeOptimization);
        assert_eq!(recs[0].priority, Priority::Medium);
        assert!(recs[0].namespace.is_none());
    }

    #[tokio::test]
    async fn test_optimize_posts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/optimize")
            .with_status(202)
            .with_body(r#"{"status":"optimization_coalesced","message":"A cost analysis is already pending"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.optimize().await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, "optimization_coalesced");
    }

    #[tokio::test]
    async fn test_execute_action() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/actions/1/execute")
            .with_status(200)
            .with_body(
                r#"{
                    "id": "1",
                    "type": "scale_down",
                    "resource": "default/nginx-deployment",
                    "namespace": "default",
                    "action": "Scale deployment to 1 replica",
                    "parameters": {"replicas": 1},
                    "status": "executed",
                    "created_at": "2024-05-01T12:00:00Z",
                    "executed_at": "2024-05-01T12:05:00Z"
                }"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let action = client.execute_action("1").await.unwrap();

        assert_eq!(action.status, ActionStatus::Executed);
        assert!(action.executed_at.is_some());
    }

    #[test]
    fn test_action_id_is_encoded() {
        let client = ApiClient::new("http://localhost:8080").unwrap();
        assert_eq!(
            client.action_url("1").unwrap().as_str(),
            "http://localhost:8080/api/actions/1/execute"
        );
        assert_eq!(
            client.action_url("a/b c?").unwrap().path(),
            "/api/actions/a%2Fb%20c%3F/execute"
        );
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/actions/99/execute")
            .with_status(404)
            .with_body(r#"{"error":"action not found: 99"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.execute_action("99").await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("action not found: 99"));
    }
}
