//! HTTP transport
//!
//! One POST per call, no retries. The body is `{tool_name, tool_use_id,
//! parameters}`; any JSON object that comes back is the result.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::config::HttpConfig;
use crate::error::{ConfigError, ToolError, ToolResult};
use crate::types::ToolRequest;

/// Stateless client for the remote tool endpoint
#[derive(Debug, Clone)]
pub struct HttpTransportClient {
    client: Client,
    endpoint: url::Url,
}

impl HttpTransportClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let endpoint =
            url::Url::parse(endpoint).map_err(|_| ConfigError::Endpoint(endpoint.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self, ConfigError> {
        Self::new(&config.endpoint, config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Send one request and return the parsed response envelope
    ///
    /// The status code is not inspected: application errors arrive as JSON
    /// objects and are returned as `Ok`.
    pub async fn call(&self, request: &ToolRequest) -> ToolResult {
        tracing::debug!(
            "POST {} tool={} id={}",
            self.endpoint,
            request.tool_name,
            request.correlation_id
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| ToolError::network(format!("Request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ToolError::network(format!("Failed to read response body: {}", e)))?;

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            ToolError::network(format!("Malformed response body (HTTP {}): {}", status, e))
        })?;

        if !value.is_object() {
            return Err(ToolError::network(format!(
                "Unexpected response envelope (HTTP {}): {}",
                status, value
            )));
        }

        if !status.is_success() {
            tracing::debug!("Endpoint answered HTTP {} with an error object", status);
        }
        Ok(value)
    }
}
