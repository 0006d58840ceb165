use crate::errors::ParleyError;
use crate::providers::errors::{ProviderErrorHandler, transport_error};
use crate::tools::base::{CallerContext, ToolErrorKind, ToolHandler, ToolResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};
use tracing::debug;

const SERVICE: &str = "tool backend";

/// Executes catalog tools by POSTing `{tool, params, caller}` to a single
/// endpoint that answers with a `ToolResult` document.
pub struct HttpToolBackend {
    url: String,
    client: Client,
}

impl HttpToolBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: crate::providers::provider_http_client(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ToolHandler for HttpToolBackend {
    async fn call(
        &self,
        tool: &str,
        params: Map<String, Value>,
        caller: &CallerContext,
    ) -> Result<ToolResult, ParleyError> {
        let body = json!({
            "tool": tool,
            "params": params,
            "caller": caller,
        });
        let resp = self
            .client
            .post(&self.url)
            .header("x-request-id", &caller.request_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;

        let resp = ProviderErrorHandler::check_http_status(resp, SERVICE).await?;
        let result: ToolResult = resp.json().await.map_err(|e| ParleyError::Provider {
            message: format!("malformed {} response for '{}': {}", SERVICE, tool, e),
            retryable: false,
        })?;
        debug!(
            "[{}] backend answered '{}' (success={})",
            caller.request_id, tool, result.success
        );
        Ok(result)
    }
}

/// Bound to catalog tools when no backend is configured.
pub struct UnavailableHandler;

pub const UNAVAILABLE_MESSAGE: &str = "This operation is not available in this deployment.";

#[async_trait]
impl ToolHandler for UnavailableHandler {
    async fn call(
        &self,
        tool: &str,
        _params: Map<String, Value>,
        caller: &CallerContext,
    ) -> Result<ToolResult, ParleyError> {
        debug!("[{}] no backend for tool '{}'", caller.request_id, tool);
        Ok(ToolResult::failure(
            ToolErrorKind::Unavailable,
            UNAVAILABLE_MESSAGE,
        ))
    }
}
