use crate::errors::ParleyError;
use serde_json::Value;
use tracing::{error, warn};

/// Maps non-success HTTP responses from downstream services onto typed
/// errors. Shared by the AI provider and the HTTP tool backend.
pub struct ProviderErrorHandler;

impl ProviderErrorHandler {
    /// Typed error for a failed API response body.
    pub fn parse_api_error(status: u16, error_text: &str) -> ParleyError {
        let retryable = matches!(status, 500 | 502 | 503 | 504);

        if let Ok(error_json) = serde_json::from_str::<Value>(error_text)
            && let Some(err) = error_json.get("error")
        {
            let error_type = err
                .get("status")
                .or_else(|| err.get("type"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let error_msg = err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            return ParleyError::Provider {
                message: format!("API error ({}): {}", error_type, error_msg),
                retryable,
            };
        }

        ParleyError::Provider {
            message: format!(
                "API error ({}): {}",
                status,
                crate::utils::truncate_at_char_boundary(error_text, 500)
            ),
            retryable,
        }
    }

    pub fn handle_rate_limit(status: u16, retry_after: Option<u64>) -> ParleyError {
        if let Some(seconds) = retry_after {
            warn!("Rate limit hit. Retry after {} seconds", seconds);
        } else {
            warn!("Rate limit hit (status: {})", status);
        }
        ParleyError::RateLimit { retry_after }
    }

    pub fn handle_auth_error(status: u16, error_text: &str) -> ParleyError {
        warn!("Authentication error (status: {}): {}", status, error_text);
        ParleyError::Auth(format!(
            "Authentication failed. Please check your API key or credentials. Error: {}",
            error_text
        ))
    }

    /// Pass successful responses through; consume the body of failed ones
    /// into a typed error.
    pub async fn check_http_status(
        resp: reqwest::Response,
        service: &str,
    ) -> Result<reqwest::Response, ParleyError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let error_text = resp
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());

        error!("{} request failed with status {}", service, status);
        match status.as_u16() {
            429 => Err(Self::handle_rate_limit(429, retry_after)),
            code @ (401 | 403) => Err(Self::handle_auth_error(code, &error_text)),
            code => Err(Self::parse_api_error(code, &error_text)),
        }
    }

    /// Check the status, then decode the JSON body. A body carrying an
    /// `error` object is treated as a failure even with a 200 status.
    pub async fn check_response(resp: reqwest::Response, service: &str) -> Result<Value, ParleyError> {
        let resp = Self::check_http_status(resp, service).await?;

        let json: Value = resp.json().await.map_err(|e| ParleyError::Provider {
            message: format!("Failed to parse {} response: {}", service, e),
            retryable: false,
        })?;

        if let Some(error_val) = json.get("error").filter(|v| !v.is_null()) {
            let error_text = serde_json::json!({ "error": error_val }).to_string();
            error!("{} returned an error payload", service);
            return Err(Self::parse_api_error(200, &error_text));
        }

        Ok(json)
    }
}

/// Transport failures (connect refused, reset, client-side timeout) are transient.
pub fn transport_error(service: &str, err: &reqwest::Error) -> ParleyError {
    ParleyError::Provider {
        message: format!("{} request failed: {}", service, err),
        retryable: true,
    }
}
