use crate::config::GeminiConfig;
use crate::errors::ParleyError;
use crate::providers::base::{ProviderMetrics, TextGenerator};
use crate::providers::errors::{ProviderErrorHandler, transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing::debug;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    metrics: Arc<Mutex<ProviderMetrics>>,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, BASE_URL.to_string())
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| BASE_URL.to_string());
        Self::with_base_url(config.api_key.clone(), config.model.clone(), base_url)
    }

    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: super::provider_http_client(),
            metrics: Arc::new(Mutex::new(ProviderMetrics::default())),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn parse_response(json: &Value) -> Result<String, ParleyError> {
        let candidate = json["candidates"]
            .as_array()
            .and_then(|arr| arr.first())
            .ok_or_else(|| ParleyError::Provider {
                message: "No candidates in Gemini response".into(),
                retryable: false,
            })?;

        let text: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
            return Err(ParleyError::Provider {
                message: format!("Empty Gemini response (finishReason: {})", reason),
                retryable: false,
            });
        }
        Ok(text)
    }

    fn count_error(&self) {
        if let Ok(mut m) = self.metrics.lock() {
            m.error_count += 1;
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, ParleyError> {
        let mut payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "maxOutputTokens": 1024,
                "temperature": 0.7,
            },
        });
        if let Some(instruction) = system_instruction {
            payload["systemInstruction"] = json!({"parts": [{"text": instruction}]});
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let resp = match self.client.post(&url).json(&payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.count_error();
                return Err(transport_error("Gemini", &e));
            }
        };

        let json = match ProviderErrorHandler::check_response(resp, "Gemini").await {
            Ok(json) => json,
            Err(e) => {
                self.count_error();
                return Err(e);
            }
        };

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.request_count += 1;
            if let Some(tokens) = json
                .get("usageMetadata")
                .and_then(|u| u.get("totalTokenCount"))
                .and_then(Value::as_u64)
            {
                metrics.token_count += tokens;
            }
        }

        let text = Self::parse_response(&json)?;
        debug!("gemini returned {} chars", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn metrics(&self) -> ProviderMetrics {
        self.metrics.lock().map(|m| *m).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests;
