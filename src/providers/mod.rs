pub mod base;
pub mod errors;
pub mod gemini;
pub mod resilient;

pub use base::{ProviderMetrics, TextGenerator, UnconfiguredProvider};
pub use gemini::GeminiProvider;
pub use resilient::{AI_DEPENDENCY, ResilientGenerator};

use crate::config::ProviderConfig;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Connect timeout for outbound HTTP clients (seconds).
pub(crate) const PROVIDER_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Overall request timeout for outbound HTTP clients (seconds).
pub(crate) const PROVIDER_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Build a `reqwest::Client` with standard timeouts (30 s connect, 120 s overall).
pub(crate) fn provider_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(PROVIDER_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(PROVIDER_REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// The configured provider, or [`UnconfiguredProvider`] without an API key.
pub fn create_provider(config: &ProviderConfig) -> Arc<dyn TextGenerator> {
    if config.gemini.api_key.trim().is_empty() {
        tracing::warn!("no Gemini API key configured, AI replies are disabled");
        Arc::new(UnconfiguredProvider)
    } else {
        Arc::new(GeminiProvider::from_config(&config.gemini))
    }
}
