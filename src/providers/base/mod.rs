use crate::errors::ParleyError;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderMetrics {
    pub request_count: u64,
    pub token_count: u64,
    pub error_count: u64,
}

/// A text-generation backend. Implementations fail with a typed error on
/// quota, auth or transport problems; callers reach them through
/// [`crate::providers::ResilientGenerator`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, ParleyError>;

    fn name(&self) -> &str;

    /// Accumulated request/token/error counts. Zeroed for providers that
    /// don't track them.
    fn metrics(&self) -> ProviderMetrics {
        ProviderMetrics::default()
    }
}

/// Stands in when no API key is configured. Every call fails with a
/// non-retryable config error, so the circuit is never tripped by it.
pub struct UnconfiguredProvider;

#[async_trait]
impl TextGenerator for UnconfiguredProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _system_instruction: Option<&str>,
    ) -> Result<String, ParleyError> {
        Err(ParleyError::Config(
            "no AI provider configured (set provider.gemini.apiKey or PARLEY_GEMINI_API_KEY)"
                .into(),
        ))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}
