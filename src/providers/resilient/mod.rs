use crate::config::RetryOptions;
use crate::errors::ParleyError;
use crate::providers::base::{ProviderMetrics, TextGenerator};
use crate::resilience::RetryExecutor;
use async_trait::async_trait;
use std::sync::Arc;

/// Circuit name shared by every AI generation call.
pub const AI_DEPENDENCY: &str = "ai";

/// Routes every generation through the retry executor under the `ai`
/// circuit, so a failing provider degrades to fast failures.
pub struct ResilientGenerator {
    inner: Arc<dyn TextGenerator>,
    retry: RetryExecutor,
    options: RetryOptions,
}

impl ResilientGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, retry: RetryExecutor, options: RetryOptions) -> Self {
        Self {
            inner,
            retry,
            options,
        }
    }
}

#[async_trait]
impl TextGenerator for ResilientGenerator {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, ParleyError> {
        self.retry
            .execute(AI_DEPENDENCY, &self.options, || {
                self.inner.generate(prompt, system_instruction)
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn metrics(&self) -> ProviderMetrics {
        self.inner.metrics()
    }
}
