use serde::{Deserialize, Serialize};

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_ms() -> u64 {
    60_000
}

fn default_success_threshold() -> u32 {
    2
}

/// Bounded-retry options for one class of downstream call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOptions {
    #[serde(default, rename = "maxRetries")]
    pub max_retries: u32,
    #[serde(default, rename = "baseDelayMs")]
    pub base_delay_ms: u64,
    #[serde(default, rename = "maxDelayMs")]
    pub max_delay_ms: u64,
    #[serde(default, rename = "exponentialBackoff")]
    pub exponential_backoff: bool,
    /// Add up to 25% random jitter to each backoff delay.
    #[serde(default)]
    pub jitter: bool,
    /// Per-attempt timeout; a hung operation is cancelled when it elapses.
    #[serde(default, rename = "timeoutMs")]
    pub timeout_ms: u64,
}

impl RetryOptions {
    pub fn ai() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            exponential_backoff: true,
            jitter: true,
            timeout_ms: 60_000,
        }
    }

    pub fn tools() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 500,
            max_delay_ms: 5000,
            exponential_backoff: true,
            jitter: true,
            timeout_ms: 30_000,
        }
    }

    /// Commands are never retried; a restart that half-succeeded must not run twice.
    pub fn exec() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
            exponential_backoff: false,
            jitter: false,
            timeout_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default = "default_failure_threshold", rename = "failureThreshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout_ms", rename = "recoveryTimeoutMs")]
    pub recovery_timeout_ms: u64,
    #[serde(default = "default_success_threshold", rename = "successThreshold")]
    pub success_threshold: u32,
    #[serde(default = "RetryOptions::ai")]
    pub ai: RetryOptions,
    #[serde(default = "RetryOptions::tools")]
    pub tools: RetryOptions,
    #[serde(default = "RetryOptions::exec")]
    pub exec: RetryOptions,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_ms: default_recovery_timeout_ms(),
            success_threshold: default_success_threshold(),
            ai: RetryOptions::ai(),
            tools: RetryOptions::tools(),
            exec: RetryOptions::exec(),
        }
    }
}
