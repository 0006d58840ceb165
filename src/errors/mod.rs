use thiserror::Error;

/// Typed error hierarchy for parley.
///
/// Used at module boundaries (provider calls, tool dispatch, command execution,
/// config validation, sessions). Internal/leaf functions keep using
/// `anyhow::Result`; the `Internal` variant converts via the `?` operator.
#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {message}")]
    Provider { message: String, retryable: bool },

    #[error("Rate limit exceeded")]
    RateLimit { retry_after: Option<u64> },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("'{dependency}' timed out after {after_ms}ms")]
    Timeout { dependency: String, after_ms: u64 },

    #[error("Circuit open for '{dependency}'")]
    CircuitOpen { dependency: String },

    #[error("Command '{command}' failed: {message}")]
    Exec { command: String, message: String },

    #[error("Session error: {0}")]
    Session(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ParleyError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::RateLimit { .. }
            | Self::Timeout { .. }
            | Self::Tool { .. }
            | Self::Session(_)
            | Self::Internal(_) => true,
            Self::Auth(_)
            | Self::Config(_)
            | Self::Validation(_)
            | Self::CircuitOpen { .. }
            | Self::Exec { .. } => false,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Provider { .. } => "provider",
            Self::RateLimit { .. } => "rate_limit",
            Self::Auth(_) => "auth",
            Self::Validation(_) => "validation",
            Self::Tool { .. } => "tool",
            Self::Timeout { .. } => "timeout",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Exec { .. } => "exec",
            Self::Session(_) => "session",
            Self::Internal(_) => "internal",
        }
    }
}
