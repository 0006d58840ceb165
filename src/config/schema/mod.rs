use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Generates a `Debug` impl that redacts secret fields.
///
/// Field specifiers:
/// - `field_name`            : printed normally via `&self.field_name`
/// - `redact(field_name)`    : `String` field: shows `[empty]` or `[REDACTED]`
macro_rules! redact_debug {
    // Internal: emit a single .field() call
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    // Internal: recursive TT muncher
    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    // Entry point
    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

// Submodules are declared after the macro so they can use `redact_debug!`
mod executor;
mod providers;
mod resilience;
mod safety;
mod session;
mod tools;

pub use executor::*;
pub use providers::*;
pub use resilience::*;
pub use safety::*;
pub use session::*;
pub use tools::*;

use crate::errors::ParleyError;

const SHELL_METACHARACTERS: &[char] = &[
    ';', '&', '|', '$', '`', '>', '<', '(', ')', '{', '}', '*', '?', '!', '~', '\'', '"', '\\',
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sanitizer: SanitizerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub resilience: ResilienceConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub callers: Vec<CallerConfig>,
}

impl Config {
    /// Resolved SQLite path, or `None` when the in-memory store is selected.
    pub fn session_database_path(&self) -> anyhow::Result<Option<PathBuf>> {
        if self.session.is_in_memory() {
            return Ok(None);
        }
        match self.session.database_path.as_deref() {
            Some(path) => Ok(Some(crate::utils::expand_home(path))),
            None => Ok(Some(crate::utils::get_parley_home()?.join("sessions.db"))),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ParleyError> {
        self.validate_sanitizer()?;
        self.validate_permissions()?;
        self.validate_resilience()?;
        self.validate_session()?;
        self.validate_executor()?;
        self.validate_tools()?;
        Ok(())
    }

    fn validate_sanitizer(&self) -> Result<(), ParleyError> {
        if self.sanitizer.max_length == 0 {
            return Err(ParleyError::Config(
                "sanitizer.maxLength must be > 0".into(),
            ));
        }
        let t = self.classifier.confidence_threshold;
        if t.is_nan() || t <= 0.0 || t > 1.0 {
            return Err(ParleyError::Config(
                "classifier.confidenceThreshold must be in (0.0, 1.0]".into(),
            ));
        }
        Ok(())
    }

    fn validate_permissions(&self) -> Result<(), ParleyError> {
        if self.permissions.super_role.trim().is_empty() {
            return Err(ParleyError::Config(
                "permissions.superRole must not be empty".into(),
            ));
        }
        Ok(())
    }

    fn validate_resilience(&self) -> Result<(), ParleyError> {
        let r = &self.resilience;
        if r.failure_threshold == 0 {
            return Err(ParleyError::Config(
                "resilience.failureThreshold must be > 0".into(),
            ));
        }
        if r.success_threshold == 0 {
            return Err(ParleyError::Config(
                "resilience.successThreshold must be > 0".into(),
            ));
        }
        if r.recovery_timeout_ms == 0 {
            warn!("resilience.recoveryTimeoutMs is 0, open circuits will probe immediately");
        }
        for (class, opts) in [("ai", &r.ai), ("tools", &r.tools), ("exec", &r.exec)] {
            if opts.max_delay_ms < opts.base_delay_ms {
                return Err(ParleyError::Config(format!(
                    "resilience.{class}.maxDelayMs must be >= baseDelayMs"
                )));
            }
            if opts.max_retries > 10 {
                warn!("resilience.{class}.maxRetries is very large (> 10)");
            }
        }
        if r.ai.timeout_ms == 0 {
            return Err(ParleyError::Config(
                "resilience.ai.timeoutMs must be > 0".into(),
            ));
        }
        if r.tools.timeout_ms == 0 {
            return Err(ParleyError::Config(
                "resilience.tools.timeoutMs must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn validate_session(&self) -> Result<(), ParleyError> {
        let s = &self.session;
        if s.max_messages == 0 {
            return Err(ParleyError::Config(
                "session.maxMessages must be > 0".into(),
            ));
        }
        if s.max_cached_sessions == 0 {
            return Err(ParleyError::Config(
                "session.maxCachedSessions must be > 0".into(),
            ));
        }
        if s.ttl_hours == 0 {
            return Err(ParleyError::Config("session.ttlHours must be > 0".into()));
        }
        if s.prompt_history > s.max_messages {
            warn!(
                "session.promptHistory ({}) exceeds session.maxMessages ({})",
                s.prompt_history, s.max_messages
            );
        }
        Ok(())
    }

    fn validate_executor(&self) -> Result<(), ParleyError> {
        let mut seen = std::collections::HashSet::new();
        for cmd in &self.executor.commands {
            if cmd.name.trim().is_empty() {
                return Err(ParleyError::Config(
                    "executor.commands[].name must not be empty".into(),
                ));
            }
            if !seen.insert(cmd.name.as_str()) {
                return Err(ParleyError::Config(format!(
                    "executor.commands contains duplicate name '{}'",
                    cmd.name
                )));
            }
            if cmd.executable.is_empty()
                || cmd
                    .executable
                    .chars()
                    .any(|c| c.is_whitespace() || SHELL_METACHARACTERS.contains(&c))
            {
                return Err(ParleyError::Config(format!(
                    "executor.commands.{}.executable must be a bare program name or path",
                    cmd.name
                )));
            }
            if cmd.timeout_ms == 0 {
                return Err(ParleyError::Config(format!(
                    "executor.commands.{}.timeoutMs must be > 0",
                    cmd.name
                )));
            }
            if let Some(dir) = &cmd.working_dir {
                let path = std::path::Path::new(dir);
                if !path.is_absolute() {
                    return Err(ParleyError::Config(format!(
                        "executor.commands.{}.workingDir must be absolute",
                        cmd.name
                    )));
                }
                if !self.executor.allowed_roots.is_empty()
                    && !crate::safety::sanitizer::validate_file_path(
                        path,
                        &self.executor.allowed_roots,
                    )
                {
                    return Err(ParleyError::Config(format!(
                        "executor.commands.{}.workingDir is outside executor.allowedRoots",
                        cmd.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_tools(&self) -> Result<(), ParleyError> {
        if self.tools.timeout_secs == 0 {
            return Err(ParleyError::Config("tools.timeoutSecs must be > 0".into()));
        }
        if self.tools.timeout_secs > 3600 {
            warn!("tools.timeoutSecs is very long (> 3600s)");
        }
        if let Some(url) = &self.tools.backend_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ParleyError::Config(
                "tools.backendUrl must be an http(s) URL".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for caller in &self.callers {
            if caller.user_id.is_empty() || caller.tenant_id.is_empty() {
                return Err(ParleyError::Config(
                    "callers[].userId and callers[].tenantId must not be empty".into(),
                ));
            }
            if !seen.insert((caller.user_id.as_str(), caller.tenant_id.as_str())) {
                return Err(ParleyError::Config(format!(
                    "callers contains duplicate entry for {}@{}",
                    caller.user_id, caller.tenant_id
                )));
            }
        }
        Ok(())
    }
}
