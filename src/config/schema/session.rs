use serde::{Deserialize, Serialize};

fn default_max_messages() -> usize {
    50
}

fn default_max_cached_sessions() -> usize {
    1000
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_history_limit() -> usize {
    10
}

fn default_prompt_history() -> usize {
    5
}

/// Sentinel `databasePath` that selects the non-durable in-memory store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_messages", rename = "maxMessages")]
    pub max_messages: usize,
    #[serde(default = "default_max_cached_sessions", rename = "maxCachedSessions")]
    pub max_cached_sessions: usize,
    #[serde(default = "default_ttl_hours", rename = "ttlHours")]
    pub ttl_hours: u64,
    /// Messages returned by `history` when no explicit limit is given.
    #[serde(default = "default_history_limit", rename = "historyLimit")]
    pub history_limit: usize,
    /// Recent messages rendered into AI prompts.
    #[serde(default = "default_prompt_history", rename = "promptHistory")]
    pub prompt_history: usize,
    /// SQLite file; `None` resolves to `$PARLEY_HOME/sessions.db`.
    #[serde(default, rename = "databasePath")]
    pub database_path: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_cached_sessions: default_max_cached_sessions(),
            ttl_hours: default_ttl_hours(),
            history_limit: default_history_limit(),
            prompt_history: default_prompt_history(),
            database_path: None,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_deref() == Some(IN_MEMORY_DATABASE)
    }
}
