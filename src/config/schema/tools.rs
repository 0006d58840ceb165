use crate::router::permissions::Role;
use serde::{Deserialize, Serialize};

fn default_tool_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Upper bound on a single tool handler invocation, in seconds.
    #[serde(default = "default_tool_timeout", rename = "timeoutSecs")]
    pub timeout_secs: u64,
    /// JSON catalog replacing the built-in one.
    #[serde(default, rename = "catalogPath")]
    pub catalog_path: Option<String>,
    /// HTTP endpoint that executes business tools.
    #[serde(default, rename = "backendUrl")]
    pub backend_url: Option<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_tool_timeout(),
            catalog_path: None,
            backend_url: None,
        }
    }
}

/// Static caller directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerConfig {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    pub role: Role,
    #[serde(default, rename = "displayName")]
    pub display_name: String,
}
