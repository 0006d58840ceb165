use crate::router::permissions::Role;
use serde::{Deserialize, Serialize};

fn default_command_timeout_ms() -> u64 {
    30_000
}

/// One allowlisted external command. The argument vector is fixed; nothing
/// from a chat message is ever appended to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub executable: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, rename = "workingDir")]
    pub working_dir: Option<String>,
    #[serde(default = "default_command_timeout_ms", rename = "timeoutMs")]
    pub timeout_ms: u64,
    #[serde(default = "default_allowed_roles", rename = "allowedRoles")]
    pub allowed_roles: Vec<Role>,
}

fn default_allowed_roles() -> Vec<Role> {
    vec![Role::Admin]
}

fn command(
    name: &str,
    description: &str,
    executable: &str,
    args: &[&str],
    timeout_ms: u64,
) -> CommandSpec {
    CommandSpec {
        name: name.to_string(),
        description: description.to_string(),
        executable: executable.to_string(),
        args: args.iter().map(|a| (*a).to_string()).collect(),
        working_dir: None,
        timeout_ms,
        allowed_roles: default_allowed_roles(),
    }
}

fn default_commands() -> Vec<CommandSpec> {
    vec![
        command(
            "restart_backend",
            "Restart the backend process",
            "pm2",
            &["restart", "backend"],
            30_000,
        ),
        command(
            "system_status",
            "Show uptime and load",
            "uptime",
            &[],
            10_000,
        ),
        command(
            "view_logs",
            "Show the last 50 backend log lines",
            "pm2",
            &["logs", "backend", "--lines", "50", "--nostream"],
            15_000,
        ),
        command(
            "git_status",
            "Show working tree status",
            "git",
            &["status", "--short", "--branch"],
            10_000,
        ),
        command(
            "git_log",
            "Show the last ten commits",
            "git",
            &["log", "--oneline", "-10"],
            10_000,
        ),
        command(
            "git_pull",
            "Fast-forward to the remote branch",
            "git",
            &["pull", "--ff-only"],
            60_000,
        ),
        command(
            "build_backend",
            "Build the backend",
            "npm",
            &["run", "build"],
            300_000,
        ),
        command(
            "disk_usage",
            "Show filesystem usage",
            "df",
            &["-h"],
            10_000,
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Directories a command's `workingDir` (and any file-touching tool) must stay inside.
    #[serde(default, rename = "allowedRoots")]
    pub allowed_roots: Vec<String>,
    #[serde(default = "default_commands")]
    pub commands: Vec<CommandSpec>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            allowed_roots: Vec::new(),
            commands: default_commands(),
        }
    }
}
