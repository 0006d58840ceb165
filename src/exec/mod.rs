use crate::config::{CommandSpec, ExecutorConfig, RetryOptions};
use crate::errors::ParleyError;
use crate::resilience::RetryExecutor;
use crate::router::permissions::{PermissionGate, Role};
use crate::safety::sanitizer::validate_file_path;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Captured output is cut at this many bytes per stream.
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Allowlisted commands run, in order, by a deploy.
pub const DEPLOY_SEQUENCE: [&str; 3] = ["git_pull", "build_backend", "restart_backend"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "exitCode")]
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// First non-empty stream, trimmed to `max_chars` for chat replies.
    pub fn summary(&self, max_chars: usize) -> String {
        let text = if self.stdout.trim().is_empty() {
            self.stderr.trim()
        } else {
            self.stdout.trim()
        };
        if text.is_empty() {
            return "(no output)".to_string();
        }
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => format!("{}…", &text[..idx]),
            None => text.to_string(),
        }
    }
}

/// One step of a multi-command sequence.
#[derive(Debug)]
pub struct StepResult {
    pub command: String,
    pub outcome: Result<CommandOutput, ParleyError>,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        matches!(&self.outcome, Ok(output) if output.success)
    }
}

/// Runs a fixed allowlist of external commands. Only the allowlisted name
/// selects a command line; nothing from a chat message reaches the program
/// or its arguments.
pub struct CommandExecutor {
    commands: Vec<CommandSpec>,
    index: HashMap<String, usize>,
    allowed_roots: Vec<String>,
    gate: Arc<PermissionGate>,
    retry: RetryExecutor,
    options: RetryOptions,
}

impl CommandExecutor {
    pub fn new(
        config: &ExecutorConfig,
        gate: Arc<PermissionGate>,
        retry: RetryExecutor,
        options: RetryOptions,
    ) -> Self {
        let mut commands = Vec::new();
        let mut index = HashMap::new();
        for spec in &config.commands {
            if index.contains_key(&spec.name) {
                warn!("ignoring duplicate command '{}'", spec.name);
                continue;
            }
            index.insert(spec.name.clone(), commands.len());
            commands.push(spec.clone());
        }
        Self {
            commands,
            index,
            allowed_roots: config.allowed_roots.clone(),
            gate,
            retry,
            options,
        }
    }

    pub fn is_command_allowed(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.index.get(name).map(|&i| &self.commands[i])
    }

    /// Commands `role` may run, in configuration order.
    pub fn available_commands(&self, role: &Role) -> Vec<&CommandSpec> {
        self.commands
            .iter()
            .filter(|spec| self.gate.can_see(&spec.allowed_roles, role))
            .collect()
    }

    /// Run one allowlisted command on behalf of `role`. A non-zero exit is
    /// an `Ok` output with `success: false`; policy violations, spawn errors
    /// and timeouts are errors.
    pub async fn execute(&self, name: &str, role: &Role) -> Result<CommandOutput, ParleyError> {
        let spec = self.command(name).ok_or_else(|| {
            warn!("rejected command '{}': not in the allowlist", name);
            ParleyError::Exec {
                command: name.to_string(),
                message: "not in the allowlist".into(),
            }
        })?;

        let what = format!("command:{}", name);
        if !self.gate.allows_role(&spec.allowed_roles, role, &what) {
            warn!("role {} denied command '{}'", role, name);
            metrics::counter!("parley_permission_denied_total").increment(1);
            return Err(ParleyError::Auth(format!(
                "role {} may not run '{}'",
                role, name
            )));
        }

        if let Some(dir) = &spec.working_dir
            && !self.allowed_roots.is_empty()
            && !validate_file_path(dir, &self.allowed_roots)
        {
            warn!("command '{}' working directory is outside allowed roots", name);
            return Err(ParleyError::Exec {
                command: name.to_string(),
                message: "working directory is outside the allowed roots".into(),
            });
        }

        // The command's own limit governs, capped by `resilience.exec.timeoutMs`
        let mut options = self.options.clone();
        let timeout_ms = match options.timeout_ms {
            0 => spec.timeout_ms,
            cap => spec.timeout_ms.min(cap),
        };
        options.timeout_ms = 0;
        self.retry
            .execute(&format!("exec:{}", name), &options, || run(spec, timeout_ms))
            .await
    }

    /// Run `names` in order, stopping after the first step that fails.
    pub async fn run_sequence(&self, names: &[&str], role: &Role) -> Vec<StepResult> {
        let mut steps = Vec::with_capacity(names.len());
        for name in names {
            let outcome = self.execute(name, role).await;
            let step = StepResult {
                command: (*name).to_string(),
                outcome,
            };
            let stop = !step.succeeded();
            steps.push(step);
            if stop {
                break;
            }
        }
        steps
    }
}

async fn run(spec: &CommandSpec, timeout_ms: u64) -> Result<CommandOutput, ParleyError> {
    let mut cmd = crate::utils::subprocess::scrubbed_command(&spec.executable);
    cmd.args(&spec.args);
    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }

    let timeout = Duration::from_millis(timeout_ms);
    let started = Instant::now();
    info!("running command '{}'", spec.name);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            let result = CommandOutput {
                success: output.status.success(),
                stdout: capture(&output.stdout),
                stderr: capture(&output.stderr),
                exit_code: output.status.code(),
            };
            info!(
                "command '{}' exited with {:?} in {}ms",
                spec.name,
                result.exit_code,
                started.elapsed().as_millis()
            );
            Ok(result)
        }
        Ok(Err(e)) => Err(ParleyError::Exec {
            command: spec.name.clone(),
            message: format!("failed to start: {}", e),
        }),
        // Dropping the output future kills the child
        Err(_) => {
            warn!(
                "command '{}' killed after {}ms timeout",
                spec.name, timeout_ms
            );
            Err(ParleyError::Timeout {
                dependency: format!("exec:{}", spec.name),
                after_ms: timeout_ms,
            })
        }
    }
}

fn capture(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() > MAX_OUTPUT_BYTES {
        format!(
            "{}\n[output truncated]",
            crate::utils::truncate_at_char_boundary(&text, MAX_OUTPUT_BYTES)
        )
    } else {
        text.into_owned()
    }
}
