use super::{IntentHandler, Reply, Turn};
use crate::errors::ParleyError;
use crate::exec::{CommandExecutor, CommandOutput, DEPLOY_SEQUENCE, StepResult};
use crate::router::intent::IntentKind;
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, warn};

/// Characters of command output quoted back into chat.
const SUMMARY_CHARS: usize = 1500;
/// Shorter excerpt used per step of a multi-command reply.
const STEP_SUMMARY_CHARS: usize = 300;

/// Executive commands and self-heal diagnosis, run only through the
/// allowlisted [`CommandExecutor`].
pub struct ExecutiveHandler {
    executor: Arc<CommandExecutor>,
}

impl ExecutiveHandler {
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }

    async fn single(&self, command: &str, label: &str, turn: &Turn<'_>) -> Result<Reply, ParleyError> {
        if !self.executor.is_command_allowed(command) {
            return Ok(not_allowlisted(command));
        }
        match self.executor.execute(command, &turn.caller.role).await {
            Ok(output) => {
                info!(
                    "[{}] {} finished (success={})",
                    turn.caller.request_id, command, output.success
                );
                Ok(Reply::text(describe(label, &output)))
            }
            Err(ParleyError::Auth(_)) => Ok(Reply::denied()),
            Err(e) => Err(e),
        }
    }

    async fn sequence(
        &self,
        commands: &[&str],
        label: &str,
        turn: &Turn<'_>,
    ) -> Result<Reply, ParleyError> {
        if let Some(missing) = commands.iter().find(|c| !self.executor.is_command_allowed(c)) {
            return Ok(not_allowlisted(missing));
        }
        let steps = self.executor.run_sequence(commands, &turn.caller.role).await;
        if steps
            .iter()
            .any(|s| matches!(s.outcome, Err(ParleyError::Auth(_))))
        {
            return Ok(Reply::denied());
        }
        Ok(Reply::text(describe_steps(label, commands, &steps)))
    }
}

#[async_trait]
impl IntentHandler for ExecutiveHandler {
    async fn handle(&self, turn: &Turn<'_>) -> Result<Reply, ParleyError> {
        if turn.intent.intent == IntentKind::SelfHeal {
            return self
                .sequence(&["system_status", "git_status"], "Diagnosis", turn)
                .await;
        }
        match turn.intent.sub_intent.unwrap_or("") {
            "restart" => self.single("restart_backend", "Backend restart", turn).await,
            "status" => self.single("system_status", "System status", turn).await,
            "logs" => self.single("view_logs", "Backend logs", turn).await,
            "git" => {
                let command = match turn.intent.entity("gitCommand") {
                    Some("log") => "git_log",
                    Some("pull") => "git_pull",
                    _ => "git_status",
                };
                self.single(command, "Git", turn).await
            }
            "deploy" => self.sequence(&DEPLOY_SEQUENCE, "Deploy", turn).await,
            "backup" => self.single("backup", "Backup", turn).await,
            other => {
                warn!(
                    "[{}] no executive command for sub-intent {:?}",
                    turn.caller.request_id, other
                );
                Ok(Reply::rejected("That command is not supported."))
            }
        }
    }

    fn name(&self) -> &str {
        "executive"
    }
}

fn not_allowlisted(command: &str) -> Reply {
    Reply::rejected(format!(
        "The '{}' command is not allowlisted on this server.",
        command
    ))
}

fn describe(label: &str, output: &CommandOutput) -> String {
    if output.success {
        format!("{} succeeded.\n{}", label, output.summary(SUMMARY_CHARS))
    } else {
        format!(
            "{} failed (exit code {}).\n{}",
            label,
            exit_code(output),
            output.summary(SUMMARY_CHARS)
        )
    }
}

fn exit_code(output: &CommandOutput) -> String {
    output
        .exit_code
        .map_or_else(|| "none".to_string(), |c| c.to_string())
}

fn describe_steps(label: &str, commands: &[&str], steps: &[StepResult]) -> String {
    let completed = steps.len() == commands.len() && steps.iter().all(StepResult::succeeded);
    let mut text = if completed {
        format!("{} completed.", label)
    } else {
        format!("{} stopped after a failed step.", label)
    };
    for (i, command) in commands.iter().enumerate() {
        let line = match steps.get(i) {
            Some(StepResult {
                outcome: Ok(output),
                ..
            }) if output.success => format!("ok\n   {}", output.summary(STEP_SUMMARY_CHARS)),
            Some(StepResult {
                outcome: Ok(output),
                ..
            }) => format!(
                "failed (exit code {})\n   {}",
                exit_code(output),
                output.summary(STEP_SUMMARY_CHARS)
            ),
            Some(StepResult {
                outcome: Err(ParleyError::Timeout { .. }),
                ..
            }) => "timed out".to_string(),
            Some(StepResult { outcome: Err(_), .. }) => "could not be run".to_string(),
            None => "skipped".to_string(),
        };
        let _ = write!(text, "\n{}. {}: {}", i + 1, command, line);
    }
    text
}
