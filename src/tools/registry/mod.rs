use crate::config::RetryOptions;
use crate::errors::ParleyError;
use crate::resilience::RetryExecutor;
use crate::router::permissions::{PermissionGate, Role};
use crate::tools::base::{CallerContext, ToolDefinition, ToolErrorKind, ToolHandler, ToolResult};
use crate::tools::params::{self, ParamErrors};
use anyhow::{Result, bail};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Fixed denial shown to callers; never names the rule that failed.
pub const INSUFFICIENT_PRIVILEGE: &str = "You don't have permission to perform this action.";
const GENERIC_FAILURE: &str = "The operation could not be completed. Please try again later.";
const TIMEOUT_FAILURE: &str = "The operation took too long and was cancelled. Please try again.";

/// Why a dispatch did not produce a handler result.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Insufficient privilege for tool '{0}'")]
    Forbidden(String),

    #[error("Invalid parameters for '{tool}': {}", .errors.problems.join("; "))]
    InvalidParams { tool: String, errors: ParamErrors },

    #[error("Tool '{tool}' timed out after {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("Tool '{tool}' failed: {source}")]
    Handler {
        tool: String,
        #[source]
        source: ParleyError,
    },
}

impl DispatchError {
    fn outcome(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidParams { .. } => "invalid_params",
            Self::Timeout { .. } => "timeout",
            Self::Handler { .. } => "failed",
        }
    }

    /// The stable, caller-safe `ToolResult` for this failure.
    pub fn to_tool_result(&self) -> ToolResult {
        match self {
            Self::UnknownTool(name) => {
                ToolResult::failure(ToolErrorKind::UnknownTool, format!("Unknown tool: {}", name))
            }
            Self::Forbidden(_) => {
                ToolResult::failure(ToolErrorKind::Forbidden, INSUFFICIENT_PRIVILEGE)
            }
            Self::InvalidParams { errors, .. } => ToolResult::failure(
                ToolErrorKind::InvalidParams,
                format!("Invalid parameters: {}", errors.problems.join("; ")),
            )
            .with_data(json!({
                "missing": errors.missing,
                "problems": errors.problems,
            })),
            Self::Timeout { .. } => ToolResult::failure(ToolErrorKind::Timeout, TIMEOUT_FAILURE),
            Self::Handler { .. } => {
                ToolResult::failure(ToolErrorKind::HandlerFailed, GENERIC_FAILURE)
            }
        }
    }
}

impl From<DispatchError> for ParleyError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownTool(_) | DispatchError::InvalidParams { .. } => {
                Self::Validation(err.to_string())
            }
            DispatchError::Forbidden(_) => Self::Auth(err.to_string()),
            DispatchError::Timeout { tool, after } => Self::Timeout {
                dependency: format!("tool:{}", tool),
                after_ms: after.as_millis() as u64,
            },
            DispatchError::Handler { source, .. } => source,
        }
    }
}

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

/// Catalog of named operations with O(1) dispatch by name.
///
/// Dispatch order: look up the definition, check the caller's role against
/// `requiredRoles` through the permission gate, validate and coerce the
/// parameters, then invoke the handler through the retry executor. Each
/// attempt runs in its own task so a panicking handler cannot take the router
/// down, and each attempt is bounded by `tools.timeoutSecs`.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    gate: Arc<PermissionGate>,
    retry: RetryExecutor,
    options: RetryOptions,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new(
        gate: Arc<PermissionGate>,
        retry: RetryExecutor,
        options: RetryOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            tools: HashMap::new(),
            gate,
            retry,
            options,
            timeout,
        }
    }

    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        let name = definition.name.as_str();
        if name.is_empty() || name.len() > 128 || name.chars().any(|c| c.is_control() || c.is_whitespace())
        {
            bail!("invalid tool name {:?}", name);
        }
        if self.tools.contains_key(name) {
            bail!("duplicate tool '{}'", name);
        }
        self.tools.insert(
            name.to_string(),
            RegisteredTool {
                definition,
                handler,
            },
        );
        Ok(())
    }

    /// Register every definition against the same handler.
    pub fn register_all(
        &mut self,
        definitions: Vec<ToolDefinition>,
        handler: &Arc<dyn ToolHandler>,
    ) -> Result<()> {
        for definition in definitions {
            self.register(definition, handler.clone())?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|t| &t.definition)
    }

    /// Sorted list of all registered tool names.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Definitions the given role may call, sorted by name.
    pub fn definitions_for(&self, role: &Role) -> Vec<&ToolDefinition> {
        let mut defs: Vec<&ToolDefinition> = self
            .tools
            .values()
            .map(|t| &t.definition)
            .filter(|d| self.gate.can_see(&d.required_roles, role))
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Dispatch and always return a well-formed result. Failures carry a
    /// stable message; internal error text is only logged.
    pub async fn dispatch(&self, name: &str, params: Value, caller: &CallerContext) -> ToolResult {
        match self.try_dispatch(name, params, caller).await {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    DispatchError::Handler { .. } | DispatchError::Timeout { .. } => error!(
                        "[{}] tool dispatch failed: {}",
                        caller.request_id, e
                    ),
                    _ => warn!("[{}] tool dispatch rejected: {}", caller.request_id, e),
                }
                e.to_tool_result()
            }
        }
    }

    pub async fn try_dispatch(
        &self,
        name: &str,
        params: Value,
        caller: &CallerContext,
    ) -> Result<ToolResult, DispatchError> {
        let started = Instant::now();
        let result = self.dispatch_inner(name, params, caller).await;
        let (tool_label, outcome) = match &result {
            Ok(r) if r.success => (name, "success"),
            Ok(_) => (name, "rejected"),
            Err(DispatchError::UnknownTool(_)) => ("unknown", "unknown_tool"),
            Err(e) => (name, e.outcome()),
        };
        metrics::counter!(
            "parley_tool_dispatch_total",
            "tool" => tool_label.to_string(),
            "outcome" => outcome
        )
        .increment(1);
        debug!(
            "[{}] tool '{}' finished in {}ms ({})",
            caller.request_id,
            name,
            started.elapsed().as_millis(),
            outcome
        );
        result
    }

    async fn dispatch_inner(
        &self,
        name: &str,
        params: Value,
        caller: &CallerContext,
    ) -> Result<ToolResult, DispatchError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let what = format!("tool:{}", name);
        if !self
            .gate
            .allows_role(&tool.definition.required_roles, &caller.role, &what)
        {
            warn!(
                "[{}] role {} denied tool '{}'",
                caller.request_id, caller.role, name
            );
            metrics::counter!("parley_permission_denied_total").increment(1);
            return Err(DispatchError::Forbidden(name.to_string()));
        }

        let params = params::validate(&tool.definition, &params).map_err(|errors| {
            DispatchError::InvalidParams {
                tool: name.to_string(),
                errors,
            }
        })?;

        let handler = tool.handler.clone();
        let timeout = self.timeout;
        let call = self.retry.execute(&what, &self.options, || {
            run_guarded(
                handler.clone(),
                name.to_string(),
                params.clone(),
                caller.clone(),
                timeout,
            )
        });
        match call.await {
            Ok(result) => {
                info!(
                    "[{}] tool '{}' completed (success={})",
                    caller.request_id, name, result.success
                );
                Ok(result)
            }
            Err(ParleyError::Timeout { after_ms, .. }) => Err(DispatchError::Timeout {
                tool: name.to_string(),
                after: Duration::from_millis(after_ms),
            }),
            Err(source) => Err(DispatchError::Handler {
                tool: name.to_string(),
                source,
            }),
        }
    }
}

/// Aborts the spawned handler when the awaiting future is dropped, so a
/// timeout cancels the handler instead of leaving it running.
struct AbortOnDrop(tokio::task::AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// One attempt: the handler runs in its own task, bounded by `timeout`.
async fn run_guarded(
    handler: Arc<dyn ToolHandler>,
    tool: String,
    params: Map<String, Value>,
    caller: CallerContext,
    timeout: Duration,
) -> Result<ToolResult, ParleyError> {
    let task_tool = tool.clone();
    let handle =
        tokio::task::spawn(async move { handler.call(&task_tool, params, &caller).await });
    let _guard = AbortOnDrop(handle.abort_handle());

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) if join_err.is_panic() => {
            let panic_payload = join_err.into_panic();
            let panic_msg = panic_payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| panic_payload.downcast_ref::<&str>().copied())
                .unwrap_or("unknown cause");
            error!("tool '{}' panicked: {}", tool, panic_msg);
            Err(ParleyError::Tool {
                tool,
                message: "handler panicked".to_string(),
            })
        }
        Ok(Err(_)) => Err(ParleyError::Tool {
            tool,
            message: "handler was cancelled".to_string(),
        }),
        Err(_) => {
            warn!("tool '{}' timed out after {}ms", tool, timeout.as_millis());
            Err(ParleyError::Timeout {
                dependency: format!("tool:{}", tool),
                after_ms: timeout.as_millis() as u64,
            })
        }
    }
}
