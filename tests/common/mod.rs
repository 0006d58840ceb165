// Shared test helpers; not all items used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use parley::config::{CallerConfig, CommandSpec, Config, RetryOptions};
use parley::errors::ParleyError;
use parley::providers::TextGenerator;
use parley::router::permissions::Role;
use parley::session::MemorySessionStore;
use parley::tools::{CallerContext, ToolHandler, ToolResult};
use parley::{ChatRouter, ChatRouterBuilder};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RecordedPrompt {
    pub prompt: String,
    pub system_instruction: Option<String>,
}

/// Text generator that replays queued results, then a default reply.
pub struct MockGenerator {
    replies: Mutex<VecDeque<Result<String, ParleyError>>>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<RecordedPrompt>>,
    pub default_reply: String,
    /// 1-based call number that panics instead of answering.
    pub panic_on_call: Option<usize>,
}

impl MockGenerator {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            default_reply: text.to_string(),
            panic_on_call: None,
        })
    }

    pub fn with_replies(replies: Vec<Result<String, ParleyError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from(replies)),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            default_reply: "Mock reply".to_string(),
            panic_on_call: None,
        })
    }

    /// Replays `replies`, panics on call number `call`, then answers `text`.
    pub fn panicking_on(
        call: usize,
        replies: Vec<Result<String, ParleyError>>,
        text: &str,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from(replies)),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            default_reply: text.to_string(),
            panic_on_call: Some(call),
        })
    }

    /// Every call fails with a retryable provider error.
    pub fn always_failing() -> Arc<Self> {
        let replies = (0..64).map(|_| Err(transient("upstream 503"))).collect();
        Self::with_replies(replies)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<RecordedPrompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, ParleyError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on_call == Some(call) {
            panic!("generator crashed on call {}", call);
        }
        self.prompts.lock().unwrap().push(RecordedPrompt {
            prompt: prompt.to_string(),
            system_instruction: system_instruction.map(str::to_string),
        });
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.default_reply.clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn transient(message: &str) -> ParleyError {
    ParleyError::Provider {
        message: message.to_string(),
        retryable: true,
    }
}

#[derive(Debug, Clone)]
pub struct RecordedToolCall {
    pub tool: String,
    pub params: Map<String, Value>,
    pub caller: CallerContext,
}

/// Tool handler that answers "<tool> ok" and records every call.
#[derive(Default)]
pub struct RecordingTools {
    pub calls: Mutex<Vec<RecordedToolCall>>,
}

impl RecordingTools {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn tools_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.tool.clone())
            .collect()
    }
}

#[async_trait]
impl ToolHandler for RecordingTools {
    async fn call(
        &self,
        tool: &str,
        params: Map<String, Value>,
        caller: &CallerContext,
    ) -> Result<ToolResult, ParleyError> {
        self.calls.lock().unwrap().push(RecordedToolCall {
            tool: tool.to_string(),
            params,
            caller: caller.clone(),
        });
        Ok(ToolResult::ok(format!("{} ok", tool)))
    }
}

pub fn caller(user: &str, tenant: &str, role: Role, name: &str) -> CallerConfig {
    CallerConfig {
        user_id: user.to_string(),
        tenant_id: tenant.to_string(),
        role,
        display_name: name.to_string(),
    }
}

pub fn echo_command(name: &str, output: &str, roles: Vec<Role>) -> CommandSpec {
    CommandSpec {
        name: name.to_string(),
        description: format!("echo for {}", name),
        executable: "echo".to_string(),
        args: vec![output.to_string()],
        working_dir: None,
        timeout_ms: 5000,
        allowed_roles: roles,
    }
}

pub fn no_retry(timeout_ms: u64) -> RetryOptions {
    RetryOptions {
        max_retries: 0,
        base_delay_ms: 0,
        max_delay_ms: 0,
        exponential_backoff: false,
        jitter: false,
        timeout_ms,
    }
}

/// Config with an admin, an HR officer and an employee in tenant "acme",
/// echo-backed commands and no retry delays.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.callers = vec![
        caller("admin", "acme", Role::Admin, "Dana"),
        caller("hr", "acme", Role::Hr, "Mona"),
        caller("emp", "acme", Role::Employee, "Sam"),
        caller("emp", "globex", Role::Employee, "Sam at Globex"),
    ];
    config.executor.commands = vec![
        echo_command("restart_backend", "backend restarted", vec![Role::Admin]),
        echo_command("system_status", "load average: 0.10", vec![Role::Admin]),
        echo_command("git_status", "## main...origin/main", vec![Role::Admin]),
        echo_command("git_pull", "Already up to date.", vec![Role::Admin]),
        echo_command("build_backend", "build ok", vec![Role::Admin]),
    ];
    config.resilience.failure_threshold = 3;
    config.resilience.recovery_timeout_ms = 60_000;
    config.resilience.ai = no_retry(2000);
    config.resilience.tools = no_retry(2000);
    config.session.database_path = Some(":memory:".to_string());
    config
}

pub fn builder<'a>(
    config: &'a Config,
    generator: Arc<MockGenerator>,
    tools: Arc<RecordingTools>,
) -> ChatRouterBuilder<'a> {
    ChatRouter::builder(config)
        .provider(generator)
        .tool_handler(tools)
        .session_store(Arc::new(MemorySessionStore::new()))
}

pub fn router(
    config: &Config,
    generator: Arc<MockGenerator>,
    tools: Arc<RecordingTools>,
) -> ChatRouter {
    builder(config, generator, tools).build().unwrap()
}
