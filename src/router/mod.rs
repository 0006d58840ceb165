pub mod directory;
pub mod handlers;
pub mod intent;
pub mod permissions;

use crate::config::Config;
use crate::errors::ParleyError;
use crate::exec::CommandExecutor;
use crate::providers::{ResilientGenerator, TextGenerator, create_provider};
use crate::resilience::{BreakerSettings, CircuitRegistry, RetryExecutor};
use crate::safety::{BlockReason, Sanitizer};
use crate::session::{
    ChatMessage, ConversationStore, MemorySessionStore, SessionStore, SqliteSessionStore,
};
use crate::tools::{ToolHandler, ToolRegistry};
use anyhow::Result;
use directory::{CallerDirectory, StaticDirectory};
use futures_util::FutureExt;
use handlers::{
    AssistantHandler, ExecutiveHandler, HandlerTable, IntentHandler, Outcome, Reply,
    ToolRouteHandler, Turn, suggestions,
};
use intent::{IntentClassifier, clarification_suggestions, contains_arabic};
use permissions::PermissionGate;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub use directory::Caller;

const GENERIC_FAILURE: &str = "Sorry, I couldn't complete that request right now. Please try again later.";
const UNEXPECTED_ERROR: &str = "Sorry, an unexpected error occurred.";
const REFUSAL: &str = "Sorry, I can't process that message.";
const EMPTY_MESSAGE: &str = "Please type a message.";
const TOO_LONG: &str = "That message is too long. Please shorten it and try again.";

/// What `chat` always returns, whatever happened inside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "processingTimeMs")]
    pub processing_time_ms: u64,
}

/// Sanitize, classify, authorize, dispatch and record one chat message.
///
/// Constructed once per process through [`ChatRouterBuilder`]; every
/// collaborator is injected, and all shared state (circuits, session cache)
/// lives behind the components that own it.
pub struct ChatRouter {
    sanitizer: Sanitizer,
    classifier: IntentClassifier,
    gate: Arc<PermissionGate>,
    directory: Arc<dyn CallerDirectory>,
    handlers: HandlerTable,
    sessions: Arc<ConversationStore>,
    registry: Arc<ToolRegistry>,
    executor: Arc<CommandExecutor>,
    retry: RetryExecutor,
    prompt_history: usize,
}

impl ChatRouter {
    pub fn builder(config: &Config) -> ChatRouterBuilder<'_> {
        ChatRouterBuilder::new(config)
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn gate(&self) -> &Arc<PermissionGate> {
        &self.gate
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    pub fn sessions(&self) -> &Arc<ConversationStore> {
        &self.sessions
    }

    /// Read-only view of circuit state.
    pub fn circuits(&self) -> &Arc<CircuitRegistry> {
        self.retry.circuits()
    }

    /// Handle one message. Never fails and never panics outward: internal
    /// errors become a generic reply carrying the request id.
    pub async fn chat(&self, user_id: &str, tenant_id: &str, raw: &str) -> ChatResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        let result = AssertUnwindSafe(self.process(&request_id, user_id, tenant_id, raw))
            .catch_unwind()
            .await;

        let (response, suggestions, outcome) = match result {
            Ok(Ok(reply)) => (reply.response, reply.suggestions, reply.outcome.as_str()),
            Ok(Err(e)) => {
                error!("[{}] request failed ({}): {}", request_id, e.kind(), e);
                (with_reference(GENERIC_FAILURE, &request_id), Vec::new(), "failed")
            }
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| panic.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown cause");
                error!("[{}] request panicked: {}", request_id, msg);
                (with_reference(UNEXPECTED_ERROR, &request_id), Vec::new(), "panicked")
            }
        };
        metrics::counter!("parley_requests_total", "outcome" => outcome).increment(1);

        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            "[{}] {}@{} handled in {}ms ({})",
            request_id, user_id, tenant_id, processing_time_ms, outcome
        );
        ChatResponse {
            response,
            suggestions,
            request_id,
            processing_time_ms,
        }
    }

    async fn process(
        &self,
        request_id: &str,
        user_id: &str,
        tenant_id: &str,
        raw: &str,
    ) -> Result<Reply, ParleyError> {
        let sanitized = self.sanitizer.sanitize(raw);
        if !sanitized.safe {
            warn!(
                "[{}] message from {}@{} refused: {}",
                request_id,
                user_id,
                tenant_id,
                sanitized.blocked.map_or_else(|| "unsafe".to_string(), |r| r.to_string())
            );
            return Ok(Reply::rejected(match sanitized.blocked {
                Some(BlockReason::Empty) => EMPTY_MESSAGE,
                _ => REFUSAL,
            }));
        }
        for warning in &sanitized.warnings {
            debug!("[{}] sanitizer: {}", request_id, warning);
        }
        let text = sanitized.sanitized;
        if !self.sanitizer.is_valid_request(&text) {
            return Ok(Reply::rejected(if text.trim().is_empty() {
                EMPTY_MESSAGE
            } else {
                TOO_LONG
            }));
        }

        let caller = self
            .directory
            .resolve(user_id, tenant_id)
            .await?
            .ok_or_else(|| {
                ParleyError::Auth(format!("unknown caller {}@{}", user_id, tenant_id))
            })?;
        let context = caller.context(request_id);

        let intent = self.classifier.classify(&text);
        let arabic = contains_arabic(&text);
        debug!(
            "[{}] {}/{} confidence {:.2}",
            request_id,
            intent.intent,
            intent.sub_intent.unwrap_or("-"),
            intent.confidence
        );

        let reply = if intent.requires_clarification {
            Reply::clarify(
                intent.clarification_prompt.clone().unwrap_or_default(),
                clarification_suggestions(intent.intent, arabic),
            )
        } else if !self
            .gate
            .authorize(intent.intent, intent.sub_intent, &caller.role)
        {
            warn!(
                "[{}] denied {}/{} for role {}",
                request_id,
                intent.intent,
                intent.sub_intent.unwrap_or("-"),
                caller.role
            );
            metrics::counter!("parley_permission_denied_total").increment(1);
            Reply::denied()
        } else {
            let history = match self
                .sessions
                .get_history(user_id, tenant_id, Some(self.prompt_history))
                .await
            {
                Ok(history) => history,
                Err(e) => {
                    warn!("[{}] history unavailable: {}", request_id, e);
                    Vec::new()
                }
            };
            let handler = self.handlers.get(intent.intent);
            let turn = Turn {
                caller: &context,
                intent: &intent,
                message: &text,
                history: &history,
                arabic,
            };
            let reply = handler.handle(&turn).await?;
            debug!("[{}] handled by {}", request_id, handler.name());
            reply
        };

        let reply = if reply.suggestions.is_empty() && reply.outcome != Outcome::Denied {
            let offered = suggestions::contextual(&self.gate, &caller.role, intent.intent, arabic);
            reply.with_suggestions(offered)
        } else {
            reply
        };

        if let Err(e) = self
            .sessions
            .add_messages(
                user_id,
                tenant_id,
                vec![
                    ChatMessage::user(text.as_str()),
                    ChatMessage::assistant(reply.response.as_str()),
                ],
            )
            .await
        {
            warn!("[{}] failed to record exchange: {}", request_id, e);
        }
        Ok(reply)
    }

    /// The most recent messages for the pair, oldest first.
    pub async fn get_history(
        &self,
        user_id: &str,
        tenant_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChatMessage>, ParleyError> {
        self.sessions.get_history(user_id, tenant_id, limit).await
    }

    pub async fn clear_history(&self, user_id: &str, tenant_id: &str) -> Result<(), ParleyError> {
        self.sessions.clear_history(user_id, tenant_id).await
    }
}

fn with_reference(message: &str, request_id: &str) -> String {
    format!("{} (ref: {})", message, request_id)
}

/// Wires a [`ChatRouter`] from configuration. Any collaborator left unset
/// is built from `config`.
pub struct ChatRouterBuilder<'a> {
    config: &'a Config,
    provider: Option<Arc<dyn TextGenerator>>,
    directory: Option<Arc<dyn CallerDirectory>>,
    session_store: Option<Arc<dyn SessionStore>>,
    tool_handler: Option<Arc<dyn ToolHandler>>,
}

impl<'a> ChatRouterBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            provider: None,
            directory: None,
            session_store: None,
            tool_handler: None,
        }
    }

    /// Raw AI provider; the builder adds retry and circuit breaking.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn TextGenerator>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn directory(mut self, directory: Arc<dyn CallerDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Handler bound to every catalog tool.
    #[must_use]
    pub fn tool_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.tool_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<ChatRouter> {
        let config = self.config;
        let gate = Arc::new(PermissionGate::new(&config.permissions));
        let circuits = Arc::new(CircuitRegistry::new(BreakerSettings::from(
            &config.resilience,
        )));
        let retry = RetryExecutor::new(circuits);

        let provider = self
            .provider
            .unwrap_or_else(|| create_provider(&config.provider));
        let generator: Arc<dyn TextGenerator> = Arc::new(ResilientGenerator::new(
            provider,
            retry.clone(),
            config.resilience.ai.clone(),
        ));

        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(StaticDirectory::from_config(&config.callers)));

        let store: Arc<dyn SessionStore> = match self.session_store {
            Some(store) => store,
            None => match config.session_database_path()? {
                Some(path) => Arc::new(SqliteSessionStore::open(&path)?),
                None => Arc::new(MemorySessionStore::new()),
            },
        };

        let tool_handler = self
            .tool_handler
            .unwrap_or_else(|| crate::tools::default_handler(&config.tools));
        let registry = Arc::new(crate::tools::build_registry(
            config,
            gate.clone(),
            retry.clone(),
            &tool_handler,
        )?);
        let executor = Arc::new(CommandExecutor::new(
            &config.executor,
            gate.clone(),
            retry.clone(),
            config.resilience.exec.clone(),
        ));

        let assistant: Arc<dyn IntentHandler> = Arc::new(AssistantHandler::new(generator));
        let handlers = HandlerTable::new(
            Arc::new(ExecutiveHandler::new(executor.clone())),
            Arc::new(ToolRouteHandler::new(registry.clone(), assistant.clone())),
            assistant,
        );

        info!(
            "router ready: {} tools, {} commands",
            registry.len(),
            config.executor.commands.len()
        );
        Ok(ChatRouter {
            sanitizer: Sanitizer::new(&config.sanitizer),
            classifier: IntentClassifier::new(&config.classifier),
            gate,
            directory,
            handlers,
            sessions: Arc::new(ConversationStore::new(store, &config.session)),
            registry,
            executor,
            retry,
            prompt_history: config.session.prompt_history,
        })
    }
}
