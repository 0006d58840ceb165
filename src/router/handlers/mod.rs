mod assistant;
mod executive;
pub mod suggestions;
mod tool_route;

pub use assistant::AssistantHandler;
pub use executive::ExecutiveHandler;
pub use tool_route::{ToolRouteHandler, tool_for};

use crate::errors::ParleyError;
use crate::router::intent::{IntentKind, IntentResult};
use crate::session::ChatMessage;
use crate::tools::base::CallerContext;
use crate::tools::registry::INSUFFICIENT_PRIVILEGE;
use async_trait::async_trait;
use std::sync::Arc;

/// Everything a handler may look at for one request. Authorization has
/// already happened by the time a handler sees a turn.
pub struct Turn<'a> {
    pub caller: &'a CallerContext,
    pub intent: &'a IntentResult,
    pub message: &'a str,
    /// Recent history, oldest first, not including `message`.
    pub history: &'a [ChatMessage],
    pub arabic: bool,
}

/// How a request ended, used as the `outcome` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Clarification,
    Denied,
    Rejected,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Clarification => "clarification",
            Self::Denied => "denied",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub response: String,
    pub suggestions: Vec<String>,
    pub outcome: Outcome,
}

impl Reply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            suggestions: Vec::new(),
            outcome: Outcome::Completed,
        }
    }

    pub fn clarify(prompt: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            response: prompt.into(),
            suggestions,
            outcome: Outcome::Clarification,
        }
    }

    /// The fixed denial. Never says which rule failed.
    pub fn denied() -> Self {
        Self {
            response: INSUFFICIENT_PRIVILEGE.to_string(),
            suggestions: Vec::new(),
            outcome: Outcome::Denied,
        }
    }

    pub fn rejected(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            suggestions: Vec::new(),
            outcome: Outcome::Rejected,
        }
    }

    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

/// Serves every request classified as one intent. `Err` is a downstream
/// failure; the router turns it into the generic failure reply.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(&self, turn: &Turn<'_>) -> Result<Reply, ParleyError>;

    fn name(&self) -> &str;
}

/// One handler per [`IntentKind`], indexed by [`IntentKind::index`] and
/// resolved once at startup.
pub struct HandlerTable {
    handlers: Vec<Arc<dyn IntentHandler>>,
}

impl HandlerTable {
    pub fn new(
        executive: Arc<dyn IntentHandler>,
        tools: Arc<dyn IntentHandler>,
        assistant: Arc<dyn IntentHandler>,
    ) -> Self {
        let handlers = IntentKind::ALL
            .iter()
            .map(|kind| match kind {
                IntentKind::ExecutiveCommand | IntentKind::SelfHeal => executive.clone(),
                IntentKind::EmployeeAction
                | IntentKind::TaskAction
                | IntentKind::GoalAction
                | IntentKind::PerformanceAction
                | IntentKind::RecognitionAction
                | IntentKind::LeaveAction
                | IntentKind::PayrollAction
                | IntentKind::Report
                | IntentKind::Query => tools.clone(),
                IntentKind::Enhancement | IntentKind::Creation | IntentKind::GeneralChat => {
                    assistant.clone()
                }
            })
            .collect();
        Self { handlers }
    }

    /// Replace the handler for a single intent.
    #[must_use]
    pub fn with_handler(mut self, kind: IntentKind, handler: Arc<dyn IntentHandler>) -> Self {
        self.handlers[kind.index()] = handler;
        self
    }

    pub fn get(&self, kind: IntentKind) -> &Arc<dyn IntentHandler> {
        &self.handlers[kind.index()]
    }
}
