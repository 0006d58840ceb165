use super::{IntentHandler, Reply, Turn};
use crate::errors::ParleyError;
use crate::providers::TextGenerator;
use crate::router::intent::IntentKind;
use crate::session::{ChatMessage, MessageRole};
use crate::tools::base::CallerContext;
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

/// Free-form replies from the AI provider: general chat, lookups with no
/// structured tool, and enhancement or new-system requests.
pub struct AssistantHandler {
    generator: Arc<dyn TextGenerator>,
}

impl AssistantHandler {
    /// `generator` should already be wrapped in
    /// [`ResilientGenerator`](crate::providers::ResilientGenerator).
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl IntentHandler for AssistantHandler {
    async fn handle(&self, turn: &Turn<'_>) -> Result<Reply, ParleyError> {
        let prompt = build_prompt(turn.history, turn.message);
        let instruction = system_instruction(turn.caller, turn.intent.intent, turn.arabic);
        let text = self.generator.generate(&prompt, Some(&instruction)).await?;
        Ok(Reply::text(text.trim()))
    }

    fn name(&self) -> &str {
        "assistant"
    }
}

/// Prior turns as `User:`/`Assistant:` lines, then the current message and
/// an open `Assistant:` line. System messages are not replayed.
pub fn build_prompt(history: &[ChatMessage], message: &str) -> String {
    let mut prompt = String::new();
    for m in history {
        let speaker = match m.role {
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
            MessageRole::System => continue,
        };
        let _ = writeln!(prompt, "{}: {}", speaker, m.content);
    }
    let _ = write!(prompt, "User: {}\nAssistant:", message);
    prompt
}

pub fn system_instruction(caller: &CallerContext, intent: IntentKind, arabic: bool) -> String {
    let mut instruction = format!(
        "You are Parley, the assistant of an HR management system. You are talking with {} (role: {}). Keep replies short and practical.",
        caller.display_name, caller.role
    );
    match intent {
        IntentKind::Enhancement | IntentKind::Creation => instruction.push_str(
            " The user is asking for a change to the system itself. Describe the change as a short plan of fields, screens and rules, and do not write code.",
        ),
        IntentKind::Query => instruction.push_str(
            " Answer from the conversation so far and say plainly when you do not have the data.",
        ),
        _ => {}
    }
    instruction.push_str(if arabic {
        " Reply in Arabic."
    } else {
        " Reply in the language of the user's message."
    });
    instruction
}
