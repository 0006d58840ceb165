use crate::config::{CommandSpec, Config};
use crate::exec::CommandExecutor;
use crate::resilience::{BreakerSettings, CircuitRegistry, RetryExecutor};
use crate::router::intent::IntentClassifier;
use crate::router::permissions::{PermissionGate, Role};
use crate::router::{ChatResponse, ChatRouter};
use crate::safety::Sanitizer;
use crate::session::{ChatMessage, SessionStore, SqliteSessionStore};
use crate::tools::{ToolDefinition, ToolHandler, UnavailableHandler};
use anyhow::Result;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

pub(super) async fn chat(
    config: &Config,
    user: &str,
    tenant: &str,
    message: Option<String>,
) -> Result<()> {
    let router = ChatRouter::builder(config).build()?;

    if let Some(message) = message {
        let reply = router.chat(user, tenant, &message).await;
        println!("{}", render_reply(&reply));
        return Ok(());
    }

    interactive_repl(&router, user, tenant).await
}

async fn interactive_repl(router: &ChatRouter, user: &str, tenant: &str) -> Result<()> {
    use std::io::{self, BufRead, Write};

    println!("Chatting as {}@{} (Ctrl+D to exit)\n", user, tenant);
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let stdin = io::stdin();
        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            println!();
            return Ok(());
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        let reply = router.chat(user, tenant, input).await;
        println!("\n{}\n", render_reply(&reply));
    }
}

pub(super) async fn history(
    config: &Config,
    user: &str,
    tenant: &str,
    limit: Option<usize>,
) -> Result<()> {
    let router = ChatRouter::builder(config).build()?;
    let messages = router.get_history(user, tenant, limit).await?;
    if messages.is_empty() {
        println!("No history for {}@{}.", user, tenant);
    } else {
        print!("{}", render_history(&messages));
    }
    Ok(())
}

pub(super) async fn clear(config: &Config, user: &str, tenant: &str) -> Result<()> {
    let router = ChatRouter::builder(config).build()?;
    router.clear_history(user, tenant).await?;
    println!("Cleared history for {}@{}.", user, tenant);
    Ok(())
}

pub(super) fn classify(config: &Config, text: &str) -> Result<()> {
    let sanitized = Sanitizer::new(&config.sanitizer).sanitize(text);
    if !sanitized.safe {
        let reason = sanitized
            .blocked
            .map_or_else(|| "unsafe input".to_string(), |r| r.to_string());
        println!("Blocked: {}", reason);
        return Ok(());
    }
    let result = IntentClassifier::new(&config.classifier).classify(&sanitized.sanitized);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn gate_and_retry(config: &Config) -> (Arc<PermissionGate>, RetryExecutor) {
    let gate = Arc::new(PermissionGate::new(&config.permissions));
    let circuits = Arc::new(CircuitRegistry::new(BreakerSettings::from(
        &config.resilience,
    )));
    (gate, RetryExecutor::new(circuits))
}

pub(super) fn commands(config: &Config, role: &str) {
    let role = Role::from(role.to_string());
    let (gate, retry) = gate_and_retry(config);
    let executor = CommandExecutor::new(
        &config.executor,
        gate,
        retry,
        config.resilience.exec.clone(),
    );
    let available = executor.available_commands(&role);
    if available.is_empty() {
        println!("No commands available to {}.", role);
    } else {
        print!("{}", render_commands(&available));
    }
}

pub(super) fn tools(config: &Config, role: &str, category: Option<&str>) -> Result<()> {
    let role = Role::from(role.to_string());
    let (gate, retry) = gate_and_retry(config);
    // Listing never dispatches, so no backend is needed
    let handler: Arc<dyn ToolHandler> = Arc::new(UnavailableHandler);
    let registry = crate::tools::build_registry(config, gate, retry, &handler)?;
    let visible: Vec<&ToolDefinition> = registry
        .definitions_for(&role)
        .into_iter()
        .filter(|d| category.is_none_or(|c| d.category.eq_ignore_ascii_case(c)))
        .collect();
    if visible.is_empty() {
        println!("No tools available to {}.", role);
    } else {
        print!("{}", render_tools(&visible));
    }
    Ok(())
}

pub(super) async fn purge(config: &Config, older_than_hours: Option<u64>) -> Result<()> {
    let Some(path) = config.session_database_path()? else {
        println!("Sessions are kept in memory; nothing to purge.");
        return Ok(());
    };
    let older_than =
        older_than_hours.map_or_else(|| config.session.ttl(), |h| Duration::from_secs(h.saturating_mul(3600)));
    let store = SqliteSessionStore::open(&path)?;
    let removed = store.purge_stale(older_than).await?;
    println!("Purged {} stale session(s) from {}.", removed, path.display());
    Ok(())
}

pub(super) fn render_reply(reply: &ChatResponse) -> String {
    let mut out = reply.response.clone();
    if !reply.suggestions.is_empty() {
        let _ = write!(out, "\n\nTry: {}", reply.suggestions.join(" | "));
    }
    out
}

pub(super) fn render_history(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for m in messages {
        let _ = writeln!(
            out,
            "[{}] {}: {}",
            m.timestamp.format("%Y-%m-%d %H:%M:%S"),
            m.role.as_str(),
            m.content
        );
    }
    out
}

pub(super) fn render_commands(commands: &[&CommandSpec]) -> String {
    let width = commands.iter().map(|c| c.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for c in commands {
        let _ = writeln!(out, "  {:width$}  {}", c.name, c.description, width = width);
    }
    out
}

/// Tools grouped under their category headings, in name order within each.
pub(super) fn render_tools(tools: &[&ToolDefinition]) -> String {
    let mut sorted: Vec<&&ToolDefinition> = tools.iter().collect();
    sorted.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));

    let mut out = String::new();
    let mut current: Option<&str> = None;
    for tool in sorted {
        if current != Some(tool.category.as_str()) {
            let heading = if tool.category.is_empty() {
                "other"
            } else {
                tool.category.as_str()
            };
            let _ = writeln!(out, "{}:", heading);
            current = Some(tool.category.as_str());
        }
        let _ = writeln!(out, "  {}  {}", tool.name, tool.description);
    }
    out
}
