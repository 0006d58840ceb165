pub mod backend;
pub mod base;
pub mod catalog;
pub mod params;
pub mod registry;

pub use backend::{HttpToolBackend, UnavailableHandler};
pub use base::{
    CallerContext, ParamSpec, ParamType, ToolDefinition, ToolErrorKind, ToolHandler, ToolResult,
};
pub use registry::{DispatchError, INSUFFICIENT_PRIVILEGE, ToolRegistry};

use crate::config::{Config, ToolsConfig};
use crate::resilience::RetryExecutor;
use crate::router::permissions::PermissionGate;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// [`HttpToolBackend`] when `tools.backendUrl` is set, else
/// [`UnavailableHandler`].
pub fn default_handler(config: &ToolsConfig) -> Arc<dyn ToolHandler> {
    match &config.backend_url {
        Some(url) => {
            info!("tools dispatch to backend at {}", url);
            Arc::new(HttpToolBackend::new(url.clone()))
        }
        None => {
            info!("no tool backend configured, catalog tools will report unavailable");
            Arc::new(UnavailableHandler)
        }
    }
}

/// Registry holding the configured catalog with every tool bound to
/// `handler`.
pub fn build_registry(
    config: &Config,
    gate: Arc<PermissionGate>,
    retry: RetryExecutor,
    handler: &Arc<dyn ToolHandler>,
) -> Result<ToolRegistry> {
    let definitions = catalog::load(&config.tools)?;
    let mut registry = ToolRegistry::new(
        gate,
        retry,
        config.resilience.tools.clone(),
        Duration::from_secs(config.tools.timeout_secs),
    );
    registry.register_all(definitions, handler)?;
    Ok(registry)
}
