use crate::config::ToolsConfig;
use crate::tools::base::ToolDefinition;
use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

const BUILTIN_CATALOG: &str = include_str!("catalog.json");

/// The catalog compiled into the binary.
pub fn builtin() -> Result<Vec<ToolDefinition>> {
    parse(BUILTIN_CATALOG).context("built-in tool catalog is malformed")
}

/// Load a catalog document from disk.
pub fn from_path(path: &Path) -> Result<Vec<ToolDefinition>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tool catalog {}", path.display()))?;
    parse(&content).with_context(|| format!("invalid tool catalog {}", path.display()))
}

/// `tools.catalogPath` when set, else the built-in catalog.
pub fn load(config: &ToolsConfig) -> Result<Vec<ToolDefinition>> {
    let definitions = match &config.catalog_path {
        Some(path) => from_path(&crate::utils::expand_home(path))?,
        None => builtin()?,
    };
    info!("loaded {} tool definitions", definitions.len());
    Ok(definitions)
}

pub fn parse(content: &str) -> Result<Vec<ToolDefinition>> {
    let definitions: Vec<ToolDefinition> = serde_json::from_str(content)?;
    let mut seen = HashSet::new();
    for def in &definitions {
        if !seen.insert(def.name.as_str()) {
            bail!("duplicate tool '{}'", def.name);
        }
    }
    Ok(definitions)
}
