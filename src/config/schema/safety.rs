use serde::{Deserialize, Serialize};

fn default_max_length() -> usize {
    2000
}

/// Action taken when a prompt-injection phrase is found in chat input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptGuardAction {
    /// Replace the phrase with `[FILTERED]`, flag it and continue (default).
    #[default]
    Warn,
    /// Reject the message entirely.
    Block,
}

impl std::fmt::Display for PromptGuardAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warn => write!(f, "warn"),
            Self::Block => write!(f, "block"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptGuardConfig {
    #[serde(default)]
    pub action: PromptGuardAction,
}

impl PromptGuardConfig {
    /// Whether detected prompt injections should block the message.
    pub fn should_block(&self) -> bool {
        self.action == PromptGuardAction::Block
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Maximum message length in characters; longer input is truncated.
    #[serde(default = "default_max_length", rename = "maxLength")]
    pub max_length: usize,
    #[serde(default, rename = "promptGuard")]
    pub prompt_guard: PromptGuardConfig,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            prompt_guard: PromptGuardConfig::default(),
        }
    }
}

fn default_confidence_threshold() -> f32 {
    0.6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Results below this confidence ask a clarification question instead of dispatching.
    #[serde(
        default = "default_confidence_threshold",
        rename = "confidenceThreshold"
    )]
    pub confidence_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_super_role() -> String {
    "SUPER_ADMIN".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Role that bypasses every permission rule.
    #[serde(default = "default_super_role", rename = "superRole")]
    pub super_role: String,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            super_role: default_super_role(),
        }
    }
}
