use crate::config::SanitizerConfig;
use crate::safety::prompt_guard::PromptGuard;
use crate::utils::lexical_normalize;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

/// Why a message was rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Empty,
    CodeInjection,
    PathTraversal,
    ScriptInjection,
    PromptInjection,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty message"),
            Self::CodeInjection => write!(f, "code injection"),
            Self::PathTraversal => write!(f, "path traversal"),
            Self::ScriptInjection => write!(f, "script injection"),
            Self::PromptInjection => write!(f, "prompt injection"),
        }
    }
}

/// Outcome of [`Sanitizer::sanitize`]. `safe == false` means the router must
/// refuse the request without classifying or dispatching it.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizeResult {
    pub safe: bool,
    pub sanitized: String,
    pub warnings: Vec<String>,
    pub blocked: Option<BlockReason>,
}

/// Hard-block list. Kept narrow enough that ordinary HR requests
/// ("update Ahmed's salary", "delete the task") still pass.
static BLOCK_PATTERNS: LazyLock<Vec<(BlockReason, &'static str, Regex)>> = LazyLock::new(|| {
    let defs: &[(BlockReason, &str, &str)] = &[
        (
            BlockReason::CodeInjection,
            "sql_union",
            r"(?i)\bunion\s+(?:all\s+)?select\b",
        ),
        (
            BlockReason::CodeInjection,
            "sql_tautology",
            r#"(?i)['"]\s*(?:or|and)\s+['"]?\w+['"]?\s*=\s*['"]?\w+"#,
        ),
        (
            BlockReason::CodeInjection,
            "sql_stacked",
            r"(?i);\s*(?:drop|delete|update|insert|truncate|alter)\b",
        ),
        (
            BlockReason::CodeInjection,
            "sql_drop",
            r"(?i)\bdrop\s+(?:table|database|schema)\b",
        ),
        (
            BlockReason::CodeInjection,
            "nosql_operator",
            r#"(?i)\$(?:where|gt|gte|lt|lte|ne|eq|in|nin|regex|expr)["']?\s*:"#,
        ),
        (
            BlockReason::CodeInjection,
            "shell_substitution",
            r"`|\$\(|\$\{",
        ),
        (
            BlockReason::CodeInjection,
            "shell_chain",
            r"(?i)(?:;|&&|\|\||\|)\s*(?:rm|curl|wget|bash|sh|zsh|nc|chmod|chown|sudo|kill|eval|exec|python3?|node|perl)\b",
        ),
        (
            BlockReason::PathTraversal,
            "dot_dot_slash",
            r"(?i)\.\.[/\\]|%2e%2e(?:%2f|%5c|[/\\])",
        ),
        (
            BlockReason::ScriptInjection,
            "script_tag",
            r"(?i)<\s*(?:script|iframe|object|embed)\b",
        ),
        (
            BlockReason::ScriptInjection,
            "javascript_uri",
            r"(?i)\bjavascript\s*:",
        ),
        (
            BlockReason::ScriptInjection,
            "event_handler",
            r"(?i)<[^>]*\bon[a-z]+\s*=",
        ),
    ];
    defs.iter()
        .filter_map(|(reason, name, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((*reason, *name, re)),
            Err(e) => {
                warn!("failed to compile block pattern '{}': {}", name, e);
                None
            }
        })
        .collect()
});

/// Known element names only, so comparisons such as `salary<bonus and age>30`
/// are left alone.
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)</?(?:a|abbr|address|article|aside|audio|b|base|blockquote|body|br|button|",
        r"caption|center|code|del|div|em|embed|font|footer|form|h[1-6]|head|header|hr|html|",
        r"i|iframe|img|input|ins|label|li|link|main|mark|meta|nav|noscript|object|ol|option|",
        r"p|pre|q|s|script|section|select|small|source|span|strike|strong|style|sub|sup|svg|",
        r"table|tbody|td|textarea|tfoot|th|thead|title|tr|u|ul|video)\b(?:\s[^<>]*)?/?>",
    ))
    .expect("static regex")
});

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("static regex"));

/// Screens raw chat text before it reaches the classifier.
pub struct Sanitizer {
    max_length: usize,
    block_prompt_injection: bool,
    guard: PromptGuard,
}

impl Sanitizer {
    pub fn new(config: &SanitizerConfig) -> Self {
        Self {
            max_length: config.max_length,
            block_prompt_injection: config.prompt_guard.should_block(),
            guard: PromptGuard::new(),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Normalize and screen `raw`. Never fails: hard-blocked input comes back
    /// with `safe == false` and an empty `sanitized`.
    pub fn sanitize(&self, raw: &str) -> SanitizeResult {
        let mut warnings = Vec::new();

        // NFKC folds full-width and compatibility forms ("＜script＞") before matching
        let cleaned: String = strip_control_chars(&PromptGuard::normalize(raw))
            .nfkc()
            .collect();

        if let Some((reason, name)) = self.hard_block(&cleaned) {
            warn!(
                "sanitizer blocked message ({}: {}), prefix={:?}",
                reason,
                name,
                preview(&cleaned)
            );
            return SanitizeResult::blocked(reason, format!("Blocked: {reason}"));
        }

        let mut text = HTML_TAG.replace_all(&cleaned, "").into_owned();
        if text.len() != cleaned.len() {
            warnings.push("HTML markup removed".to_string());
        }

        let (filtered, fired) = self.guard.filter(&text);
        if !fired.is_empty() {
            if self.block_prompt_injection {
                warn!("sanitizer blocked prompt injection ({})", fired.join(", "));
                return SanitizeResult::blocked(
                    BlockReason::PromptInjection,
                    "Prompt manipulation attempt detected".to_string(),
                );
            }
            debug!("prompt injection phrases filtered: {}", fired.join(", "));
            warnings.push("Prompt manipulation attempt detected".to_string());
            text = filtered;
        }

        let text = HORIZONTAL_SPACE.replace_all(text.trim(), " ");
        let char_count = text.chars().count();
        let sanitized: String = if char_count > self.max_length {
            warnings.push(format!(
                "Message truncated from {} to {} characters",
                char_count, self.max_length
            ));
            text.chars().take(self.max_length).collect::<String>().trim_end().to_string()
        } else {
            text.into_owned()
        };

        if sanitized.is_empty() {
            return SanitizeResult::blocked(BlockReason::Empty, "Message is empty".to_string());
        }

        SanitizeResult {
            safe: true,
            sanitized,
            warnings,
            blocked: None,
        }
    }

    /// Non-empty after trimming and within the length bound.
    pub fn is_valid_request(&self, text: &str) -> bool {
        let trimmed = text.trim();
        !trimmed.is_empty() && trimmed.chars().count() <= self.max_length
    }

    fn hard_block(&self, text: &str) -> Option<(BlockReason, &'static str)> {
        BLOCK_PATTERNS
            .iter()
            .find(|(_, _, re)| re.is_match(text))
            .map(|(reason, name, _)| (*reason, *name))
    }
}

impl SanitizeResult {
    fn blocked(reason: BlockReason, warning: String) -> Self {
        Self {
            safe: false,
            sanitized: String::new(),
            warnings: vec![warning],
            blocked: Some(reason),
        }
    }
}

/// Drop C0/C1 control characters except newline and tab.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn preview(text: &str) -> String {
    text.chars().take(24).collect()
}

/// Whether `path` stays inside one of `allowed_roots` once `.`/`..` are
/// resolved. Relative paths are resolved against each root in turn.
pub fn validate_file_path(path: impl AsRef<Path>, allowed_roots: &[String]) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return false;
    }
    allowed_roots.iter().any(|root| {
        let root = lexical_normalize(Path::new(root));
        if !root.is_absolute() {
            return false;
        }
        let candidate = if path.is_absolute() {
            lexical_normalize(path)
        } else {
            lexical_normalize(&root.join(path))
        };
        candidate.starts_with(&root)
    })
}
