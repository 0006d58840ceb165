use regex::Regex;
use tracing::warn;

/// Replacement text for a filtered prompt-injection phrase.
pub const FILTERED: &str = "[FILTERED]";

/// Category of detected prompt injection pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionCategory {
    RoleSwitch,
    InstructionOverride,
    SecretExtraction,
    Jailbreak,
}

/// A prompt injection pattern match.
#[derive(Debug)]
pub struct InjectionMatch {
    pub category: InjectionCategory,
    pub pattern_name: &'static str,
    pub matched_text: String,
}

struct GuardPattern {
    category: InjectionCategory,
    name: &'static str,
    regex: Regex,
}

/// Regex-based prompt injection detection.
///
/// Patterns cover four categories in English and Arabic:
/// 1. Role switching: attempts to change the assistant's persona
/// 2. Instruction override: attempts to replace the system instruction
/// 3. Secret extraction: attempts to read back the system instruction
/// 4. Jailbreak markers: well-known jailbreak prefixes and chat-template tokens
///
/// The sanitizer either replaces matches with [`FILTERED`] or rejects the
/// message, depending on `sanitizer.promptGuard.action`.
pub struct PromptGuard {
    patterns: Vec<GuardPattern>,
}

impl Default for PromptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptGuard {
    pub fn new() -> Self {
        let pattern_defs: Vec<(InjectionCategory, &str, &str)> = vec![
            // Role switching
            (
                InjectionCategory::RoleSwitch,
                "ignore_previous",
                r"(?i)\b(?:ignore|disregard|forget)\b.{0,50}\b(?:previous|above|prior|all|your)\b.{0,50}\b(?:instructions?|prompts?|rules?|guidelines?)\b",
            ),
            (
                InjectionCategory::RoleSwitch,
                "forget_everything",
                r"(?i)\bforget\s+everything\b",
            ),
            (
                InjectionCategory::RoleSwitch,
                "you_are_now",
                r"(?i)\byou\s+are\s+now\s+(?:a|an|acting|pretending|playing)\b",
            ),
            (
                InjectionCategory::RoleSwitch,
                "pretend",
                r"(?i)\bpretend\s+(?:you|to\s+be)\b",
            ),
            (
                InjectionCategory::RoleSwitch,
                "act_as",
                r"(?i)\bact\s+as\s+(?:if|a|an)\b",
            ),
            (
                InjectionCategory::RoleSwitch,
                "ignore_previous_ar",
                r"(?:تجاهل|انس|انسى)\s+(?:كل\s+)?(?:التعليمات|الاوامر|الأوامر|القواعد)",
            ),
            // Instruction override
            (
                InjectionCategory::InstructionOverride,
                "new_instructions",
                r"(?i)(?:^|\n)\s*(?:system|new|updated|revised)\s*(?:prompt|instructions?|rules?)\s*:",
            ),
            (
                InjectionCategory::InstructionOverride,
                "system_you_are",
                r"(?i)\bsystem\s*:\s*you\s+are\b",
            ),
            (
                InjectionCategory::InstructionOverride,
                "override_system",
                r"(?i)\b(?:override|replace|overwrite)\s+(?:your|the|system|original)\s+(?:behaviou?r|prompt|instructions?|rules?)\b",
            ),
            // Secret extraction
            (
                InjectionCategory::SecretExtraction,
                "reveal_prompt",
                r"(?i)\b(?:repeat|show|display|output|print|reveal|tell me)\b.{0,50}\b(?:your|the|its)\s+(?:system prompt|instructions?|initial prompt|rules|guidelines)\b",
            ),
            (
                InjectionCategory::SecretExtraction,
                "what_are_your",
                r"(?i)\bwhat (?:are|is|were) your\b.{0,50}\b(?:instructions?|rules?|system prompt|guidelines)\b",
            ),
            // Jailbreak patterns
            (
                InjectionCategory::Jailbreak,
                "dan_mode",
                r"(?i)\b(?:DAN|developer|god)\s*mode\b",
            ),
            (
                InjectionCategory::Jailbreak,
                "jailbreak",
                r"(?i)\bjailbreak\b",
            ),
            (
                InjectionCategory::Jailbreak,
                "template_tokens",
                r"(?i)\[INST\]|\[\[SYSTEM\]\]|<\|im_start\|>",
            ),
        ];

        let patterns = pattern_defs
            .into_iter()
            .filter_map(|(category, name, pattern)| match Regex::new(pattern) {
                Ok(regex) => Some(GuardPattern {
                    category,
                    name,
                    regex,
                }),
                Err(e) => {
                    warn!("failed to compile prompt guard pattern '{}': {}", name, e);
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// Strip zero-width, bidi and combining characters that are used to split
    /// trigger words past a regex (e.g. "ig\u{200B}nore" becomes "ignore").
    ///
    /// Arabic harakat (U+064B..U+065F) are left alone here; the intent
    /// classifier folds them separately.
    pub fn normalize(text: &str) -> String {
        text.chars()
            .filter(|c| {
                !matches!(
                    *c,
                    '\u{200B}' // zero-width space
                    | '\u{200C}' // zero-width non-joiner
                    | '\u{200D}' // zero-width joiner
                    | '\u{200E}' // left-to-right mark
                    | '\u{200F}' // right-to-left mark
                    | '\u{FEFF}' // byte-order mark
                    | '\u{00AD}' // soft hyphen
                    | '\u{034F}' // combining grapheme joiner
                    | '\u{2060}'..='\u{2064}' // word joiner, invisible operators
                    | '\u{FE00}'..='\u{FE0F}' // variation selectors
                    | '\u{0300}'..='\u{036F}' // combining diacritical marks
                    | '\u{1AB0}'..='\u{1AFF}'
                    | '\u{1DC0}'..='\u{1DFF}'
                    | '\u{20D0}'..='\u{20FF}'
                    | '\u{FE20}'..='\u{FE2F}' // combining half marks
                    | '\u{202A}'..='\u{202E}' // bidi embeddings and overrides
                    | '\u{2066}'..='\u{2069}' // bidi isolates
                    | '\u{E0100}'..='\u{E01EF}'
                )
            })
            .collect()
    }

    /// Scan text for prompt injection patterns. Returns all matches found.
    pub fn scan(&self, text: &str) -> Vec<InjectionMatch> {
        let normalized = Self::normalize(text);
        let mut matches = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(&normalized) {
                matches.push(InjectionMatch {
                    category: pattern.category,
                    pattern_name: pattern.name,
                    matched_text: m.as_str().to_string(),
                });
            }
        }
        matches
    }

    /// Whether any pattern matches.
    pub fn is_suspicious(&self, text: &str) -> bool {
        let normalized = Self::normalize(text);
        self.patterns.iter().any(|p| p.regex.is_match(&normalized))
    }

    /// Replace every matched phrase with [`FILTERED`]. Returns the filtered
    /// (normalized) text and the names of the patterns that fired.
    pub fn filter(&self, text: &str) -> (String, Vec<&'static str>) {
        let mut out = Self::normalize(text);
        let mut fired = Vec::new();
        for pattern in &self.patterns {
            if pattern.regex.is_match(&out) {
                fired.push(pattern.name);
                out = pattern.regex.replace_all(&out, FILTERED).into_owned();
            }
        }
        (out, fired)
    }
}

#[cfg(test)]
mod tests;
