pub mod rules;

use crate::config::ClassifierConfig;
use crate::safety::PromptGuard;
use rules::{IntentRule, NEW_SYSTEM, RULES};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Confidence assigned when no rule matches.
pub const GENERAL_CHAT_CONFIDENCE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    ExecutiveCommand,
    SelfHeal,
    Enhancement,
    Creation,
    EmployeeAction,
    TaskAction,
    GoalAction,
    PerformanceAction,
    RecognitionAction,
    LeaveAction,
    PayrollAction,
    Report,
    Query,
    GeneralChat,
}

impl IntentKind {
    pub const ALL: [IntentKind; 14] = [
        Self::ExecutiveCommand,
        Self::SelfHeal,
        Self::Enhancement,
        Self::Creation,
        Self::EmployeeAction,
        Self::TaskAction,
        Self::GoalAction,
        Self::PerformanceAction,
        Self::RecognitionAction,
        Self::LeaveAction,
        Self::PayrollAction,
        Self::Report,
        Self::Query,
        Self::GeneralChat,
    ];

    /// Dense index into per-intent tables.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExecutiveCommand => "EXECUTIVE_COMMAND",
            Self::SelfHeal => "SELF_HEAL",
            Self::Enhancement => "ENHANCEMENT",
            Self::Creation => "CREATION",
            Self::EmployeeAction => "EMPLOYEE_ACTION",
            Self::TaskAction => "TASK_ACTION",
            Self::GoalAction => "GOAL_ACTION",
            Self::PerformanceAction => "PERFORMANCE_ACTION",
            Self::RecognitionAction => "RECOGNITION_ACTION",
            Self::LeaveAction => "LEAVE_ACTION",
            Self::PayrollAction => "PAYROLL_ACTION",
            Self::Report => "REPORT",
            Self::Query => "QUERY",
            Self::GeneralChat => "GENERAL_CHAT",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of one message. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    pub intent: IntentKind,
    #[serde(rename = "subIntent", skip_serializing_if = "Option::is_none")]
    pub sub_intent: Option<&'static str>,
    pub confidence: f32,
    pub entities: BTreeMap<String, Value>,
    #[serde(rename = "requiresClarification")]
    pub requires_clarification: bool,
    #[serde(rename = "clarificationPrompt", skip_serializing_if = "Option::is_none")]
    pub clarification_prompt: Option<String>,
}

impl IntentResult {
    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities.get(name).and_then(Value::as_str)
    }
}

/// Deterministic pattern classifier over the ordered rule table.
pub struct IntentClassifier {
    threshold: f32,
}

impl IntentClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            threshold: config.confidence_threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// The rule table in evaluation order.
    pub fn rules() -> &'static [IntentRule] {
        &RULES
    }

    pub fn classify(&self, text: &str) -> IntentResult {
        let normalized = normalize(text);
        let arabic = contains_arabic(text);

        let Some((index, rule)) = RULES
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.pattern.is_match(&normalized))
        else {
            debug!("no intent rule matched, falling back to general chat");
            return IntentResult {
                intent: IntentKind::GeneralChat,
                sub_intent: None,
                confidence: GENERAL_CHAT_CONFIDENCE,
                entities: BTreeMap::new(),
                requires_clarification: false,
                clarification_prompt: None,
            };
        };

        let entities = extract_entities(rule, text, &normalized);
        let (intent, sub_intent) =
            if rule.intent == IntentKind::Enhancement && NEW_SYSTEM.is_match(&normalized) {
                (IntentKind::Creation, Some("new_system"))
            } else {
                (rule.intent, rule.sub)
            };

        let requires_clarification = rule.confidence < self.threshold;
        debug!(
            "classified as {}/{} by rule #{} (confidence {:.2})",
            intent,
            sub_intent.unwrap_or("-"),
            index,
            rule.confidence
        );

        IntentResult {
            intent,
            sub_intent,
            confidence: rule.confidence,
            entities,
            requires_clarification,
            clarification_prompt: requires_clarification
                .then(|| clarification_prompt(intent, arabic).to_string()),
        }
    }
}

/// Captures are taken from the case-preserving form of the message when the
/// rule matches it there, otherwise from the normalized form.
fn extract_entities(rule: &IntentRule, raw: &str, normalized: &str) -> BTreeMap<String, Value> {
    let display = collapse_whitespace(&PromptGuard::normalize(raw).nfc().collect::<String>());
    let captures = rule
        .pattern
        .captures(&display)
        .or_else(|| rule.pattern.captures(normalized));

    let mut entities = BTreeMap::new();
    if let Some(captures) = captures {
        for name in rule.pattern.capture_names().flatten() {
            if let Some(m) = captures.name(name) {
                let value = m.as_str().trim();
                if !value.is_empty() {
                    entities.insert(name.to_string(), Value::String(value.to_string()));
                }
            }
        }
    }
    entities
}

/// Fold Unicode variants so one pattern covers every spelling: NFKD with
/// combining marks (Latin accents, Arabic tashkeel) dropped, Arabic letter
/// forms unified, lowercase, single spaces.
pub fn normalize(text: &str) -> String {
    let folded: String = PromptGuard::normalize(text)
        .nfkd()
        .filter(|c| !is_combining_mark(*c) && !is_tashkeel(*c) && *c != '\u{0640}')
        .map(fold_arabic_letter)
        .flat_map(char::to_lowercase)
        .collect();
    collapse_whitespace(&folded)
}

fn is_tashkeel(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}')
}

fn fold_arabic_letter(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
        'ى' => 'ي',
        'ة' => 'ه',
        'ؤ' => 'و',
        'ئ' => 'ي',
        other => other,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn contains_arabic(text: &str) -> bool {
    text.chars().any(|c| matches!(c, '\u{0600}'..='\u{06FF}'))
}

/// Follow-up question for a low-confidence or under-specified intent.
pub fn clarification_prompt(intent: IntentKind, arabic: bool) -> &'static str {
    match (intent, arabic) {
        (IntentKind::Enhancement, false) => {
            "Do you want to modify an existing system or create a new one?"
        }
        (IntentKind::Enhancement, true) => "هل تريد تعديل نظام موجود أم إنشاء نظام جديد؟",
        (IntentKind::EmployeeAction, false) => "Can you name the employee more clearly?",
        (IntentKind::EmployeeAction, true) => "هل يمكنك تحديد اسم الموظف بشكل أوضح؟",
        (IntentKind::LeaveAction, false) => "What type of leave do you need, and for how long?",
        (IntentKind::LeaveAction, true) => "ما نوع الإجازة والمدة المطلوبة؟",
        (IntentKind::GoalAction, false) => "What is the goal's title, and who is it for?",
        (IntentKind::GoalAction, true) => "ما هو عنوان الهدف؟ ولمن؟",
        (IntentKind::PerformanceAction, false) => {
            "Which employee should the performance review be for?"
        }
        (IntentKind::PerformanceAction, true) => "لأي موظف تريد إنشاء تقييم الأداء؟",
        (IntentKind::RecognitionAction, false) => {
            "Who should receive the recognition, and for what?"
        }
        (IntentKind::RecognitionAction, true) => "لمن تريد إرسال التقدير؟ وما السبب؟",
        (IntentKind::PayrollAction, false) => {
            "Which month and year should payroll be calculated for?"
        }
        (IntentKind::PayrollAction, true) => "لأي شهر وسنة تريد حساب الرواتب؟",
        (_, false) => "Could you describe your request in more detail?",
        (_, true) => "هل يمكنك توضيح طلبك بشكل أكثر تفصيلاً؟",
    }
}

/// Example phrasings offered alongside a clarification question.
pub fn clarification_suggestions(intent: IntentKind, arabic: bool) -> Vec<String> {
    let examples: &[&str] = match (intent, arabic) {
        (IntentKind::LeaveAction, false) => &[
            "request 3 days of annual leave from 2026-11-01",
            "leave balance",
        ],
        (IntentKind::LeaveAction, true) => &["اجازة سنوية 3 ايام", "رصيد اجازاتي"],
        (IntentKind::PayrollAction, false) => &["run payroll for march 2026", "my payslip"],
        (IntentKind::PayrollAction, true) => &["احسب الرواتب شهر 3 2026", "كشف راتبي"],
        (IntentKind::EmployeeAction, false) => &[
            "find employee Sara",
            "add employee named Sara Ali",
        ],
        (IntentKind::EmployeeAction, true) => &["ابحث عن موظف سارة", "اضف موظف اسمه سارة علي"],
        (IntentKind::GoalAction, false) => &["set a goal: close Q4 hiring", "my goals"],
        (IntentKind::PerformanceAction, false) => &["start a performance review for Sara"],
        (IntentKind::RecognitionAction, false) => &["send kudos to Sara for the launch"],
        (IntentKind::Enhancement, false) => &[
            "add a new leave type",
            "build a new inventory system",
        ],
        (_, false) => &["how many employees", "attendance report", "my tasks"],
        (_, true) => &["كم موظف", "تقرير الحضور", "مهامي"],
    };
    examples.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests;
