use super::*;
use crate::config::PermissionsConfig;
use crate::router::permissions::PermissionGate;

fn classifier() -> IntentClassifier {
    IntentClassifier::new(&ClassifierConfig::default())
}

fn assert_intent(text: &str, intent: IntentKind, sub: &str) -> IntentResult {
    let result = classifier().classify(text);
    assert_eq!(result.intent, intent, "intent for {:?}", text);
    assert_eq!(result.sub_intent, Some(sub), "sub-intent for {:?}", text);
    result
}

#[test]
fn test_restart_the_backend() {
    let result = assert_intent("restart the backend", IntentKind::ExecutiveCommand, "restart");
    assert!(!result.requires_clarification);
    assert!(result.confidence >= 0.9);
}

#[test]
fn test_case_and_spacing_do_not_matter() {
    assert_intent(
        "  Restart   THE Backend ",
        IntentKind::ExecutiveCommand,
        "restart",
    );
}

#[test]
fn test_zero_width_characters_are_ignored() {
    assert_intent(
        "re\u{200B}start the backend",
        IntentKind::ExecutiveCommand,
        "restart",
    );
}

#[test]
fn test_arabic_restart_with_hamza_forms() {
    assert_intent(
        "أعد تشغيل الباك اند",
        IntentKind::ExecutiveCommand,
        "restart",
    );
}

#[test]
fn test_executive_sub_commands() {
    let git = assert_intent("git status", IntentKind::ExecutiveCommand, "git");
    assert_eq!(git.entity("gitCommand"), Some("status"));
    assert_intent("show me the logs", IntentKind::ExecutiveCommand, "logs");
    assert_intent(
        "what's the system status?",
        IntentKind::ExecutiveCommand,
        "status",
    );
    assert_intent("deploy", IntentKind::ExecutiveCommand, "deploy");
    assert_intent("take a backup", IntentKind::ExecutiveCommand, "backup");
}

#[test]
fn test_self_heal() {
    assert_intent("fix the server errors", IntentKind::SelfHeal, "diagnose");
}

#[test]
fn test_enhancement_requests() {
    assert_intent(
        "add a new field to employees",
        IntentKind::Enhancement,
        "add_field",
    );
    let result = assert_intent(
        "add a reporting dashboard to the leave system",
        IntentKind::Enhancement,
        "add_to_system",
    );
    assert_eq!(result.entity("module"), Some("leave"));
}

#[test]
fn test_new_system_exclusion_relabels_enhancement() {
    assert_intent(
        "ضيف لنظام كامل للمخزون",
        IntentKind::Creation,
        "new_system",
    );
    assert_intent(
        "extend the payroll system into a complete new system",
        IntentKind::Creation,
        "new_system",
    );
}

#[test]
fn test_creation_captures_module() {
    let result = assert_intent("build an inventory module", IntentKind::Creation, "new_system");
    assert_eq!(result.entity("module"), Some("inventory"));
}

#[test]
fn test_add_employee_entities_keep_original_case() {
    let result = assert_intent(
        "Add employee named Sara Ali with email sara@example.com",
        IntentKind::EmployeeAction,
        "add",
    );
    assert_eq!(result.entity("firstName"), Some("Sara"));
    assert_eq!(result.entity("lastName"), Some("Ali"));
    assert_eq!(result.entity("email"), Some("sara@example.com"));
}

#[test]
fn test_employee_update_forms() {
    let result = assert_intent(
        "update the salary of Omar to 5000",
        IntentKind::EmployeeAction,
        "update",
    );
    assert_eq!(result.entity("field"), Some("salary"));
    assert_eq!(result.entity("employeeName"), Some("Omar"));
    assert_eq!(result.entity("value"), Some("5000"));

    let result = assert_intent(
        "change Omar's department to Sales",
        IntentKind::EmployeeAction,
        "update",
    );
    assert_eq!(result.entity("employeeName"), Some("Omar"));
    assert_eq!(result.entity("field"), Some("department"));
    assert_eq!(result.entity("value"), Some("Sales"));
}

#[test]
fn test_missing_capture_is_not_an_error() {
    let result = assert_intent("delete employee", IntentKind::EmployeeAction, "delete");
    assert!(result.entities.is_empty());
    assert!(!result.requires_clarification);
}

#[test]
fn test_entity_crud_intents() {
    let result = assert_intent("delete employee Ahmed", IntentKind::EmployeeAction, "delete");
    assert_eq!(result.entity("employeeName"), Some("Ahmed"));

    let result = assert_intent(
        "show all employees in engineering",
        IntentKind::EmployeeAction,
        "list",
    );
    assert_eq!(result.entity("department"), Some("engineering"));

    let result = assert_intent(
        "create a task for Sara: prepare the Q3 report",
        IntentKind::TaskAction,
        "create",
    );
    assert_eq!(result.entity("assigneeName"), Some("Sara"));
    assert_eq!(result.entity("title"), Some("prepare the Q3 report"));

    assert_intent("my tasks", IntentKind::TaskAction, "list");

    let result = assert_intent(
        "update goal Hiring to 75%",
        IntentKind::GoalAction,
        "update_progress",
    );
    assert_eq!(result.entity("progress"), Some("75"));

    let result = assert_intent(
        "start a performance review for Lina",
        IntentKind::PerformanceAction,
        "review",
    );
    assert_eq!(result.entity("employeeName"), Some("Lina"));

    let result = assert_intent(
        "send kudos to Sara for the launch",
        IntentKind::RecognitionAction,
        "give",
    );
    assert_eq!(result.entity("reason"), Some("the launch"));
}

#[test]
fn test_leave_workflow() {
    assert_intent("what is my leave balance", IntentKind::LeaveAction, "balance");

    let result = assert_intent(
        "approve the leave request for Sara",
        IntentKind::LeaveAction,
        "approve",
    );
    assert_eq!(result.entity("employeeName"), Some("Sara"));

    let result = assert_intent(
        "request 3 days of annual leave from 2026-11-01",
        IntentKind::LeaveAction,
        "create",
    );
    assert_eq!(result.entity("days"), Some("3"));
    assert_eq!(result.entity("leaveType"), Some("annual"));
    assert_eq!(result.entity("startDate"), Some("2026-11-01"));
}

#[test]
fn test_arabic_leave_request_uses_folded_captures() {
    let result = assert_intent("إجازة سنوية 3 أيام", IntentKind::LeaveAction, "create");
    assert_eq!(result.entity("leaveType"), Some("سنويه"));
    assert_eq!(result.entity("days"), Some("3"));
}

#[test]
fn test_payroll_workflow() {
    let result = assert_intent(
        "run payroll for march 2026",
        IntentKind::PayrollAction,
        "calculate",
    );
    assert_eq!(result.entity("month"), Some("march"));
    assert_eq!(result.entity("year"), Some("2026"));

    assert_intent(
        "approve payroll for march 2026",
        IntentKind::PayrollAction,
        "approve",
    );
    assert_intent("my payslip", IntentKind::PayrollAction, "payslip");
}

#[test]
fn test_reports_and_queries() {
    assert_intent("attendance report", IntentKind::Report, "attendance");
    assert_intent("payroll report", IntentKind::Report, "payroll");

    let result = assert_intent(
        "how many employees are late today",
        IntentKind::Query,
        "count",
    );
    assert_eq!(result.entity("entity"), Some("employees"));
    assert_eq!(result.entity("filter"), Some("late"));

    assert_intent("who is late today", IntentKind::Query, "late");
    let lookup = assert_intent("what time is the meeting", IntentKind::Query, "lookup");
    assert!(!lookup.requires_clarification);
}

#[test]
fn test_vague_mention_requires_clarification() {
    let result = assert_intent("I want some time off", IntentKind::LeaveAction, "create");
    assert!(result.requires_clarification);
    assert_eq!(
        result.clarification_prompt.as_deref(),
        Some("What type of leave do you need, and for how long?")
    );
}

#[test]
fn test_arabic_clarification_prompt() {
    let result = classifier().classify("محتاج اجازة");
    assert_eq!(result.intent, IntentKind::LeaveAction);
    assert!(result.requires_clarification);
    assert_eq!(
        result.clarification_prompt.as_deref(),
        Some("ما نوع الإجازة والمدة المطلوبة؟")
    );
}

#[test]
fn test_threshold_is_configurable() {
    let lenient = IntentClassifier::new(&ClassifierConfig {
        confidence_threshold: 0.4,
    });
    let result = lenient.classify("I want some time off");
    assert!(!result.requires_clarification);
    assert!(result.clarification_prompt.is_none());
}

#[test]
fn test_general_chat_fallback() {
    let result = classifier().classify("hello there");
    assert_eq!(result.intent, IntentKind::GeneralChat);
    assert_eq!(result.sub_intent, None);
    assert!((result.confidence - GENERAL_CHAT_CONFIDENCE).abs() < f32::EPSILON);
    assert!(!result.requires_clarification);
}

#[test]
fn test_classification_is_deterministic() {
    let c = classifier();
    for text in [
        "restart the backend",
        "إجازة سنوية 3 أيام",
        "how many employees are late today",
        "hello there",
    ] {
        assert_eq!(c.classify(text), c.classify(text));
    }
}

#[test]
fn test_every_rule_has_a_permission_entry() {
    let gate = PermissionGate::new(&PermissionsConfig::default());
    for rule in IntentClassifier::rules() {
        assert!(
            gate.has_rule(rule.intent, rule.sub),
            "no permission rule for {:?}/{:?}",
            rule.intent,
            rule.sub
        );
    }
    assert!(gate.has_rule(IntentKind::Creation, Some("new_system")));
    assert!(gate.has_rule(IntentKind::GeneralChat, None));
}

#[test]
fn test_normalize_folds_variants() {
    assert_eq!(normalize("Café  RÉSUMÉ"), "cafe resume");
    assert_eq!(normalize("إِجَازَة"), "اجازه");
    assert_eq!(normalize("مستشفى مؤسسة"), "مستشفي موسسه");
}

#[test]
fn test_intent_result_serializes_camel_case() {
    let result = classifier().classify("restart the backend");
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["intent"], "EXECUTIVE_COMMAND");
    assert_eq!(json["subIntent"], "restart");
    assert_eq!(json["requiresClarification"], false);
    assert!(json.get("clarificationPrompt").is_none());
}

#[test]
fn test_intent_index_is_dense() {
    for (i, intent) in IntentKind::ALL.iter().enumerate() {
        assert_eq!(intent.index(), i);
    }
}
