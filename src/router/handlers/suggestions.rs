use crate::router::intent::IntentKind;
use crate::router::permissions::{PermissionGate, Role};

/// How many suggestions accompany a reply.
pub const MAX_SUGGESTIONS: usize = 4;

pub(super) struct Suggestion {
    pub(super) intent: IntentKind,
    pub(super) sub: Option<&'static str>,
    pub(super) english: &'static str,
    pub(super) arabic: &'static str,
}

const fn suggestion(
    intent: IntentKind,
    sub: Option<&'static str>,
    english: &'static str,
    arabic: &'static str,
) -> Suggestion {
    Suggestion {
        intent,
        sub,
        english,
        arabic,
    }
}

/// Follow-up requests in display order. Each is tied to the intent it would
/// classify as, so a role is only offered what it may ask for.
pub(super) const CATALOG: &[Suggestion] = &[
    suggestion(IntentKind::Report, Some("general"), "dashboard summary", "ملخص اليوم"),
    suggestion(IntentKind::Report, Some("attendance"), "attendance report", "تقرير الحضور"),
    suggestion(IntentKind::LeaveAction, Some("list"), "pending leave requests", "طلبات الإجازات"),
    suggestion(IntentKind::Query, Some("late"), "who is late today", "من المتأخرين اليوم"),
    suggestion(IntentKind::Report, Some("leaves"), "leave statistics", "إحصائيات الإجازات"),
    suggestion(IntentKind::PayrollAction, Some("view"), "payroll status", "مسير الرواتب"),
    suggestion(IntentKind::LeaveAction, Some("balance"), "my leave balance", "رصيد إجازاتي"),
    suggestion(IntentKind::TaskAction, Some("list"), "my tasks", "مهامي"),
    suggestion(IntentKind::PayrollAction, Some("payslip"), "my payslip", "كشف راتبي"),
    suggestion(IntentKind::GoalAction, Some("list"), "my goals", "أهدافي"),
    suggestion(IntentKind::ExecutiveCommand, Some("status"), "system status", "حالة النظام"),
];

/// Suggestions for `role` after a reply to `intent`: the same area first,
/// then the rest, filtered to requests the role may make.
pub fn contextual(gate: &PermissionGate, role: &Role, intent: IntentKind, arabic: bool) -> Vec<String> {
    let allowed = CATALOG
        .iter()
        .filter(|s| gate.can_request(s.intent, s.sub, role));
    let (related, others): (Vec<&Suggestion>, Vec<&Suggestion>) =
        allowed.partition(|s| s.intent == intent);
    related
        .into_iter()
        .chain(others)
        .take(MAX_SUGGESTIONS)
        .map(|s| if arabic { s.arabic } else { s.english }.to_string())
        .collect()
}
