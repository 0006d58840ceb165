use super::IntentKind;
use regex::Regex;
use std::sync::LazyLock;

/// Confidence for a match that names the action but not enough detail to act
/// on; below the default threshold, so the router asks a clarifying question.
pub const VAGUE: f32 = 0.5;

/// One row of the ordered classification table. Patterns run against the
/// normalized text (lowercase, Arabic letter forms folded: `ة` is `ه`, `أ`
/// is `ا`, `ى` is `ي`), so Arabic alternatives are written in folded form.
/// Named capture groups use the parameter names of the tool the intent routes
/// to.
pub struct IntentRule {
    pub intent: IntentKind,
    pub sub: Option<&'static str>,
    pub pattern: Regex,
    pub confidence: f32,
}

fn rule(
    intent: IntentKind,
    sub: &'static str,
    pattern: &str,
    confidence: f32,
) -> IntentRule {
    IntentRule {
        intent,
        sub: Some(sub),
        pattern: Regex::new(pattern).expect("invalid intent rule pattern"),
        confidence,
    }
}

/// "Build a whole new system" phrasing that turns an enhancement match into a
/// creation request.
pub static NEW_SYSTEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:create|build|make)\s+(?:an?\s+)?(?:whole\s+|complete\s+|entire\s+)?new\s+system\b|\b(?:whole|complete|entire)\s+new\s+system\b|اعمل\s+نظام\s+جديد|انشي\s+سيستم|نظام.*كامل",
    )
    .expect("invalid new-system pattern")
});

/// Priority order: executive and system commands, schema enhancement and
/// creation, entity actions, leave, payroll, reports, generic queries, then
/// vague mentions that need clarification. First match wins.
pub static RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    use IntentKind::{
        Creation, EmployeeAction, Enhancement, ExecutiveCommand, GoalAction, LeaveAction,
        PayrollAction, PerformanceAction, Query, RecognitionAction, Report, SelfHeal, TaskAction,
    };
    vec![
        // Executive commands
        rule(
            ExecutiveCommand,
            "restart",
            r"(?i)\b(?:restart|reboot)\s+(?:the\s+)?(?:backend|server|api|service|app|application)\b",
            0.9,
        ),
        rule(
            ExecutiveCommand,
            "restart",
            r"(?:اعد|اعاده)\s+تشغيل\s+(?:ال)?(?:باك\s?اند|سيرفر|خادم|نظام)|ريستارت",
            0.9,
        ),
        rule(
            ExecutiveCommand,
            "deploy",
            r"(?i)^(?:please\s+)?deploy\b|^(?:انشر|نشر)\s+(?:ال)?(?:تحديثات|تعديلات|نسخه)",
            0.9,
        ),
        rule(
            ExecutiveCommand,
            "backup",
            r"(?i)\b(?:run|take|make|create)\s+(?:an?\s+)?(?:database\s+)?backup\b|^backup\b|نسخه\s+احتياطيه",
            0.9,
        ),
        rule(
            ExecutiveCommand,
            "status",
            r"(?i)\b(?:system|server|backend)\s+(?:status|health|info)\b|\bhealth\s*check\b|^status$|حاله\s+(?:ال)?(?:نظام|سيرفر|خادم)",
            0.9,
        ),
        rule(
            ExecutiveCommand,
            "logs",
            r"(?i)\b(?:show|view|tail|check)\s+(?:me\s+)?(?:the\s+)?(?:server\s+|backend\s+|error\s+)?logs\b|^logs$|(?:سجلات|لوج)\s+(?:ال)?(?:نظام|سيرفر|اخطاء)",
            0.9,
        ),
        rule(
            ExecutiveCommand,
            "git",
            r"(?i)\bgit\s+(?P<gitCommand>status|log|pull)\b",
            0.9,
        ),
        rule(
            SelfHeal,
            "diagnose",
            r"(?i)\b(?:fix|heal|repair|diagnose|troubleshoot)\s+(?:the\s+)?(?:system|server|backend|errors?|issues?|problems?)\b|(?:اصلح|صلح|عالج)\s+(?:ال)?(?:نظام|مشكله|مشاكل|اخطاء|سيرفر)",
            0.8,
        ),
        // Schema enhancement and new systems
        rule(
            Enhancement,
            "add_field",
            r"(?i)\badd\s+(?:an?\s+)?(?:new\s+)?(?:field|column|attribute)\b",
            0.8,
        ),
        rule(
            Enhancement,
            "leave_type",
            r"(?i)\b(?:add|create)\s+(?:an?\s+)?(?:new\s+)?leave\s+type\b|(?:اضف|ضيف)\s+نوع\s+اجازه|نوع\s+اجازه\s+جديد",
            0.8,
        ),
        rule(
            Enhancement,
            "modify_system",
            r"(?i)\b(?:modify|change|extend|enhance|customize)\s+(?:the\s+)?(?P<module>leave|attendance|payroll|employee|task)s?\s+(?:system|module)\b",
            0.8,
        ),
        rule(
            Enhancement,
            "add_to_system",
            r"(?i)\badd\s+.+\s+to\s+(?:the\s+)?(?P<module>\p{L}+)\s+(?:system|module)\b",
            0.8,
        ),
        rule(
            Enhancement,
            "add_to_system",
            r"^(?:ضيف|اضف)\s+(?:ل|الي\s+|علي\s+)(?:ال)?(?:نظام|سيستم|موديول)",
            0.8,
        ),
        rule(
            Enhancement,
            "modify_system",
            r"(?:عدل|طور)\s+(?:ال)?(?:نظام|سيستم|موديول)",
            0.8,
        ),
        rule(
            Creation,
            "new_system",
            r"(?i)\b(?:create|build|make|generate)\s+(?:an?\s+)?(?:new\s+)?(?:(?P<module>\p{L}+)\s+)?(?:system|module)\b|^(?:اعمل|انشي|انشاء|سوي)\s+(?:ال)?(?:نظام|سيستم|موديول)",
            0.8,
        ),
        // Employees
        rule(
            EmployeeAction,
            "add",
            r"(?i)\b(?:add|hire|create|onboard|register)\s+(?:an?\s+)?(?:new\s+)?employee\b(?:\s+(?:named|called)\s+(?P<firstName>\p{L}+)(?:\s+(?P<lastName>\p{L}+))?)?(?:.*?(?P<email>[\w.+-]+@[\w-]+(?:\.[\w-]+)+))?",
            0.85,
        ),
        rule(
            EmployeeAction,
            "add",
            r"(?:اضف|ضيف|سجل)\s+موظف(?:\s+جديد)?(?:\s+(?:اسمه|باسم)\s+(?P<firstName>\p{L}+)(?:\s+(?P<lastName>\p{L}+))?)?",
            0.85,
        ),
        rule(
            EmployeeAction,
            "delete",
            r"(?i)\b(?:delete|remove|terminate|fire)\s+(?:the\s+)?employee(?:\s+(?P<employeeName>\p{L}+(?:\s+\p{L}+)?))?",
            0.85,
        ),
        rule(
            EmployeeAction,
            "delete",
            r"(?:احذف|امسح|شيل)\s+(?:ال)?موظف(?:\s+(?P<employeeName>\p{L}+(?:\s+\p{L}+)?))?",
            0.85,
        ),
        rule(
            EmployeeAction,
            "update",
            r"(?i)\b(?:update|change|modify|edit|set)\s+(?:the\s+)?(?P<field>salary|department|position|title|phone|email|manager)\s+(?:of|for)\s+(?P<employeeName>\p{L}+)(?:\s+to\s+(?P<value>.+))?",
            0.85,
        ),
        rule(
            EmployeeAction,
            "update",
            r"(?i)\b(?:update|change|modify|edit|set)\s+(?P<employeeName>\p{L}+)(?:'s)?\s+(?P<field>salary|department|position|title|phone|email|manager)\b(?:\s+to\s+(?P<value>.+))?",
            0.85,
        ),
        rule(
            EmployeeAction,
            "update",
            r"(?:عدل|غير|حدث)\s+(?P<field>راتب|قسم|وظيفه|جوال|ايميل)\s+(?:ال)?(?:موظف\s+)?(?P<employeeName>\p{L}+)(?:\s+(?:الي|ل)\s*(?P<value>\S+))?",
            0.85,
        ),
        rule(
            EmployeeAction,
            "list",
            r"(?i)\b(?:list|show|display)\s+(?:me\s+)?(?:all\s+)?(?:the\s+)?employees\b(?:\s+in\s+(?:the\s+)?(?P<department>\p{L}+))?|(?:اعرض|عرض)\s+(?:كل\s+)?(?:ال)?موظفين",
            0.85,
        ),
        rule(
            EmployeeAction,
            "search",
            r"(?i)\b(?:find|search\s+for|look\s+up)\s+(?:an?\s+)?(?:the\s+)?employee\s+(?:named\s+)?(?P<query>\p{L}+)",
            0.85,
        ),
        rule(
            EmployeeAction,
            "search",
            r"(?:ابحث\s+عن|دور\s+علي)\s+(?:ال)?موظف\s+(?P<query>\p{L}+)",
            0.85,
        ),
        // Tasks
        rule(
            TaskAction,
            "create",
            r"(?i)\b(?:create|add|assign)\s+(?:an?\s+)?(?:new\s+)?task\b(?:\s+(?:to|for)\s+(?P<assigneeName>\p{L}+))?(?:\s*[:\-]\s*(?P<title>.+))?",
            0.8,
        ),
        rule(
            TaskAction,
            "create",
            r"(?:اضف|انشي|اعمل)\s+مهمه(?:\s+(?:ل|الي)\s*(?P<assigneeName>\p{L}+))?(?:\s*[:\-]\s*(?P<title>.+))?",
            0.8,
        ),
        rule(
            TaskAction,
            "list",
            r"(?i)\b(?:show|list|view)\s+(?:me\s+)?(?:my\s+)?(?:open\s+|pending\s+)?tasks\b|\bmy\s+tasks\b|مهامي|(?:اعرض|عرض)\s+(?:ال)?مهام",
            0.8,
        ),
        rule(
            TaskAction,
            "complete",
            r"(?i)\b(?:complete|finish|close)\s+(?:the\s+)?task\b(?:\s*[:\-]?\s*(?P<taskTitle>.+))?",
            0.8,
        ),
        rule(
            TaskAction,
            "complete",
            r"(?:انهي|اكمل|قفل)\s+(?:ال)?مهمه(?:\s+(?P<taskTitle>.+))?",
            0.8,
        ),
        // Goals
        rule(
            GoalAction,
            "create",
            r"(?i)\b(?:set|create|add)\s+(?:an?\s+)?(?:new\s+)?goal\b(?:\s+for\s+(?P<ownerName>\p{L}+))?(?:\s*[:\-]\s*(?P<title>.+))?",
            0.8,
        ),
        rule(
            GoalAction,
            "create",
            r"(?:اضف|انشي|حدد)\s+هدف(?:\s+(?:ل|الي)\s*(?P<ownerName>\p{L}+))?(?:\s*[:\-]\s*(?P<title>.+))?",
            0.8,
        ),
        rule(
            GoalAction,
            "update_progress",
            r"(?i)\b(?:goal|objective|okr)\b.*?(?P<progress>\d{1,3})\s*%",
            0.8,
        ),
        rule(
            GoalAction,
            "update_progress",
            r"(?:هدف|تقدم).*?(?P<progress>\d{1,3})\s*%",
            0.8,
        ),
        rule(
            GoalAction,
            "list",
            r"(?i)\b(?:my|show|list|team)\s+(?:my\s+)?(?:team\s+)?goals\b|اهدافي|(?:اعرض|عرض)\s+(?:ال)?اهداف",
            0.8,
        ),
        // Performance and recognition
        rule(
            PerformanceAction,
            "review",
            r"(?i)\b(?:create|start|write|add|open)\s+(?:an?\s+)?(?:performance\s+)?(?:review|evaluation|appraisal)\s+for\s+(?P<employeeName>\p{L}+)",
            0.8,
        ),
        rule(
            PerformanceAction,
            "review",
            r"(?:انشي|اضف|اعمل|ابدا)\s+تقييم\s+(?:اداء\s+)?(?:ل|الي)\s*(?:ال)?(?:موظف\s+)?(?P<employeeName>\p{L}+)",
            0.8,
        ),
        rule(
            RecognitionAction,
            "give",
            r"(?i)\b(?:send|give)\s+(?:an?\s+)?(?:recognition|kudos|shout-?out|appreciation)\s+to\s+(?P<employeeName>\p{L}+)(?:\s+for\s+(?P<reason>.+))?",
            0.8,
        ),
        rule(
            RecognitionAction,
            "give",
            r"(?i)\b(?:recognize|appreciate)\s+(?P<employeeName>\p{L}+)\s+for\s+(?P<reason>.+)",
            0.8,
        ),
        rule(
            RecognitionAction,
            "give",
            r"(?:ارسل|اعط)\s+(?:شكر|تقدير|شهاده\s+تقدير)\s+(?:ل|الي)\s*(?P<employeeName>\p{L}+)",
            0.8,
        ),
        // Leave workflow
        rule(
            LeaveAction,
            "balance",
            r"(?i)\b(?:leave|vacation|pto)\s+balance\b|\bhow\s+many\s+(?:leave\s+|vacation\s+)?days\s+(?:do\s+i\s+have|(?:are\s+)?left)\b|رصيد\s+(?:ال)?اجاز",
            0.85,
        ),
        rule(
            LeaveAction,
            "approve",
            r"(?i)\b(?:approve|accept)\s+(?:the\s+)?(?:leave|vacation|time\s+off)(?:\s+request)?(?:\s+(?:of|for|from)\s+(?P<employeeName>\p{L}+))?",
            0.85,
        ),
        rule(
            LeaveAction,
            "approve",
            r"(?i)\b(?:approve|accept)\s+(?P<employeeName>\p{L}+)'s\s+(?:leave|vacation)",
            0.85,
        ),
        rule(
            LeaveAction,
            "approve",
            r"(?:وافق|اقبل|اعتمد)\s+(?:علي\s+)?(?:طلب\s+)?(?:ال)?اجازه(?:\s+(?:ال)?(?:موظف\s+)?(?P<employeeName>\p{L}+))?",
            0.85,
        ),
        rule(
            LeaveAction,
            "reject",
            r"(?i)\b(?:reject|deny|decline)\s+(?:the\s+)?(?:leave|vacation|time\s+off)(?:\s+request)?(?:\s+(?:of|for|from)\s+(?P<employeeName>\p{L}+))?",
            0.85,
        ),
        rule(
            LeaveAction,
            "reject",
            r"(?:ارفض|رفض)\s+(?:طلب\s+)?(?:ال)?اجازه(?:\s+(?:ال)?(?:موظف\s+)?(?P<employeeName>\p{L}+))?",
            0.85,
        ),
        rule(
            LeaveAction,
            "list",
            r"(?i)\b(?:pending|my|show|list)\s+(?:my\s+)?(?:pending\s+)?leave\s+requests\b|طلبات\s+(?:ال)?اجاز",
            0.85,
        ),
        rule(
            LeaveAction,
            "create",
            r"(?i)\b(?:request|apply\s+for|book|take|need|want)\s+(?:an?\s+)?(?:(?P<leaveType>annual|sick|emergency|unpaid|casual|maternity)\s+)?(?:leave|vacation|days?\s+off|time\s+off)\b(?:.*?\b(?P<days>\d+)\s*days?)?(?:.*?\b(?:from|starting|on)\s+(?P<startDate>\d{4}-\d{2}-\d{2}))?",
            0.85,
        ),
        rule(
            LeaveAction,
            "create",
            r"(?i)\b(?:request|take|need|want)\s+(?P<days>\d+)\s+days?\s+(?:of\s+)?(?:(?P<leaveType>annual|sick|emergency|unpaid|casual|maternity)\s+)?(?:leave|vacation|off)\b(?:.*?\b(?:from|starting|on)\s+(?P<startDate>\d{4}-\d{2}-\d{2}))?",
            0.85,
        ),
        rule(
            LeaveAction,
            "create",
            r"اجازه\s+(?:(?P<leaveType>سنويه|مرضيه|طاريه|اضطراريه)\s+)?(?:(?:لمده|من|ل)\s*)?(?P<days>\d+)",
            0.85,
        ),
        // Payroll workflow
        rule(
            PayrollAction,
            "payslip",
            r"(?i)\b(?:payslip|pay\s+slip|salary\s+slip|pay\s+stub)\b|(?:كشف|قسيمه)\s+(?:ال)?راتب",
            0.85,
        ),
        rule(
            PayrollAction,
            "approve",
            r"(?i)\b(?:approve|finali[sz]e)\s+(?:the\s+)?payroll\b(?:\s+for\s+(?P<month>\p{L}+|\d{1,2})(?:\s+(?P<year>\d{4}))?)?|(?:اعتمد|وافق\s+علي)\s+(?:ال)?(?:رواتب|مسير)",
            0.85,
        ),
        rule(
            PayrollAction,
            "calculate",
            r"(?i)\b(?:calculate|run|process|compute)\s+(?:the\s+)?(?:payroll|salaries)\b(?:\s+for\s+(?P<month>\p{L}+|\d{1,2})(?:\s+(?P<year>\d{4}))?)?",
            0.85,
        ),
        rule(
            PayrollAction,
            "calculate",
            r"(?:احسب|حساب)\s+(?:ال)?رواتب(?:\s+(?:شهر\s+)?(?P<month>\p{L}+|\d{1,2})(?:\s+(?P<year>\d{4}))?)?",
            0.85,
        ),
        rule(
            PayrollAction,
            "view",
            r"(?i)\b(?:show|view|display)\s+(?:the\s+)?payroll\b|\bpayroll\s+(?:status|summary)\b|مسير\s+(?:ال)?رواتب",
            0.85,
        ),
        // Reports
        rule(
            Report,
            "attendance",
            r"(?i)\battendance\s+(?:report|summary|stats|statistics)\b|تقرير\s+(?:ال)?حضور",
            0.75,
        ),
        rule(
            Report,
            "leaves",
            r"(?i)\bleave\s+(?:report|stats|statistics)\b|(?:تقرير|احصاييات)\s+(?:ال)?اجازات",
            0.75,
        ),
        rule(
            Report,
            "payroll",
            r"(?i)\b(?:payroll|salary)\s+report\b|تقرير\s+(?:ال)?رواتب",
            0.75,
        ),
        rule(
            Report,
            "employees",
            r"(?i)\b(?:employee|headcount|department)\s+report\b|تقرير\s+(?:ال)?(?:موظفين|اقسام)",
            0.75,
        ),
        rule(
            Report,
            "general",
            r"(?i)\b(?:report|dashboard|statistics|stats|overview)\b|تقرير|احصاييات|ملخص",
            0.75,
        ),
        // Generic queries
        rule(
            Query,
            "late",
            r"(?i)\bwho\s+(?:is|was|were|are)\s+late\b|\blate\s+employees\b|(?:مين|من)\s+(?:ال)?(?:متاخر|اتاخر)",
            0.7,
        ),
        rule(
            Query,
            "count",
            r"(?i)\bhow\s+many\s+(?P<entity>employees|staff|departments|tasks|people)\b(?:.*?\b(?P<filter>late|absent|on\s+leave|active)\b)?",
            0.7,
        ),
        rule(
            Query,
            "count",
            r"(?:كم|عدد)\s+(?:ال)?(?P<entity>موظفين|موظف|متاخرين|غايبين|مهام|اقسام)",
            0.7,
        ),
        rule(
            Query,
            "lookup",
            r"(?i)^(?:show|list|display|what|who|which|when|where|how)\b|^(?:اعرض|عرض|ما|ماذا|مين|متي|كيف|هل)\s",
            0.65,
        ),
        // Mentions without enough detail
        rule(
            LeaveAction,
            "create",
            r"(?i)\b(?:leave|vacation|day\s+off|time\s+off)\b|اجازه",
            VAGUE,
        ),
        rule(
            PayrollAction,
            "calculate",
            r"(?i)\b(?:payroll|salaries)\b|رواتب",
            VAGUE,
        ),
        rule(
            PerformanceAction,
            "review",
            r"(?i)\b(?:performance|evaluation|appraisal)\b|تقييم",
            VAGUE,
        ),
        rule(
            GoalAction,
            "create",
            r"(?i)\b(?:goal|okr|objective)s?\b|هدف",
            VAGUE,
        ),
        rule(
            RecognitionAction,
            "give",
            r"(?i)\b(?:recognition|kudos)\b|تقدير",
            VAGUE,
        ),
        rule(
            EmployeeAction,
            "search",
            r"(?i)\bemployee\b|موظف",
            VAGUE,
        ),
        rule(
            Enhancement,
            "modify_system",
            r"(?i)\b(?:system|module)\b|نظام|سيستم",
            VAGUE,
        ),
    ]
});
