use super::{IntentHandler, Reply, Turn};
use crate::errors::ParleyError;
use crate::router::intent::{IntentKind, clarification_prompt, clarification_suggestions};
use crate::tools::backend::UNAVAILABLE_MESSAGE;
use crate::tools::base::ToolErrorKind;
use crate::tools::registry::ToolRegistry;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// The catalog tool serving `(intent, sub)`, if any.
pub fn tool_for(intent: IntentKind, sub: Option<&str>) -> Option<&'static str> {
    let sub = sub?;
    let tool = match (intent, sub) {
        (IntentKind::EmployeeAction, "add") => "create_employee",
        (IntentKind::EmployeeAction, "update") => "update_employee",
        (IntentKind::EmployeeAction, "delete") => "delete_employee",
        (IntentKind::EmployeeAction, "list") => "list_employees",
        (IntentKind::EmployeeAction, "search") => "employee_search",
        (IntentKind::TaskAction, "create") => "create_task",
        (IntentKind::TaskAction, "list") => "list_my_tasks",
        (IntentKind::TaskAction, "complete") => "complete_task",
        (IntentKind::GoalAction, "create") => "create_goal",
        (IntentKind::GoalAction, "update_progress") => "update_goal_progress",
        (IntentKind::GoalAction, "list") => "list_goals",
        (IntentKind::PerformanceAction, "review") => "create_performance_review",
        (IntentKind::RecognitionAction, "give") => "send_recognition",
        (IntentKind::LeaveAction, "create") => "create_leave_request",
        (IntentKind::LeaveAction, "approve") => "approve_leave",
        (IntentKind::LeaveAction, "reject") => "reject_leave",
        (IntentKind::LeaveAction, "balance") => "get_leave_balance",
        (IntentKind::LeaveAction, "list") => "list_leave_requests",
        (IntentKind::PayrollAction, "calculate") => "calculate_payroll",
        (IntentKind::PayrollAction, "approve") => "approve_payroll",
        (IntentKind::PayrollAction, "payslip") => "get_payslip",
        (IntentKind::PayrollAction, "view") => "payroll_status",
        (IntentKind::Report, "attendance") => "attendance_report",
        (IntentKind::Report, "leaves") => "leave_statistics",
        (IntentKind::Report, "payroll") => "payroll_report",
        (IntentKind::Report, "employees") => "department_report",
        (IntentKind::Report, "general") => "dashboard_summary",
        (IntentKind::Query, "count") => "query_count",
        (IntentKind::Query, "late") => "late_employees",
        _ => return None,
    };
    Some(tool)
}

/// Dispatches entity, workflow, report and query intents to catalog tools.
/// Extracted entities become tool parameters; intents with no tool (free
/// lookups) go to `fallback`.
pub struct ToolRouteHandler {
    registry: Arc<ToolRegistry>,
    fallback: Arc<dyn IntentHandler>,
}

impl ToolRouteHandler {
    pub fn new(registry: Arc<ToolRegistry>, fallback: Arc<dyn IntentHandler>) -> Self {
        Self { registry, fallback }
    }
}

#[async_trait]
impl IntentHandler for ToolRouteHandler {
    async fn handle(&self, turn: &Turn<'_>) -> Result<Reply, ParleyError> {
        let intent = turn.intent;
        let Some(tool) = tool_for(intent.intent, intent.sub_intent) else {
            debug!(
                "[{}] no tool for {}/{}, using {}",
                turn.caller.request_id,
                intent.intent,
                intent.sub_intent.unwrap_or("-"),
                self.fallback.name()
            );
            return self.fallback.handle(turn).await;
        };

        let params: Map<String, Value> = intent
            .entities
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let result = self
            .registry
            .dispatch(tool, Value::Object(params), turn.caller)
            .await;

        match result.error {
            None if result.success => Ok(Reply::text(result.message)),
            None => Ok(Reply::rejected(result.message)),
            Some(ToolErrorKind::InvalidParams) => Ok(Reply::clarify(
                clarification_prompt(intent.intent, turn.arabic),
                clarification_suggestions(intent.intent, turn.arabic),
            )),
            Some(ToolErrorKind::Forbidden) => Ok(Reply::denied()),
            Some(ToolErrorKind::Unavailable | ToolErrorKind::UnknownTool) => {
                Ok(Reply::rejected(UNAVAILABLE_MESSAGE))
            }
            Some(ToolErrorKind::HandlerFailed | ToolErrorKind::Timeout) => Err(ParleyError::Tool {
                tool: tool.to_string(),
                message: result.message,
            }),
        }
    }

    fn name(&self) -> &str {
        "tools"
    }
}
