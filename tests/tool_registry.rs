mod common;

use common::{MockGenerator, RecordingTools, no_retry, test_config};
use parley::ChatRouter;
use parley::resilience::{BreakerSettings, CircuitRegistry, RetryExecutor};
use parley::router::permissions::{PermissionGate, Role};
use parley::session::MemorySessionStore;
use parley::tools::backend::UNAVAILABLE_MESSAGE;
use parley::tools::{CallerContext, ToolErrorKind, ToolHandler, ToolRegistry, build_registry};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn caller(role: Role) -> CallerContext {
    CallerContext {
        user_id: "u1".into(),
        tenant_id: "acme".into(),
        role,
        display_name: "Mona".into(),
        request_id: "req-42".into(),
    }
}

fn catalog_registry(tools: Arc<RecordingTools>) -> ToolRegistry {
    let config = test_config();
    let gate = Arc::new(PermissionGate::new(&config.permissions));
    let retry = RetryExecutor::new(Arc::new(CircuitRegistry::new(BreakerSettings::from(
        &config.resilience,
    ))));
    let handler: Arc<dyn ToolHandler> = tools;
    build_registry(&config, gate, retry, &handler).unwrap()
}

// ===========================================================================
// Registry against the built-in catalog
// ===========================================================================

#[tokio::test]
async fn test_catalog_dispatch_passes_validated_params() {
    let tools = RecordingTools::new();
    let registry = catalog_registry(tools.clone());

    let result = registry
        .dispatch(
            "create_employee",
            json!({"firstName": "Omar", "lastName": "Haddad", "department": "Sales"}),
            &caller(Role::Hr),
        )
        .await;

    assert!(result.success, "{:?}", result);
    let calls = tools.calls.lock().unwrap();
    assert_eq!(calls[0].tool, "create_employee");
    assert_eq!(calls[0].params["firstName"], json!("Omar"));
    assert_eq!(calls[0].params["department"], json!("Sales"));
}

#[tokio::test]
async fn test_missing_required_param_is_invalid() {
    let tools = RecordingTools::new();
    let registry = catalog_registry(tools.clone());

    let result = registry
        .dispatch("create_employee", json!({"firstName": "Omar"}), &caller(Role::Hr))
        .await;

    assert!(!result.success);
    assert_eq!(result.error, Some(ToolErrorKind::InvalidParams));
    assert!(result.message.contains("lastName"), "{}", result.message);
    assert!(tools.tools_called().is_empty());
}

#[tokio::test]
async fn test_tool_roles_are_enforced() {
    let tools = RecordingTools::new();
    let registry = catalog_registry(tools.clone());

    let result = registry
        .dispatch(
            "create_employee",
            json!({"firstName": "Omar", "lastName": "Haddad"}),
            &caller(Role::Employee),
        )
        .await;

    assert_eq!(result.error, Some(ToolErrorKind::Forbidden));
    assert!(tools.tools_called().is_empty());

    // The super role passes any role list
    let result = registry
        .dispatch(
            "create_employee",
            json!({"firstName": "Omar", "lastName": "Haddad"}),
            &caller(Role::SuperAdmin),
        )
        .await;
    assert!(result.success);
}

#[tokio::test]
async fn test_unknown_tool() {
    let registry = catalog_registry(RecordingTools::new());
    let result = registry
        .dispatch("launch_rocket", json!({}), &caller(Role::Admin))
        .await;
    assert_eq!(result.error, Some(ToolErrorKind::UnknownTool));
}

#[test]
fn test_definitions_follow_role() {
    let registry = catalog_registry(RecordingTools::new());

    let employee: Vec<&str> = registry
        .definitions_for(&Role::Employee)
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert!(employee.contains(&"list_my_tasks"));
    assert!(!employee.contains(&"create_employee"));
    assert!(!employee.contains(&"calculate_payroll"));

    let everything = registry.definitions_for(&Role::SuperAdmin);
    assert_eq!(everything.len(), registry.len());

    assert!(registry.definitions_for(&Role::Other("VISITOR".into())).is_empty());
}

// ===========================================================================
// Router through an HTTP tool backend
// ===========================================================================

fn backend_router(url: &str) -> ChatRouter {
    let mut config = test_config();
    config.tools.backend_url = Some(url.to_string());
    config.resilience.tools = no_retry(2000);
    ChatRouter::builder(&config)
        .provider(MockGenerator::replying("unused"))
        .session_store(Arc::new(MemorySessionStore::new()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_router_calls_http_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/internal/tools"))
        .and(body_partial_json(json!({
            "tool": "list_my_tasks",
            "caller": {"userId": "emp", "tenantId": "acme", "role": "EMPLOYEE"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "You have 2 open tasks: Q3 budget, onboarding checklist"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let router = backend_router(&format!("{}/internal/tools", server.uri()));
    let reply = router.chat("emp", "acme", "my tasks").await;

    assert_eq!(
        reply.response,
        "You have 2 open tasks: Q3 budget, onboarding checklist"
    );
}

#[tokio::test]
async fn test_backend_business_failure_is_relayed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "No leave request from Omar is pending"
        })))
        .mount(&server)
        .await;

    let router = backend_router(&server.uri());
    let reply = router
        .chat("hr", "acme", "approve the leave request of Omar")
        .await;

    assert_eq!(reply.response, "No leave request from Omar is pending");
}

#[tokio::test]
async fn test_backend_outage_is_generic_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("database connection refused"))
        .expect(1)
        .mount(&server)
        .await;

    let router = backend_router(&server.uri());
    let reply = router.chat("emp", "acme", "my tasks").await;

    assert!(
        reply.response.starts_with("Sorry, I couldn't complete that request right now."),
        "{}",
        reply.response
    );
    assert!(!reply.response.contains("database"));
    assert!(reply.response.contains(&reply.request_id));
}

#[tokio::test]
async fn test_no_backend_reports_unavailable() {
    let mut config = test_config();
    config.tools.backend_url = None;
    let router = ChatRouter::builder(&config)
        .provider(MockGenerator::replying("unused"))
        .session_store(Arc::new(MemorySessionStore::new()))
        .build()
        .unwrap();

    let reply = router.chat("emp", "acme", "my tasks").await;
    assert_eq!(reply.response, UNAVAILABLE_MESSAGE);
}
