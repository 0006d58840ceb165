use super::*;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> GeminiProvider {
    GeminiProvider::with_base_url(
        "test_key".to_string(),
        "gemini-2.0-flash".to_string(),
        server.uri(),
    )
}

#[tokio::test]
async fn test_generate_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "Hello! "}, {"text": "How can I help?"}],
                    "role": "model"
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 15}
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let text = provider.generate("Hi", None).await.unwrap();

    assert_eq!(text, "Hello! How can I help?");
    let metrics = provider.metrics();
    assert_eq!(metrics.request_count, 1);
    assert_eq!(metrics.token_count, 15);
}

#[tokio::test]
async fn test_generate_sends_system_instruction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": "You are an HR assistant."}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = provider(&server)
        .generate("Hi", Some("You are an HR assistant."))
        .await
        .unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn test_generate_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let err = provider.generate("Hi", None).await.unwrap_err();
    assert!(matches!(err, ParleyError::Auth(_)));
    assert!(!err.is_retryable());
    assert_eq!(provider.metrics().error_count, 1);
}

#[tokio::test]
async fn test_generate_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = provider(&server).generate("Hi", None).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_generate_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = provider(&server).generate("Hi", None).await.unwrap_err();
    assert!(matches!(err, ParleyError::RateLimit { retry_after: Some(7) }));
}

#[tokio::test]
async fn test_generate_blocked_response_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
        })))
        .mount(&server)
        .await;

    let err = provider(&server).generate("Hi", None).await.unwrap_err();
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn test_generate_connection_refused_is_retryable() {
    let provider = GeminiProvider::with_base_url(
        "k".to_string(),
        "m".to_string(),
        "http://127.0.0.1:1".to_string(),
    );
    let err = provider.generate("Hi", None).await.unwrap_err();
    assert!(err.is_retryable());
}

#[test]
fn test_from_config_uses_base_url_override() {
    let config = GeminiConfig {
        api_key: "k".into(),
        model: "gemini-test".into(),
        base_url: Some("http://localhost:9999/".into()),
    };
    let provider = GeminiProvider::from_config(&config);
    assert_eq!(provider.base_url, "http://localhost:9999");
    assert_eq!(provider.model(), "gemini-test");
}
