//! End-to-end chat route test against a stubbed Gemini endpoint

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use parla_models::UiStreamEvent;
use parla_server::{
    api::state::ChatContext,
    build_router,
    config::{DEFAULT_SYSTEM_PROMPT, ServerConfig},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gemini_sse(events: &[Value]) -> String {
    events.iter().map(|e| format!("data: {e}\r\n\r\n")).collect()
}

async fn post_chat(config: &ServerConfig, body: Value) -> Vec<String> {
    let app = build_router(Arc::new(ChatContext::from_config(config)));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

fn config_for(server: &MockServer, api_key: Option<&str>) -> ServerConfig {
    ServerConfig {
        google_api_key: api_key.map(str::to_string),
        google_base_url: Some(server.uri()),
        bypass_system_proxy: true,
        ..ServerConfig::default()
    }
}

fn request_body() -> Value {
    json!({
        "id": "chat-1",
        "messages": [
            {"id": "u1", "role": "user", "parts": [{"type": "text", "text": "Ciao"}]}
        ],
        "temperature": 0.7,
        "maxOutputTokens": 10000,
        "model": "gemini-2.5-flash"
    })
}

#[tokio::test]
async fn test_gemini_reply_is_relayed_as_ui_message_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
        .and(header_eq("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Ciao"}]}],
            "systemInstruction": {"parts": [{"text": DEFAULT_SYSTEM_PROMPT}]},
            "generationConfig": {"maxOutputTokens": 10000}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            gemini_sse(&[
                json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Cia"}]}}]}),
                json!({
                    "candidates": [{"content": {"role": "model", "parts": [{"text": "o!"}]}, "finishReason": "STOP"}],
                    "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
                }),
            ]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let payloads = post_chat(&config_for(&server, Some("test-key")), request_body()).await;

    assert_eq!(payloads.last().map(String::as_str), Some("[DONE]"));
    let events: Vec<UiStreamEvent> = payloads[..payloads.len() - 1]
        .iter()
        .map(|p| serde_json::from_str(p).unwrap())
        .collect();

    let text: String = events
        .iter()
        .filter_map(|event| match event {
            UiStreamEvent::TextDelta { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Ciao!");

    let finish: Value = serde_json::from_str(&payloads[payloads.len() - 2]).unwrap();
    assert_eq!(finish["type"], "finish");
    assert_eq!(finish["messageMetadata"]["totalUsage"]["totalTokens"], 15);
}

#[tokio::test]
async fn test_provider_failure_becomes_error_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Resource exhausted", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let payloads = post_chat(&config_for(&server, Some("test-key")), request_body()).await;

    let error: Value = serde_json::from_str(&payloads[payloads.len() - 2]).unwrap();
    assert_eq!(error["type"], "error");
    assert!(
        error["errorText"]
            .as_str()
            .unwrap()
            .contains("Resource exhausted")
    );
    assert!(!payloads.iter().any(|p| p.contains("\"type\":\"finish\"")));
}

#[tokio::test]
async fn test_missing_api_key_fails_without_calling_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let payloads = post_chat(&config_for(&server, None), request_body()).await;

    let error: Value = serde_json::from_str(&payloads[payloads.len() - 2]).unwrap();
    assert_eq!(error["errorText"], "Missing API key for Google Generative AI");
}
