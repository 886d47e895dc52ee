//! Upstream model dialects against a mock HTTP server.

use serde_json::json;
use tally_daemon::config::{LlmConfig, LlmKind};
use tally_daemon::{HttpLanguageModel, LanguageModel};
use tally_types::ChatMessage;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model(kind: LlmKind, endpoint: String, api_key: &str) -> HttpLanguageModel {
    HttpLanguageModel::new(LlmConfig {
        kind,
        endpoint,
        model: "llama3.1:8b".to_string(),
        api_key: api_key.to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn ollama_prompt_uses_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "llama3.1:8b", "prompt": "hi", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "hello"})))
        .expect(1)
        .mount(&server)
        .await;

    let reply = model(LlmKind::Ollama, server.uri(), "").prompt("hi").await.unwrap();
    assert_eq!(reply, "hello");
}

#[tokio::test]
async fn ollama_chat_returns_message_content_or_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"messages": [{"role": "user", "content": "q"}]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": {"role": "assistant", "content": "a"}})),
        )
        .mount(&server)
        .await;

    let llm = model(LlmKind::Ollama, server.uri(), "");
    let reply = llm.chat(&[ChatMessage::user("q")]).await.unwrap();
    assert_eq!(reply, "a");

    let empty = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
        .mount(&empty)
        .await;

    let reply = model(LlmKind::Ollama, empty.uri(), "")
        .chat(&[ChatMessage::user("q")])
        .await
        .unwrap();
    assert_eq!(reply, "");
}

#[tokio::test]
async fn openai_dialect_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "done"}}]
        })))
        .mount(&server)
        .await;

    let llm = model(
        LlmKind::OpenAi,
        format!("{}/v1/chat/completions", server.uri()),
        "sk-test",
    );
    assert_eq!(llm.prompt("go").await.unwrap(), "done");
}

#[tokio::test]
async fn upstream_failure_is_reported_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = model(LlmKind::Ollama, server.uri(), "")
        .prompt("hi")
        .await
        .unwrap_err();
    assert!(err.0.starts_with("ollama error 500"));
    assert!(err.0.contains("model not loaded"));
}
