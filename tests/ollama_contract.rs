//! Ollama HTTP contract tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use lucy::config::OllamaConfig;
use lucy::llm::{ChatOptions, LlmError, LlmProvider, Message, OllamaProvider, ToolDefinition};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> OllamaProvider {
    let config = OllamaConfig {
        host: server.uri(),
        model: "test-model".into(),
        timeout_secs: 5,
    };
    OllamaProvider::new(&config)
        .unwrap()
        .with_tools(vec![ToolDefinition::positional(
            "remember",
            "Guarda un hecho",
            &["key", "value"],
        )])
}

fn chat_reply(message: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "test-model",
        "message": message,
        "done": true,
    }))
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    serde_json::from_slice(&requests.last().unwrap().body).unwrap()
}

#[tokio::test]
async fn chat_sends_non_streaming_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "stream": false,
            "messages": [
                {"role": "system", "content": "sé breve"},
                {"role": "user", "content": "hola"},
            ],
        })))
        .respond_with(chat_reply(json!({"role": "assistant", "content": "¡Hola!"})))
        .expect(1)
        .mount(&server)
        .await;

    let reply = provider(&server)
        .chat(
            &[Message::system("sé breve"), Message::user("hola")],
            &ChatOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(reply.text, "¡Hola!");
    assert_eq!(reply.model.as_deref(), Some("test-model"));
    assert!(last_body(&server).await.get("tools").is_none());
}

#[tokio::test]
async fn tools_are_offered_only_when_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(chat_reply(json!({"role": "assistant", "content": "ok"})))
        .mount(&server)
        .await;

    let llm = provider(&server);
    let options = ChatOptions::new()
        .with_tools(true)
        .with_model(Some("otro-modelo"));
    llm.chat(&[Message::user("hola")], &options).await.unwrap();

    let body = last_body(&server).await;
    assert_eq!(body["model"], "otro-modelo");
    let tools = body["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["type"], "function");
    assert_eq!(tools[0]["function"]["name"], "remember");
    assert_eq!(
        tools[0]["function"]["parameters"]["required"],
        json!(["key", "value"])
    );
}

#[tokio::test]
async fn native_tool_calls_are_rendered_as_invocations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(chat_reply(json!({
            "role": "assistant",
            "content": "Lo anoto.",
            "tool_calls": [
                {"function": {"name": "remember", "arguments": {"value": "Ana", "key": "nombre"}}}
            ],
        })))
        .mount(&server)
        .await;

    let reply = provider(&server)
        .chat(&[Message::user("me llamo Ana")], &ChatOptions::new().with_tools(true))
        .await
        .unwrap();
    assert_eq!(reply.text, "Lo anoto.\n[[remember(\"nombre\", \"Ana\")]]");
}

#[tokio::test]
async fn server_errors_are_retryable_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "model crashed"})))
        .mount(&server)
        .await;

    let err = provider(&server)
        .chat(&[Message::user("hola")], &ChatOptions::new())
        .await
        .unwrap_err();
    match &err {
        LlmError::Status { status, message } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "model crashed");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_retryable());
    assert!(!err.is_connectivity());
}

#[tokio::test]
async fn missing_model_is_final() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"})))
        .mount(&server)
        .await;

    let err = provider(&server)
        .chat(&[Message::user("hola")], &ChatOptions::new())
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn refused_connection_is_connectivity_error() {
    // Bind then release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let config = OllamaConfig {
        host: format!("http://127.0.0.1:{port}"),
        model: "test-model".into(),
        timeout_secs: 5,
    };
    let llm = OllamaProvider::new(&config).unwrap();

    let err = llm
        .chat(&[Message::user("hola")], &ChatOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Connection(_)), "{err}");
    assert!(err.is_connectivity());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn generate_uses_prompt_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "prompt": "decí hola",
            "stream": false,
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"model": "test-model", "response": "hola", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reply = provider(&server)
        .generate("decí hola", &ChatOptions::new())
        .await
        .unwrap();
    assert_eq!(reply.text, "hola");
}

#[tokio::test]
async fn list_models_reads_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "gpt-oss:20b"}, {"name": "llama3:8b"}]
        })))
        .mount(&server)
        .await;

    let models = provider(&server).list_models().await.unwrap();
    assert_eq!(models, vec!["gpt-oss:20b", "llama3:8b"]);
}
