//! Ollama HTTP backend.
//!
//! Uses the non-streaming `/api/chat`, `/api/generate` and `/api/tags`
//! endpoints. Native tool calls returned by the server are rendered back
//! into `[[name(args)]]` text so the router handles both paths the same
//! way.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::error::LlmError;
use super::message::Message;
use super::provider::{ChatOptions, LlmProvider, LlmResponse, ToolDefinition};
use crate::config::OllamaConfig;

/// Ollama chat backend.
pub struct OllamaProvider {
    host: String,
    model: String,
    client: reqwest::Client,
    tools: Vec<ToolDefinition>,
}

impl std::fmt::Debug for OllamaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaProvider")
            .field("host", &self.host)
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: Option<ChatReplyMessage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: ToolCallFunction,
}

#[derive(Debug, Deserialize)]
struct ToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsReply {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if the host is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: &OllamaConfig) -> Result<Self, LlmError> {
        let host = config.host.trim_end_matches('/').to_owned();
        if host.is_empty() {
            return Err(LlmError::Config("ollama host is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("http client: {e}")))?;
        Ok(Self {
            host,
            model: config.model.clone(),
            client,
            tools: Vec::new(),
        })
    }

    /// Offer these definitions when a request enables tools.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    fn model_for<'a>(&'a self, options: &'a ChatOptions) -> &'a str {
        options.model.as_deref().unwrap_or(&self.model)
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<String, LlmError> {
        let url = format!("{}{endpoint}", self.host);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(endpoint, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::from_reqwest(endpoint, e))?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }
        Ok(text)
    }

    fn tools_payload(&self) -> Value {
        Value::Array(
            self.tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect(),
        )
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str, options: &ChatOptions) -> Result<LlmResponse, LlmError> {
        let body = json!({
            "model": self.model_for(options),
            "prompt": prompt,
            "stream": false,
        });
        let text = self.post_json("/api/generate", &body).await?;
        let reply: GenerateReply = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("generate: {e}")))?;
        Ok(LlmResponse {
            text: reply.response,
            model: reply.model,
        })
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<LlmResponse, LlmError> {
        let mut body = json!({
            "model": self.model_for(options),
            "messages": messages,
            "stream": false,
        });
        if options.enable_tools && !self.tools.is_empty() {
            body["tools"] = self.tools_payload();
        }

        tracing::debug!(
            model = self.model_for(options),
            messages = messages.len(),
            "ollama chat request"
        );
        let text = self.post_json("/api/chat", &body).await?;
        let reply: ChatReply = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("chat: {e}")))?;
        let message = reply
            .message
            .ok_or_else(|| LlmError::InvalidResponse("chat: missing message".into()))?;

        let mut out = message.content;
        for call in &message.tool_calls {
            let rendered = render_tool_call(&call.function.name, &call.function.arguments, &self.tools);
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&rendered);
        }

        Ok(LlmResponse {
            text: out,
            model: reply.model,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.host);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest("/api/tags", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: "list models".into(),
            });
        }
        let tags: TagsReply = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("tags: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.to_owned())
}

/// Render a native tool call as `[[name(args)]]`.
///
/// Arguments follow the definition's `required` order, then any remaining
/// keys in sorted order. Unknown tools keep sorted key order.
pub(crate) fn render_tool_call(name: &str, arguments: &Value, tools: &[ToolDefinition]) -> String {
    let args = match arguments {
        Value::Object(map) => {
            let order = tools
                .iter()
                .find(|t| t.name == name)
                .map(ToolDefinition::param_order)
                .unwrap_or_default();
            let mut keys: Vec<&String> = order.iter().filter(|k| map.contains_key(*k)).collect();
            let mut rest: Vec<&String> = map.keys().filter(|k| !order.contains(k)).collect();
            rest.sort();
            keys.extend(rest);
            keys.iter()
                .filter_map(|k| map.get(*k))
                .map(render_literal)
                .collect::<Vec<_>>()
                .join(", ")
        }
        // Some models send the arguments object as a JSON string.
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(inner @ Value::Object(_)) => return render_tool_call(name, &inner, tools),
            _ => render_literal(arguments),
        },
        Value::Null => String::new(),
        other => render_literal(other),
    };
    format!("[[{name}({args})]]")
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let escaped = s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
            format!("\"{escaped}\"")
        }
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::Null => "None".into(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(render_literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", render_literal(&Value::String(k.clone())), render_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn defs() -> Vec<ToolDefinition> {
        vec![ToolDefinition::positional(
            "remember",
            "Store a fact",
            &["key", "value"],
        )]
    }

    #[test]
    fn renders_args_in_required_order() {
        let args = json!({"value": "Ana", "key": "nombre"});
        assert_eq!(
            render_tool_call("remember", &args, &defs()),
            r#"[[remember("nombre", "Ana")]]"#
        );
    }

    #[test]
    fn unknown_tool_uses_sorted_keys() {
        let args = json!({"b": 2, "a": true});
        assert_eq!(render_tool_call("other", &args, &[]), "[[other(True, 2)]]");
    }

    #[test]
    fn string_arguments_are_decoded() {
        let args = Value::String(r#"{"key":"k","value":"v"}"#.into());
        assert_eq!(
            render_tool_call("remember", &args, &defs()),
            r#"[[remember("k", "v")]]"#
        );
    }

    #[test]
    fn quotes_are_escaped() {
        let args = json!({"key": "say \"hi\""});
        assert_eq!(
            render_tool_call("remember", &args, &defs()),
            r#"[[remember("say \"hi\"")]]"#
        );
    }

    #[test]
    fn null_arguments_render_empty() {
        assert_eq!(render_tool_call("get_info", &Value::Null, &[]), "[[get_info()]]");
    }

    #[test]
    fn empty_host_is_rejected() {
        let config = OllamaConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(matches!(OllamaProvider::new(&config), Err(LlmError::Config(_))));
    }

    #[test]
    fn error_message_prefers_json_error_field() {
        assert_eq!(extract_error_message(r#"{"error":"model not found"}"#), "model not found");
        assert_eq!(extract_error_message("plain"), "plain");
    }
}
