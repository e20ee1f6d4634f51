//! The backend contract shared by every language model provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::LlmError;
use super::message::Message;

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatOptions {
    /// Model override. `None` uses the provider's configured default.
    pub model: Option<String>,
    /// Offer native tool definitions to backends that support them.
    pub enable_tools: bool,
    /// Session user, used by backends that keep their own session state.
    pub user: Option<String>,
}

impl ChatOptions {
    /// Options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model override.
    pub fn with_model(mut self, model: Option<impl Into<String>>) -> Self {
        self.model = model.map(Into::into);
        self
    }

    /// Enable or disable native tool definitions.
    pub fn with_tools(mut self, enable: bool) -> Self {
        self.enable_tools = enable;
        self
    }

    /// Set the session user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// A completed backend response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmResponse {
    /// Response text, including any rendered tool invocations.
    pub text: String,
    /// The model that answered, when the backend reports it.
    pub model: Option<String>,
}

impl LlmResponse {
    /// A response carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }
}

/// A function definition offered to backends with native tool calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name as registered with the router.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema for the parameters. `required` lists parameters in
    /// positional order.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a definition whose parameters are all strings, in order.
    pub fn positional(
        name: impl Into<String>,
        description: impl Into<String>,
        params: &[&str],
    ) -> Self {
        let properties: serde_json::Map<String, serde_json::Value> = params
            .iter()
            .map(|p| ((*p).to_owned(), serde_json::json!({"type": "string"})))
            .collect();
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": params,
            }),
        }
    }

    /// Positional parameter names taken from `required`.
    pub fn param_order(&self) -> Vec<String> {
        self.parameters
            .get("required")
            .and_then(serde_json::Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A language model backend.
///
/// Implementations are stateless per call: every request carries the full
/// context it needs.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs and history records.
    fn name(&self) -> &str;

    /// Single-prompt completion.
    async fn generate(&self, prompt: &str, options: &ChatOptions) -> Result<LlmResponse, LlmError>;

    /// Chat completion over an ordered message list.
    async fn chat(&self, messages: &[Message], options: &ChatOptions)
    -> Result<LlmResponse, LlmError>;

    /// Models this backend can serve.
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_definition_lists_required_in_order() {
        let def = ToolDefinition::positional("remember", "Store a fact", &["key", "value"]);
        assert_eq!(def.param_order(), vec!["key", "value"]);
        assert_eq!(def.parameters["properties"]["key"]["type"], "string");
    }

    #[test]
    fn options_builder() {
        let opts = ChatOptions::new()
            .with_model(Some("llama3"))
            .with_tools(true)
            .with_user("u1");
        assert_eq!(opts.model.as_deref(), Some("llama3"));
        assert!(opts.enable_tools);
        assert_eq!(opts.user.as_deref(), Some("u1"));
    }

    #[test]
    fn options_model_none_clears() {
        let opts = ChatOptions::new().with_model(None::<String>);
        assert!(opts.model.is_none());
    }
}
