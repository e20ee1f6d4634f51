//! Agent CLI gateway backend.
//!
//! Each request runs the gateway binary once:
//! `{binary} agent --agent {id} --session-id {user} --message {prompt} --json --timeout {n}`.
//! The gateway keeps its own per-session memory, so only the latest user
//! message is forwarded.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::error::LlmError;
use super::message::{Message, Role};
use super::provider::{ChatOptions, LlmProvider, LlmResponse};
use crate::config::GatewayConfig;
use crate::exec::{ExecError, run_command};

/// Session id used when no user is known.
pub const ANONYMOUS_SESSION: &str = "lucy:anonymous";

/// Extra wall-clock time granted beyond the gateway's own timeout.
const SUBPROCESS_GRACE_SECS: u64 = 10;

static RESULT_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\n\n\[[^\]]+\]: ").ok());

/// Backend that shells out to an agent gateway CLI.
#[derive(Debug, Clone)]
pub struct GatewayProvider {
    config: GatewayConfig,
}

impl GatewayProvider {
    /// Create a gateway backend.
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Build the argument vector for one request.
    pub(crate) fn build_args(&self, prompt: &str, options: &ChatOptions) -> Vec<String> {
        // Names with ':' are model tags for other backends, not agent ids.
        let agent = options
            .model
            .as_deref()
            .filter(|m| !m.is_empty() && !m.contains(':'))
            .unwrap_or(&self.config.agent_id);
        let session = options.user.as_deref().unwrap_or(ANONYMOUS_SESSION);
        vec![
            "agent".into(),
            "--agent".into(),
            agent.to_owned(),
            "--session-id".into(),
            session.to_owned(),
            "--message".into(),
            prompt.to_owned(),
            "--json".into(),
            "--timeout".into(),
            self.config.timeout_secs.to_string(),
        ]
    }
}

/// Pull the reply text out of gateway stdout.
///
/// Looks at `result.payloads[0].text`, then `reply`, `message` and
/// `content`. Output that is not JSON is returned as-is.
pub(crate) fn extract_reply(stdout: &str) -> Result<String, LlmError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(LlmError::Gateway("gateway returned no output".into()));
    }
    let Ok(data) = serde_json::from_str::<Value>(trimmed) else {
        tracing::warn!("gateway output is not JSON, using raw text");
        return Ok(trimmed.to_owned());
    };

    let from_payload = data
        .pointer("/result/payloads/0/text")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    let content = from_payload.or_else(|| {
        ["reply", "message", "content"]
            .iter()
            .filter_map(|k| data.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
    });

    match content {
        Some(text) => Ok(text.trim().to_owned()),
        None => Err(LlmError::InvalidResponse(
            "gateway JSON carried no reply text".into(),
        )),
    }
}

/// Pick the prompt to forward from a chat transcript.
///
/// The last user message, preceded by the assistant message right before
/// it when that message carries tool result blocks, so a reflection call
/// still sees the results.
pub(crate) fn select_prompt(messages: &[Message]) -> Option<String> {
    let idx = messages.iter().rposition(|m| m.role == Role::User)?;
    let user = &messages[idx].content;
    let previous = idx.checked_sub(1).map(|i| &messages[i]);
    match previous {
        Some(prev)
            if prev.role == Role::Assistant
                && RESULT_BLOCK
                    .as_ref()
                    .is_some_and(|re| re.is_match(&prev.content)) =>
        {
            Some(format!("{}\n\n{user}", prev.content))
        }
        _ => Some(user.clone()),
    }
}

#[async_trait]
impl LlmProvider for GatewayProvider {
    fn name(&self) -> &str {
        "gateway"
    }

    async fn generate(&self, prompt: &str, options: &ChatOptions) -> Result<LlmResponse, LlmError> {
        let args = self.build_args(prompt, options);
        let limit = Duration::from_secs(self.config.timeout_secs + SUBPROCESS_GRACE_SECS);
        tracing::info!(
            binary = %self.config.binary,
            agent = %args[2],
            session = %args[4],
            "gateway request"
        );

        let output = run_command(&self.config.binary, &args, limit, None)
            .await
            .map_err(|e| match e {
                ExecError::Timeout { secs, .. } => {
                    LlmError::Timeout(format!("gateway after {secs}s"))
                }
                ExecError::NotFound(bin) => {
                    LlmError::Config(format!("gateway binary not found: {bin}"))
                }
                other => LlmError::Gateway(other.to_string()),
            })?;

        if !output.success() {
            let stderr = output.stderr_text();
            let stderr = stderr.trim();
            tracing::error!(status = ?output.status, stderr, "gateway failed");
            return Err(LlmError::Gateway(if stderr.is_empty() {
                "unknown error".into()
            } else {
                stderr.to_owned()
            }));
        }

        Ok(LlmResponse {
            text: extract_reply(&output.stdout_text())?,
            model: Some(args[2].clone()),
        })
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<LlmResponse, LlmError> {
        match select_prompt(messages) {
            Some(prompt) => self.generate(&prompt, options).await,
            None => Ok(LlmResponse::default()),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(vec![self.config.agent_id.clone()])
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn provider() -> GatewayProvider {
        GatewayProvider::new(GatewayConfig::default())
    }

    #[test]
    fn args_use_configured_agent_and_anonymous_session() {
        let args = provider().build_args("hola", &ChatOptions::new());
        assert_eq!(
            args,
            vec![
                "agent", "--agent", "main", "--session-id", ANONYMOUS_SESSION, "--message",
                "hola", "--json", "--timeout", "120"
            ]
        );
    }

    #[test]
    fn agent_like_model_overrides_agent() {
        let opts = ChatOptions::new().with_model(Some("lucy")).with_user("web:42");
        let args = provider().build_args("x", &opts);
        assert_eq!(args[2], "lucy");
        assert_eq!(args[4], "web:42");
    }

    #[test]
    fn model_tag_does_not_override_agent() {
        let opts = ChatOptions::new().with_model(Some("llama3:8b"));
        assert_eq!(provider().build_args("x", &opts)[2], "main");
    }

    #[test]
    fn extracts_payload_text_first() {
        let out = r#"{"result":{"payloads":[{"text":" hola "}]},"reply":"other"}"#;
        assert_eq!(extract_reply(out).unwrap(), "hola");
    }

    #[test]
    fn falls_back_to_reply_keys() {
        assert_eq!(extract_reply(r#"{"message":"che"}"#).unwrap(), "che");
        assert_eq!(extract_reply(r#"{"content":"dale"}"#).unwrap(), "dale");
    }

    #[test]
    fn raw_text_passes_through() {
        assert_eq!(extract_reply("no es json\n").unwrap(), "no es json");
    }

    #[test]
    fn empty_output_is_error() {
        assert!(matches!(extract_reply("  \n"), Err(LlmError::Gateway(_))));
    }

    #[test]
    fn json_without_text_is_invalid() {
        assert!(matches!(
            extract_reply(r#"{"status":"ok"}"#),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn prompt_is_last_user_message() {
        let msgs = vec![
            Message::system("persona"),
            Message::user("hola"),
            Message::system("recordatorio"),
        ];
        assert_eq!(select_prompt(&msgs).as_deref(), Some("hola"));
    }

    #[test]
    fn prompt_includes_tool_results_before_reflection() {
        let msgs = vec![
            Message::user("qué hora es"),
            Message::assistant("Dale.\n\n[⚙️ SISTEMA]: La hora actual es: 10:00:00"),
            Message::user("Resumí"),
        ];
        let prompt = select_prompt(&msgs).unwrap();
        assert!(prompt.starts_with("Dale."));
        assert!(prompt.ends_with("Resumí"));
    }

    #[test]
    fn plain_assistant_turn_is_not_forwarded() {
        let msgs = vec![Message::assistant("hola"), Message::user("chau")];
        assert_eq!(select_prompt(&msgs).as_deref(), Some("chau"));
    }

    #[test]
    fn no_user_message_gives_none() {
        assert!(select_prompt(&[Message::system("s")]).is_none());
    }

    #[tokio::test]
    async fn missing_binary_is_config_error() {
        let provider = GatewayProvider::new(GatewayConfig {
            binary: "definitely-not-a-gateway-xyz".into(),
            ..Default::default()
        });
        let err = provider.generate("hola", &ChatOptions::new()).await.unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[tokio::test]
    async fn list_models_returns_agent() {
        assert_eq!(provider().list_models().await.unwrap(), vec!["main"]);
    }
}
