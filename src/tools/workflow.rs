//! n8n workflow webhooks: `trigger_workflow` and `ask_sota`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::literal::Literal;
use super::types::{ToolContext, ToolError, ToolHandler, ToolResult, arg_text, tags};
use crate::config::N8nConfig;
use crate::error::LucyError;

/// Workflow that forwards a prompt to a stronger remote model.
pub const SOTA_WORKFLOW: &str = "ask-sota";

/// Posts JSON payloads to `{base}/webhook/{prefix}{id}`.
#[derive(Debug, Clone)]
pub struct WorkflowClient {
    base_url: String,
    prefix: String,
    timeout_secs: u64,
    http: reqwest::Client,
}

/// Outcome of one webhook call, already phrased for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    /// Whether the webhook answered with a success status.
    pub success: bool,
    /// Response or failure description.
    pub message: String,
}

impl WorkflowClient {
    /// Build a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`LucyError::Config`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, config: &N8nConfig) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LucyError::Config(format!("n8n http client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            prefix: config.webhook_prefix.clone(),
            timeout_secs: config.timeout_secs,
            http,
        })
    }

    /// Webhook URL for a workflow id.
    pub fn webhook_url(&self, workflow_id: &str) -> String {
        format!("{}/webhook/{}{workflow_id}", self.base_url, self.prefix)
    }

    /// Trigger `workflow_id` with `payload`.
    pub async fn trigger(&self, workflow_id: &str, payload: &Value) -> WorkflowOutcome {
        let url = self.webhook_url(workflow_id);
        tracing::info!(workflow = workflow_id, %url, "triggering workflow");
        let fail = |message: String| WorkflowOutcome {
            success: false,
            message,
        };

        let response = match self.http.post(&url).json(payload).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                tracing::error!(workflow = workflow_id, "workflow timed out");
                return fail(format!(
                    "Timeout al ejecutar workflow '{workflow_id}' (>{}s).",
                    self.timeout_secs
                ));
            }
            Err(e) => {
                tracing::error!(workflow = workflow_id, error = %e, "workflow connection failed");
                return fail(format!("Error al conectar con n8n: {e}"));
            }
        };

        let status = response.status();
        if status.as_u16() == 404 {
            return fail(format!(
                "Workflow '{workflow_id}' no encontrado (404). Verificá que el webhook exista en n8n."
            ));
        }
        if !status.is_success() {
            tracing::error!(workflow = workflow_id, status = status.as_u16(), "workflow http error");
            return fail(format!(
                "Error HTTP {} al ejecutar '{workflow_id}'.",
                status.as_u16()
            ));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return fail(format!(
                    "Timeout al ejecutar workflow '{workflow_id}' (>{}s).",
                    self.timeout_secs
                ));
            }
            Err(e) => return fail(format!("Error al conectar con n8n: {e}")),
        };
        let message = match serde_json::from_str::<Value>(&body) {
            Ok(parsed) => {
                let pretty = serde_json::to_string_pretty(&parsed).unwrap_or(body);
                format!("Workflow '{workflow_id}' ejecutado. Respuesta:\n{pretty}")
            }
            Err(_) => format!("Workflow '{workflow_id}' ejecutado. Respuesta: {body}"),
        };
        WorkflowOutcome {
            success: true,
            message,
        }
    }
}

fn parse_payload(arg: Option<&Literal>) -> Result<Value, String> {
    match arg {
        None => Ok(json!({})),
        Some(Literal::Str(s)) if s.trim().is_empty() => Ok(json!({})),
        Some(Literal::Str(s)) => serde_json::from_str(s).map_err(|e| e.to_string()),
        Some(other) => Ok(other.to_json()),
    }
}

/// `trigger_workflow(id, payload)`. The payload may be a JSON string or a
/// dict literal.
#[derive(Debug, Clone)]
pub struct TriggerWorkflowTool {
    client: Arc<WorkflowClient>,
}

impl TriggerWorkflowTool {
    /// Trigger workflows through `client`.
    pub fn new(client: Arc<WorkflowClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for TriggerWorkflowTool {
    fn description(&self) -> &str {
        "Dispara un workflow de n8n por webhook (id, payload JSON)"
    }

    fn parameters(&self) -> &[&'static str] {
        &["workflow_id", "payload"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(id) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(tags::WORKFLOW, "Falta el ID del workflow."));
        };
        let payload = match parse_payload(args.get(1)) {
            Ok(p) => p,
            Err(e) => {
                return Ok(ToolResult::failure(
                    tags::WORKFLOW,
                    format!("Payload JSON inválido: {e}"),
                ));
            }
        };
        let outcome = self.client.trigger(&id, &payload).await;
        Ok(ToolResult {
            success: outcome.success,
            output: outcome.message,
            tag: tags::WORKFLOW.to_owned(),
        })
    }
}

/// `ask_sota(prompt)`: delegate a question to the `ask-sota` workflow.
#[derive(Debug, Clone)]
pub struct AskSotaTool {
    client: Arc<WorkflowClient>,
}

impl AskSotaTool {
    /// Delegate through `client`.
    pub fn new(client: Arc<WorkflowClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for AskSotaTool {
    fn description(&self) -> &str {
        "Consulta a un modelo más potente para preguntas complejas"
    }

    fn parameters(&self) -> &[&'static str] {
        &["prompt"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(prompt) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(
                tags::SOTA,
                "Falta la pregunta para el modelo SOTA.",
            ));
        };
        tracing::info!(chars = prompt.chars().count(), "delegating to remote model");
        let payload = json!({"prompt": prompt, "source": "lucy-local"});
        let outcome = self.client.trigger(SOTA_WORKFLOW, &payload).await;
        if outcome.success {
            Ok(ToolResult::success(
                tags::SOTA,
                format!("Respuesta del modelo SOTA:\n{}", outcome.message),
            ))
        } else {
            Ok(ToolResult::failure(
                tags::SOTA,
                format!("Error al consultar SOTA: {}", outcome.message),
            ))
        }
    }
}
