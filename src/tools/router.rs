//! Extraction and execution of `[[name(args)]]` invocations.
//!
//! The router scans model output left to right. Each invocation goes
//! through the security check, registry lookup, argument parsing and the
//! handler, and produces exactly one `\n\n[{tag}]: {output}` block. No
//! failure of one invocation stops the others.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock};

use futures_util::FutureExt;
use regex::Regex;

use super::literal::parse_args;
use super::registry::ToolRegistry;
use super::types::ToolContext;

/// Invocation pattern: dotted name, then arguments up to the first `)]]`.
pub const TOOL_CALL_PATTERN: &str = r"\[\[\s*([\w\.]+)\s*\((.*?)\)\s*\]\]";

static TOOL_CALL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(TOOL_CALL_PATTERN).ok());

/// Tags used for router-level failures.
pub mod router_tags {
    /// Blacklisted argument text.
    pub const SECURITY: &str = "⚠️ SEGURIDAD";
    /// Unknown tool name.
    pub const NOT_FOUND: &str = "⚠️ BASE CORE";
    /// Arguments that are not valid literals.
    pub const SYNTAX: &str = "⚠️ ERROR SINTAXIS";
    /// Handler error or panic.
    pub const ENGINE: &str = "⚠️ ERROR MOTOR";
}

/// One invocation found in a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Tool name as written.
    pub name: String,
    /// Raw argument text between the parentheses.
    pub raw_args: String,
}

/// Find every invocation in `text`, in order of appearance.
pub fn find_invocations(text: &str) -> Vec<ToolInvocation> {
    let Some(pattern) = TOOL_CALL.as_ref() else {
        tracing::error!("tool call pattern failed to compile");
        return Vec::new();
    };
    pattern
        .captures_iter(text)
        .map(|caps| ToolInvocation {
            name: caps.get(1).map_or("", |m| m.as_str()).to_owned(),
            raw_args: caps.get(2).map_or("", |m| m.as_str()).to_owned(),
        })
        .collect()
}

/// Result of one router pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterPass {
    /// The input with one result block appended per invocation.
    pub text: String,
    /// Names of the handlers that actually ran, in order.
    pub executed: Vec<String>,
}

/// Executes tool invocations embedded in model output.
#[derive(Debug, Clone)]
pub struct ToolRouter {
    registry: Arc<ToolRegistry>,
}

impl ToolRouter {
    /// Create a router over `registry`.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this router dispatches to.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute every invocation in `text` and return the annotated text.
    ///
    /// Returns `text` unchanged when there are no invocations.
    pub async fn parse_and_execute(&self, text: &str, ctx: &ToolContext) -> String {
        self.execute(text, ctx).await.text
    }

    /// Like [`parse_and_execute`](Self::parse_and_execute), also reporting
    /// which handlers ran.
    pub async fn execute(&self, text: &str, ctx: &ToolContext) -> RouterPass {
        let invocations = find_invocations(text);
        if invocations.is_empty() {
            tracing::debug!("no tool invocations in reply");
            return RouterPass {
                text: text.to_owned(),
                executed: Vec::new(),
            };
        }

        tracing::info!(count = invocations.len(), "tool invocations found");
        let mut out = text.to_owned();
        let mut executed = Vec::new();
        for inv in &invocations {
            let (tag, output) = self.run_one(inv, ctx, &mut executed).await;
            out.push_str("\n\n[");
            out.push_str(&tag);
            out.push_str("]: ");
            out.push_str(&output);
        }
        RouterPass {
            text: out,
            executed,
        }
    }

    async fn run_one(
        &self,
        inv: &ToolInvocation,
        ctx: &ToolContext,
        executed: &mut Vec<String>,
    ) -> (String, String) {
        let name = inv.name.as_str();

        if let Some(violation) = self.registry.check_security(name, &inv.raw_args) {
            tracing::warn!(tool = name, %violation, "tool call rejected");
            return (router_tags::SECURITY.into(), violation);
        }

        let Some(handler) = self.registry.get(name) else {
            tracing::warn!(tool = name, "tool not found");
            return (
                router_tags::NOT_FOUND.into(),
                format!("Herramienta '{name}' no disponible."),
            );
        };

        let args = match parse_args(&inv.raw_args) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = name, raw = %inv.raw_args, error = %e, "bad tool arguments");
                return (
                    router_tags::SYNTAX.into(),
                    format!("No pude entender los argumentos de {name}: {e}"),
                );
            }
        };

        tracing::info!(tool = name, args = args.len(), "running tool");
        executed.push(name.to_owned());
        let outcome = AssertUnwindSafe(handler.call(&args, ctx))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(result)) => {
                tracing::info!(tool = name, tag = %result.tag, success = result.success, "tool finished");
                (result.tag, result.output)
            }
            Ok(Err(e)) => {
                tracing::error!(tool = name, error = %e, "tool failed");
                (router_tags::ENGINE.into(), engine_failure(name))
            }
            Err(_) => {
                tracing::error!(tool = name, "tool panicked");
                (router_tags::ENGINE.into(), engine_failure(name))
            }
        }
    }
}

fn engine_failure(name: &str) -> String {
    format!("Hubo un fallo inesperado ejecutando {name}.")
}
