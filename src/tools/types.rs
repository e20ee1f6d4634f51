//! Core tool types.
//!
//! Defines the [`ToolHandler`] trait every tool implements, the
//! [`ToolResult`] each invocation produces and the per-turn
//! [`ToolContext`].

use std::sync::Arc;

use async_trait::async_trait;

use super::literal::Literal;
use crate::memory::FactStore;

/// Result labels shown in the annotated reply.
pub mod tags {
    /// Facts stored or removed.
    pub const MEMORY: &str = "🧠 MEMORIA";
    /// Blocked by safe mode or a command policy.
    pub const SECURITY: &str = "🛡️ SEGURIDAD";
    /// Missing collaborators or bad arguments for core tools.
    pub const CORE_ERROR: &str = "⚠️ ERROR CORE";
    /// Clock and system information.
    pub const SYSTEM: &str = "⚙️ SISTEMA";
    /// Project file access.
    pub const FILES: &str = "📁 ARCHIVOS";
    /// Allowlisted commands.
    pub const OS: &str = "🖥️ OS";
    /// Desktop window management.
    pub const WINDOWS: &str = "🪟 VENTANAS";
    /// Search, browsing and page reads.
    pub const NETWORK: &str = "🌐 RED";
    /// Workflow webhooks.
    pub const WORKFLOW: &str = "🔗 N8N";
    /// Delegation to a stronger remote model.
    pub const SOTA: &str = "🧠 SOTA";
    /// Shipping quotes.
    pub const SHIPPING: &str = "📦 ENVÍO";
    /// Payments.
    pub const PAYMENT: &str = "💳 PAGO";
    /// Generated documents.
    pub const PDF: &str = "📄 PDF";
    /// Screen capture and description.
    pub const VISION: &str = "👁️ OJOS";
    /// Mouse and keyboard automation.
    pub const HANDS: &str = "🖐️ MANOS";
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Whether the tool did what was asked.
    pub success: bool,
    /// Message shown to the model and the user.
    pub output: String,
    /// Category label used only for formatting.
    pub tag: String,
}

impl ToolResult {
    /// A successful result.
    pub fn success(tag: &str, output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            tag: tag.to_owned(),
        }
    }

    /// An expected failure (missing arguments, disabled feature, not found).
    pub fn failure(tag: &str, output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            tag: tag.to_owned(),
        }
    }

    /// The `[{tag}]: {output}` block appended to the reply.
    pub fn block(&self) -> String {
        format!("[{}]: {}", self.tag, self.output)
    }
}

/// Unexpected tool failure. Reported by the router as a generic engine
/// error; expected failures are returned as [`ToolResult::failure`].
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// An internal invariant did not hold.
    #[error("internal tool error: {0}")]
    Internal(String),

    /// I/O failed in a way the tool does not handle.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-turn state injected into every handler.
#[derive(Clone, Default)]
pub struct ToolContext {
    /// The user this turn belongs to.
    pub session_user: Option<String>,
    /// Long-term fact store, when configured.
    pub facts: Option<Arc<dyn FactStore>>,
    /// Restricts sensitive and destructive tools.
    pub safe_mode: bool,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_user", &self.session_user)
            .field("facts", &self.facts.is_some())
            .field("safe_mode", &self.safe_mode)
            .finish()
    }
}

impl ToolContext {
    /// Context for `user` with the given fact store.
    pub fn new(session_user: impl Into<String>, facts: Option<Arc<dyn FactStore>>) -> Self {
        Self {
            session_user: Some(session_user.into()),
            facts,
            safe_mode: false,
        }
    }

    /// Set the safe-mode flag.
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// The session user, or `"anonymous"`.
    pub fn user_or_anonymous(&self) -> &str {
        self.session_user.as_deref().unwrap_or("anonymous")
    }
}

/// A named capability the model can invoke.
///
/// Handlers hold their own configuration and collaborators; per-turn state
/// arrives in [`ToolContext`].
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// One-line description offered to backends with native tool calling.
    fn description(&self) -> &str;

    /// Positional parameter names, in order.
    fn parameters(&self) -> &[&'static str] {
        &[]
    }

    /// Run the tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] only for unexpected failures.
    async fn call(&self, args: &[Literal], ctx: &ToolContext) -> Result<ToolResult, ToolError>;
}

/// Argument `index` as text, if present and non-blank.
pub fn arg_text(args: &[Literal], index: usize) -> Option<String> {
    args.get(index)
        .map(ToString::to_string)
        .filter(|s| !s.trim().is_empty())
}

/// All arguments joined by spaces.
pub fn joined_args(args: &[Literal]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to at most `max_chars` characters, appending `marker` when cut.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}{marker}", &text[..byte]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_format() {
        let result = ToolResult::success(tags::MEMORY, "Recordado: color = azul");
        assert_eq!(result.block(), "[🧠 MEMORIA]: Recordado: color = azul");
        assert!(result.success);
    }

    #[test]
    fn failure_is_not_success() {
        let result = ToolResult::failure(tags::FILES, "nope");
        assert!(!result.success);
        assert_eq!(result.tag, "📁 ARCHIVOS");
    }

    #[test]
    fn arg_text_skips_blank() {
        let args = vec![Literal::Str("  ".into()), Literal::Int(3)];
        assert_eq!(arg_text(&args, 0), None);
        assert_eq!(arg_text(&args, 1).as_deref(), Some("3"));
        assert_eq!(arg_text(&args, 2), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("ñandú", 3, "…"), "ñan…");
        assert_eq!(truncate_chars("abc", 3, "…"), "abc");
    }

    #[test]
    fn context_defaults() {
        let ctx = ToolContext::default();
        assert_eq!(ctx.user_or_anonymous(), "anonymous");
        assert!(!ctx.safe_mode);
        let ctx = ToolContext::new("u1", None).with_safe_mode(true);
        assert!(ctx.safe_mode);
        assert_eq!(ctx.user_or_anonymous(), "u1");
    }
}
