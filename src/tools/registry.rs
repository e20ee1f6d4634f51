//! Tool registry.
//!
//! The [`ToolRegistry`] maps invocation names to handlers, holds the
//! argument blacklist checked before any handler runs, and exports
//! definitions for backends with native tool calling.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::ToolHandler;
use crate::llm::ToolDefinition;

/// Substrings rejected in the raw argument text of every tool.
pub const GLOBAL_BLACKLIST: &[&str] = &[";", "&&", "||", ">", "<", "$(", "system("];

/// Registry of invocable tools.
///
/// Registration is last-write-wins. One handler may be registered under
/// several names (aliases).
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
    rules: HashMap<String, Vec<String>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("rules", &self.rules)
            .finish()
    }
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any existing handler.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let name = name.into();
        if self.tools.insert(name.clone(), handler).is_some() {
            tracing::warn!(tool = %name, "tool re-registered, previous handler replaced");
        } else {
            tracing::debug!(tool = %name, "tool registered");
        }
    }

    /// Register the same handler under several names.
    pub fn register_aliases(&mut self, names: &[&str], handler: Arc<dyn ToolHandler>) {
        for name in names {
            self.register(*name, Arc::clone(&handler));
        }
    }

    /// Reject `pattern` in the arguments of `tool`, in addition to
    /// [`GLOBAL_BLACKLIST`].
    pub fn add_security_rule(&mut self, tool: impl Into<String>, pattern: impl Into<String>) {
        self.rules.entry(tool.into()).or_default().push(pattern.into());
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool is registered.
    pub fn exists(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check raw argument text against the blacklists.
    ///
    /// Returns the rejection message, or `None` when the text is allowed.
    pub fn check_security(&self, name: &str, raw_args: &str) -> Option<String> {
        if let Some(rule) = GLOBAL_BLACKLIST.iter().find(|r| raw_args.contains(**r)) {
            return Some(format!("Seguridad: Argumento prohibido '{rule}' detectado."));
        }
        self.rules
            .get(name)
            .and_then(|rules| rules.iter().find(|r| raw_args.contains(r.as_str())))
            .map(|rule| format!("Seguridad: Argumento prohibido para {name}: '{rule}'."))
    }

    /// Definitions for every registered name, sorted by name.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                self.tools.get(name).map(|tool| {
                    ToolDefinition::positional(name, tool.description(), tool.parameters())
                })
            })
            .collect()
    }
}
