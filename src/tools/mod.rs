//! Tool system.
//!
//! The model invokes tools by writing `[[name(args)]]` in its reply. The
//! [`ToolRouter`] finds those invocations, checks them against the
//! [`ToolRegistry`] blacklist, parses the arguments as [`Literal`]s and
//! appends each handler's result to the reply.
//!
//! # Tools
//!
//! - **memory**: `remember`, `forget`, `memory_stats`
//! - **system**: `get_info`
//! - **files**: `read_file`, `write_file` (confined to the project root)
//! - **process**: `os_run` (allowlisted commands)
//! - **windows**: `window_manager`
//! - **web**: `search_web`, `open_url`, `read_url`
//! - **workflow**: `trigger_workflow`, `ask_sota` (when n8n is configured)
//! - **business**: `check_shipping`, `process_payment`, `generate_budget_pdf`
//! - **capabilities**: `screenshot` and the mouse/keyboard tools

pub mod business;
pub mod capabilities;
pub mod files;
pub mod literal;
pub mod memory;
pub mod path_validation;
pub mod pdf;
pub mod process;
pub mod registry;
pub mod router;
pub mod system;
pub mod types;
pub mod web;
pub mod windows;
pub mod workflow;

use std::sync::Arc;
use std::time::Duration;

pub use capabilities::{Automation, CapabilityError, HandAction, Vision, XdotoolAutomation};
pub use literal::{Literal, LiteralError, parse_args};
pub use registry::{GLOBAL_BLACKLIST, ToolRegistry};
pub use router::{RouterPass, ToolInvocation, ToolRouter, find_invocations};
pub use types::{ToolContext, ToolError, ToolHandler, ToolResult, tags};

use crate::config::LucyConfig;
use crate::error::Result;
use crate::lucy_dirs;

/// Optional collaborators for the screen and input tools.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub vision: Option<Arc<dyn Vision>>,
    pub automation: Option<Arc<dyn Automation>>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("vision", &self.vision.is_some())
            .field("automation", &self.automation.is_some())
            .finish()
    }
}

/// Build the registry with every built-in tool.
///
/// Workflow tools are only registered when `n8n.base_url` is set.
///
/// # Errors
///
/// Returns an error if the workflow HTTP client cannot be built.
pub fn register_default_tools(config: &LucyConfig, caps: Capabilities) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    let project_root = config.tools.resolved_project_root();
    let home = lucy_dirs::home_dir().unwrap_or_else(|| project_root.clone());

    registry.register("remember", Arc::new(memory::RememberTool));
    registry.register("forget", Arc::new(memory::ForgetTool));
    registry.register("memory_stats", Arc::new(memory::MemoryStatsTool));
    registry.register("get_info", Arc::new(system::GetInfoTool));

    registry.register("read_file", Arc::new(files::ReadFileTool::new(project_root.clone())));
    registry.register("write_file", Arc::new(files::WriteFileTool::new(project_root.clone())));

    registry.register_aliases(
        &["os_run", "browser.run"],
        Arc::new(process::OsRunTool::new(
            project_root.clone(),
            home,
            Duration::from_secs(config.tools.command_timeout_secs),
        )),
    );
    registry.register_aliases(
        &["window_manager", "windows"],
        Arc::new(windows::WindowManagerTool::new(Duration::from_secs(
            config.tools.window_timeout_secs,
        ))),
    );

    let search_config = config.search.to_search_config();
    let search = Arc::new(web::SearchWebTool::new(search_config.clone()));
    registry.register_aliases(&["search_web", "web_search", "google_search"], search.clone());
    registry.register("open_url", Arc::new(web::OpenUrlTool::new(search)));
    registry.register("read_url", Arc::new(web::ReadUrlTool::new(search_config)));

    if let Some(base_url) = config.n8n.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let client = Arc::new(workflow::WorkflowClient::new(base_url, &config.n8n)?);
        registry.register(
            "trigger_workflow",
            Arc::new(workflow::TriggerWorkflowTool::new(client.clone())),
        );
        registry.register("ask_sota", Arc::new(workflow::AskSotaTool::new(client)));
    }

    registry.register("check_shipping", Arc::new(business::CheckShippingTool));
    registry.register("process_payment", Arc::new(business::ProcessPaymentTool));
    registry.register(
        "generate_budget_pdf",
        Arc::new(business::BudgetPdfTool::new(lucy_dirs::budgets_dir())),
    );

    registry.register(
        "screenshot",
        Arc::new(capabilities::ScreenshotTool::new(caps.vision)),
    );
    for (name, action) in HandAction::ALL {
        registry.register(
            name,
            Arc::new(capabilities::HandsTool::new(action, caps.automation.clone())),
        );
    }

    tracing::info!(tools = registry.len(), "tool registry ready");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_registry_names_and_aliases() {
        let registry = register_default_tools(&LucyConfig::default(), Capabilities::default()).unwrap();
        for name in [
            "remember",
            "forget",
            "memory_stats",
            "get_info",
            "read_file",
            "write_file",
            "os_run",
            "browser.run",
            "window_manager",
            "windows",
            "search_web",
            "web_search",
            "google_search",
            "open_url",
            "read_url",
            "check_shipping",
            "process_payment",
            "generate_budget_pdf",
            "screenshot",
            "click",
            "scroll",
        ] {
            assert!(registry.exists(name), "missing {name}");
        }
        assert!(!registry.exists("trigger_workflow"));
        assert!(!registry.exists("ask_sota"));
    }

    #[test]
    fn workflow_tools_need_base_url() {
        let mut config = LucyConfig::default();
        config.n8n.base_url = Some("http://localhost:5678".into());
        let registry = register_default_tools(&config, Capabilities::default()).unwrap();
        assert!(registry.exists("trigger_workflow"));
        assert!(registry.exists("ask_sota"));
    }
}
