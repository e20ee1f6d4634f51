//! Language model backends.
//!
//! The cognitive engine talks to a `dyn LlmProvider`; concrete backends
//! are a local Ollama server ([`ollama`]) and an agent CLI gateway
//! ([`gateway`]).

pub mod error;
pub mod gateway;
pub mod message;
pub mod ollama;
pub mod provider;

use std::sync::Arc;

pub use error::LlmError;
pub use gateway::GatewayProvider;
pub use message::{Message, Role};
pub use ollama::OllamaProvider;
pub use provider::{ChatOptions, LlmProvider, LlmResponse, ToolDefinition};

use crate::config::{LlmBackend, LucyConfig};

/// Build the backend selected in `config`.
///
/// `tools` is offered to backends with native tool calling.
///
/// # Errors
///
/// Returns [`LlmError::Config`] if the backend cannot be constructed.
pub fn build_provider(
    config: &LucyConfig,
    tools: Vec<ToolDefinition>,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.llm.provider {
        LlmBackend::Ollama => Ok(Arc::new(
            OllamaProvider::new(&config.ollama)?.with_tools(tools),
        )),
        LlmBackend::Gateway => Ok(Arc::new(GatewayProvider::new(config.gateway.clone()))),
    }
}
