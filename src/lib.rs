//! Lucy: a voice and text assistant that acts through tools.
//!
//! A turn flows through:
//! Text/Audio → ASR → LLM (think) → Tool router → LLM (reflect) → TTS
//!
//! # Architecture
//!
//! - **Cognitive engine** ([`cognitive`]): builds the prompt from persona,
//!   remembered facts and budgeted history, and makes the think and
//!   reflect calls
//! - **Tools** ([`tools`]): the model writes `[[name(args)]]` in its reply;
//!   the router parses, vets and dispatches each invocation and appends the
//!   result
//! - **LLM backends** ([`llm`]): a local Ollama server or an agent CLI
//!   gateway
//! - **Memory** ([`memory`]): per-user facts and turn history on disk
//! - **Senses** ([`senses`]): speech recognition and synthesis traits, WAV
//!   codec and a Mimic3 synthesizer
//! - **Orchestrator** ([`orchestrator`]): runs the turn with retries and
//!   fallbacks

pub mod cognitive;
pub mod config;
pub mod error;
pub mod exec;
pub mod llm;
pub mod lucy_dirs;
pub mod memory;
pub mod orchestrator;
pub mod personality;
pub mod senses;
pub mod tools;

pub use cognitive::CognitiveEngine;
pub use config::LucyConfig;
pub use error::{LucyError, Result};
pub use orchestrator::{Orchestrator, RetryPolicy, TurnResult, TurnStage};
