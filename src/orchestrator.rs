//! One conversational turn, end to end.
//!
//! ```text
//! [audio] -> listen -> think (retry) -> act (router) -> reflect? -> speak
//! ```
//!
//! The think call is retried with exponential backoff on retryable backend
//! errors and on degenerate replies. When attempts run out the user gets a
//! fixed apology, never the raw error. Tool failures are reported inside
//! the reply and are not retried. Reflection only happens when a tool ran.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{OwnedMutexGuard, mpsc};
use tracing::Instrument;

use crate::cognitive::CognitiveEngine;
use crate::config::{LucyConfig, OrchestratorConfig};
use crate::error::Result;
use crate::llm::{LlmError, Message, build_provider};
use crate::lucy_dirs;
use crate::memory::{FactStore, FileFactStore, FileHistoryStore, HistoryItem, HistoryStore, TurnKind};
use crate::senses::Senses;
use crate::tools::{Capabilities, ToolContext, ToolRouter, register_default_tools};

/// Session user for turns that do not name one.
pub const DEFAULT_SESSION_USER: &str = "lucy:anonymous";
/// Reply to empty text input.
pub const EMPTY_TEXT_REPLY: &str = "Decime algo.";
/// Reply when speech recognition heard nothing.
pub const EMPTY_AUDIO_REPLY: &str = "No escuché nada.";
/// Reply after the backend could not be reached on any attempt.
pub const CONNECTIVITY_FALLBACK: &str =
    "Perdón, no pude conectarme con mi motor de lenguaje. Revisá que esté activo y probá de nuevo.";
/// Reply after every attempt failed for any other reason.
pub const GENERIC_FALLBACK: &str =
    "Perdón, tuve un problema para pensar la respuesta. ¿Me lo repetís?";

/// Exponential backoff for the think call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts after the first (0 = no retries).
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Cap on the computed delay, before jitter.
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// `min(base * multiplier^(attempt-1), max)` plus 0-10% jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = self
            .backoff_multiplier
            .powi(i32::try_from(attempt - 1).unwrap_or(i32::MAX));
        let delay = (self.base_delay_ms as f64 * exp).min(self.max_delay_ms as f64);
        let jitter = delay * (rand::random::<f64>() * 0.1);
        Duration::from_millis((delay + jitter) as u64)
    }
}

/// Progress of a turn, for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Listening,
    Thinking,
    Acting,
    Reflecting,
    Speaking,
}

impl TurnStage {
    /// Short user-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Listening => "Escuchando...",
            Self::Thinking => "Pensando...",
            Self::Acting => "Ejecutando herramientas...",
            Self::Reflecting => "Reflexionando sobre acciones...",
            Self::Speaking => "Sintetizando voz...",
        }
    }
}

/// Outcome of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnResult {
    /// What the turn was processed with: trimmed text or the transcription.
    pub transcript: String,
    pub reply: String,
    /// WAV bytes of the spoken reply; empty when synthesis failed.
    pub reply_wav: Vec<u8>,
    pub reply_sample_rate: u32,
    /// Handlers that ran during the act stage.
    pub tools_used: Vec<String>,
}

impl TurnResult {
    fn text_only(transcript: &str, reply: &str) -> Self {
        Self {
            transcript: transcript.to_owned(),
            reply: reply.to_owned(),
            ..Self::default()
        }
    }
}

/// Runs turns against the cognitive engine, the tool router and the
/// senses.
pub struct Orchestrator {
    brain: CognitiveEngine,
    router: ToolRouter,
    senses: Senses,
    facts: Option<Arc<dyn FactStore>>,
    history: Option<Arc<dyn HistoryStore>>,
    retry: RetryPolicy,
    min_reply_chars: usize,
    record_history: bool,
    safe_mode: bool,
    status: Option<mpsc::Sender<TurnStage>>,
    user_locks: Mutex<UserLocks>,
}

type UserLocks = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Holds one user's turn lock. On drop the lock is released and the
/// user's entry is removed once no other turn holds or awaits it.
struct SessionGuard<'a> {
    locks: &'a Mutex<UserLocks>,
    user: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        drop(self.guard.take());
        if locks
            .get(&self.user)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.user);
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("brain", &self.brain)
            .field("router", &self.router)
            .field("senses", &self.senses)
            .field("retry", &self.retry)
            .field("min_reply_chars", &self.min_reply_chars)
            .field("record_history", &self.record_history)
            .field("safe_mode", &self.safe_mode)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        brain: CognitiveEngine,
        router: ToolRouter,
        senses: Senses,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            brain,
            router,
            senses,
            facts: None,
            history: None,
            retry: RetryPolicy::from_config(config),
            min_reply_chars: config.min_reply_chars,
            record_history: config.record_history,
            safe_mode: false,
            status: None,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wire every component from `config`: file-backed stores under the
    /// data directory, the default tool set and the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if a store directory cannot be created or the
    /// backend or tools cannot be constructed.
    pub fn from_config(config: &LucyConfig, caps: Capabilities, senses: Senses) -> Result<Self> {
        let facts: Arc<dyn FactStore> = Arc::new(FileFactStore::new(lucy_dirs::facts_dir())?);
        let history: Arc<dyn HistoryStore> =
            Arc::new(FileHistoryStore::new(lucy_dirs::history_dir())?);
        let registry = Arc::new(register_default_tools(config, caps)?);
        let llm = build_provider(config, registry.tool_definitions())?;
        let brain = CognitiveEngine::new(llm, &config.cognitive)
            .with_history(Arc::clone(&history))
            .with_facts(Arc::clone(&facts));

        Ok(
            Self::new(brain, ToolRouter::new(registry), senses, &config.orchestrator)
                .with_facts(facts)
                .with_history(history)
                .with_safe_mode(config.tools.safe_mode),
        )
    }

    /// Fact store handed to tools.
    pub fn with_facts(mut self, facts: Arc<dyn FactStore>) -> Self {
        self.facts = Some(facts);
        self
    }

    /// History store completed turns are appended to.
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send [`TurnStage`] updates to `status`. Updates are dropped when the
    /// channel is full or closed.
    pub fn with_status(mut self, status: mpsc::Sender<TurnStage>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn brain(&self) -> &CognitiveEngine {
        &self.brain
    }

    pub fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Run a turn from typed text.
    pub async fn process_text(
        &self,
        text: &str,
        session_user: Option<&str>,
        model: Option<&str>,
    ) -> TurnResult {
        let transcript = text.trim();
        if transcript.is_empty() {
            return TurnResult::text_only("", EMPTY_TEXT_REPLY);
        }
        let user = session_user.unwrap_or(DEFAULT_SESSION_USER);
        self.run_turn(transcript, user, model, TurnKind::Text).await
    }

    /// Run a turn from mono float samples.
    pub async fn process_audio(
        &self,
        samples: &[f32],
        sample_rate: u32,
        session_user: Option<&str>,
        model: Option<&str>,
    ) -> TurnResult {
        self.emit(TurnStage::Listening);
        let transcript = self.senses.listen(samples, sample_rate).await;
        if transcript.is_empty() {
            return TurnResult::text_only("", EMPTY_AUDIO_REPLY);
        }
        let user = session_user.unwrap_or(DEFAULT_SESSION_USER);
        self.run_turn(&transcript, user, model, TurnKind::Voice).await
    }

    async fn run_turn(
        &self,
        transcript: &str,
        user: &str,
        model: Option<&str>,
        kind: TurnKind,
    ) -> TurnResult {
        let _session = self.begin_session(user).await;

        let span = tracing::info_span!("turn", id = %uuid::Uuid::new_v4(), user);
        async {
            self.emit(TurnStage::Thinking);
            let context = self.brain.build_context(transcript, user);
            let thought = self.think_with_retry(&context, user, model).await;

            self.emit(TurnStage::Acting);
            let ctx = ToolContext::new(user, self.facts.clone()).with_safe_mode(self.safe_mode);
            let pass = self.router.execute(&thought, &ctx).await;

            let reply = if pass.text == thought {
                thought
            } else {
                self.emit(TurnStage::Reflecting);
                self.reflect_or_annotated(&pass.text, &context, user, model)
                    .await
            };

            self.emit(TurnStage::Speaking);
            let spoken = self.senses.speak(&reply).await;

            if self.record_history {
                self.record(transcript, user, model, kind, &reply);
            }
            tracing::info!(tools = pass.executed.len(), chars = reply.chars().count(), "turn complete");

            TurnResult {
                transcript: transcript.to_owned(),
                reply,
                reply_wav: spoken.wav,
                reply_sample_rate: spoken.sample_rate,
                tools_used: pass.executed,
            }
        }
        .instrument(span)
        .await
    }

    fn is_degenerate(&self, text: &str) -> bool {
        text.trim().chars().count() < self.min_reply_chars.max(1)
    }

    async fn think_with_retry(&self, context: &[Message], user: &str, model: Option<&str>) -> String {
        let mut last_error: Option<LlmError> = None;
        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.delay_for_attempt(attempt);
                tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "retrying think");
                tokio::time::sleep(delay).await;
            }
            match self.brain.think_with(context, user, model).await {
                Ok(response) if !self.is_degenerate(&response.text) => return response.text,
                Ok(response) => {
                    tracing::warn!(attempt, chars = response.text.chars().count(), "degenerate reply");
                    last_error = None;
                }
                Err(e) => {
                    tracing::warn!(attempt, code = e.code(), error = %e, "think failed");
                    let retryable = e.is_retryable();
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
            }
        }
        tracing::error!(error = ?last_error, "think attempts exhausted");
        match last_error {
            Some(e) if e.is_connectivity() => CONNECTIVITY_FALLBACK.to_owned(),
            _ => GENERIC_FALLBACK.to_owned(),
        }
    }

    async fn reflect_or_annotated(
        &self,
        annotated: &str,
        context: &[Message],
        user: &str,
        model: Option<&str>,
    ) -> String {
        match self.brain.reflect(annotated, context, user, model).await {
            Ok(response) if !self.is_degenerate(&response.text) => response.text,
            Ok(_) => {
                tracing::warn!("degenerate reflection, keeping tool output");
                annotated.to_owned()
            }
            Err(e) => {
                tracing::warn!(code = e.code(), error = %e, "reflection failed, keeping tool output");
                annotated.to_owned()
            }
        }
    }

    fn record(&self, transcript: &str, user: &str, model: Option<&str>, kind: TurnKind, reply: &str) {
        let Some(history) = &self.history else {
            return;
        };
        let item = HistoryItem {
            timestamp: HistoryItem::now_timestamp(),
            user_id: user.to_owned(),
            kind,
            provider: self.brain.provider().name().to_owned(),
            model_name: model.unwrap_or_default().to_owned(),
            user_text: if kind == TurnKind::Text {
                transcript.to_owned()
            } else {
                String::new()
            },
            transcript: transcript.to_owned(),
            reply: reply.to_owned(),
        };
        if let Err(e) = history.append(&item) {
            tracing::error!(error = %e, "failed to append history");
        }
    }

    fn emit(&self, stage: TurnStage) {
        if let Some(tx) = &self.status {
            let _ = tx.try_send(stage);
        }
    }

    async fn begin_session(&self, user: &str) -> SessionGuard<'_> {
        let lock = {
            let mut locks = self
                .user_locks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(locks.entry(user.to_owned()).or_default())
        };
        SessionGuard {
            locks: &self.user_locks,
            user: user.to_owned(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Users with a turn running or waiting.
    pub fn active_sessions(&self) -> usize {
        self.user_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}
