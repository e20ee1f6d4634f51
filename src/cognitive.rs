//! Prompt construction and the two model calls of a turn.
//!
//! [`CognitiveEngine::build_context`] assembles the message list: one
//! system message (persona, clock and host, remembered facts), as much
//! recent history as fits the character budget, the current user message
//! and a trailing agency reminder. [`think`](CognitiveEngine::think) sends
//! it with tools enabled; [`reflect`](CognitiveEngine::reflect) resends it
//! with the tool-annotated reply so the model can answer from the results.
//!
//! Backend errors propagate unchanged. Retry policy belongs to the
//! orchestrator.

use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::config::CognitiveConfig;
use crate::llm::{ChatOptions, LlmError, LlmProvider, LlmResponse, Message};
use crate::memory::{FactStore, HistoryStore};
use crate::personality::{AGENCY_REMINDER, REFLECTION_INSTRUCTION, system_prompt};
use crate::tools::system::os_description;

/// Render the system message for `now`, appending `facts_summary` when
/// it is non-empty.
pub fn system_message(now: DateTime<Local>, facts_summary: &str) -> String {
    let mut content = system_prompt();
    content.push_str(&format!(
        "\n\n[SISTEMA - {}]\n- Hora actual: {}\n- SO: {}\n",
        now.format("%d/%m/%Y %H:%M:%S"),
        now.format("%H:%M"),
        os_description()
    ));
    if !facts_summary.is_empty() {
        content.push_str("\n\n");
        content.push_str(facts_summary);
    }
    content
}

/// Builds prompts and calls the language model.
#[derive(Clone)]
pub struct CognitiveEngine {
    llm: Arc<dyn LlmProvider>,
    history: Option<Arc<dyn HistoryStore>>,
    facts: Option<Arc<dyn FactStore>>,
    max_context_chars: usize,
    history_limit: usize,
}

impl std::fmt::Debug for CognitiveEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitiveEngine")
            .field("llm", &self.llm.name())
            .field("history", &self.history.is_some())
            .field("facts", &self.facts.is_some())
            .field("max_context_chars", &self.max_context_chars)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

impl CognitiveEngine {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &CognitiveConfig) -> Self {
        Self {
            llm,
            history: None,
            facts: None,
            max_context_chars: config.max_context_chars,
            history_limit: config.history_limit,
        }
    }

    /// Include recent turns from `history` in the prompt.
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Include remembered facts from `facts` in the system message.
    pub fn with_facts(mut self, facts: Arc<dyn FactStore>) -> Self {
        self.facts = Some(facts);
        self
    }

    /// The backend this engine calls.
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Build the message list for one turn.
    pub fn build_context(&self, user_text: &str, user_id: &str) -> Vec<Message> {
        self.build_context_at(user_text, user_id, Local::now())
    }

    /// [`build_context`](Self::build_context) with a fixed clock.
    pub fn build_context_at(
        &self,
        user_text: &str,
        user_id: &str,
        now: DateTime<Local>,
    ) -> Vec<Message> {
        let facts_summary = self
            .facts
            .as_ref()
            .map(|f| f.summary(user_id))
            .unwrap_or_default();
        let system = Message::system(system_message(now, &facts_summary));
        let current = Message::user(user_text);

        let budget = self
            .max_context_chars
            .saturating_sub(system.char_len() + current.char_len());

        let mut messages = vec![system];
        if let Some(history) = self.history.as_ref().filter(|_| budget > 0) {
            let items = history.read(user_id, self.history_limit);
            let mut past: Vec<Message> = Vec::new();
            let mut used = 0;
            for item in items.iter().rev() {
                let user = item.user_content();
                let reply = item.reply.as_str();
                let cost = user.chars().count() + reply.chars().count();
                if used + cost > budget {
                    break;
                }
                // Walking newest-first: prepend reply, then its prompt.
                if !reply.is_empty() {
                    past.push(Message::assistant(reply));
                }
                if !user.is_empty() {
                    past.push(Message::user(user));
                }
                used += cost;
            }
            past.reverse();
            tracing::debug!(user = user_id, pairs = past.len(), used, budget, "history included");
            messages.extend(past);
        }

        messages.push(current);
        messages.push(Message::system(AGENCY_REMINDER));
        messages
    }

    /// Run the first model call over an already built context.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`LlmError`].
    pub async fn think_with(
        &self,
        context: &[Message],
        user_id: &str,
        model: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        tracing::info!(provider = self.llm.name(), model = ?model, user = user_id, "thinking");
        let options = ChatOptions::new()
            .with_model(model)
            .with_tools(true)
            .with_user(user_id);
        self.llm.chat(context, &options).await
    }

    /// Build the context for `user_text` and run the first model call.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`LlmError`].
    pub async fn think(
        &self,
        user_text: &str,
        user_id: &str,
        model: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        let context = self.build_context(user_text, user_id);
        self.think_with(&context, user_id, model).await
    }

    /// Ask for a final answer given the tool-annotated reply.
    ///
    /// Sends `context`, then `tool_output` as the assistant turn, then the
    /// reflection instruction. Tools are disabled for this call.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`LlmError`].
    pub async fn reflect(
        &self,
        tool_output: &str,
        context: &[Message],
        user_id: &str,
        model: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        tracing::info!(provider = self.llm.name(), user = user_id, "reflecting on tool output");
        let mut messages = context.to_vec();
        messages.push(Message::assistant(tool_output));
        messages.push(Message::user(REFLECTION_INSTRUCTION));
        let options = ChatOptions::new().with_model(model).with_user(user_id);
        self.llm.chat(&messages, &options).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::Role;
    use crate::memory::{FileFactStore, FileHistoryStore, HistoryItem, TurnKind};

    #[derive(Default)]
    struct Capture {
        seen: Mutex<Vec<(Vec<Message>, ChatOptions)>>,
    }

    #[async_trait]
    impl LlmProvider for Capture {
        fn name(&self) -> &str {
            "capture"
        }
        async fn generate(&self, _: &str, _: &ChatOptions) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse::text("ok"))
        }
        async fn chat(
            &self,
            messages: &[Message],
            options: &ChatOptions,
        ) -> Result<LlmResponse, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.clone()));
            Ok(LlmResponse::text("respuesta"))
        }
        async fn list_models(&self) -> Result<Vec<String>, LlmError> {
            Ok(vec![])
        }
    }

    fn item(user: &str, text: &str, reply: &str) -> HistoryItem {
        HistoryItem {
            timestamp: HistoryItem::now_timestamp(),
            user_id: user.into(),
            kind: TurnKind::Text,
            provider: "capture".into(),
            model_name: String::new(),
            user_text: text.into(),
            transcript: String::new(),
            reply: reply.into(),
        }
    }

    fn engine(max_chars: usize) -> (CognitiveEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let history = FileHistoryStore::new(dir.path().join("history")).unwrap();
        history.append(&item("u", "hola", "buenas")).unwrap();
        history.append(&item("u", "cómo estás", "bien")).unwrap();
        let config = CognitiveConfig {
            max_context_chars: max_chars,
            history_limit: 10,
        };
        let engine = CognitiveEngine::new(Arc::new(Capture::default()), &config)
            .with_history(Arc::new(history));
        (engine, dir)
    }

    #[test]
    fn layout_is_system_history_user_reminder() {
        let (engine, _dir) = engine(100_000);
        let msgs = engine.build_context("qué hora es", "u");
        let roles: Vec<Role> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::System
            ]
        );
        assert_eq!(msgs[1].content, "hola");
        assert_eq!(msgs[4].content, "bien");
        assert_eq!(msgs[5].content, "qué hora es");
        assert_eq!(msgs[6].content, AGENCY_REMINDER);
        assert!(msgs[0].content.contains("- Hora actual: "));
    }

    #[test]
    fn tiny_budget_includes_no_history() {
        let (engine, _dir) = engine(10);
        let msgs = engine.build_context("hola", "u");
        assert_eq!(msgs.len(), 3);
    }

    #[test]
    fn overflowing_pair_stops_the_walk() {
        let baseline = engine(100_000).0.build_context("x", "u");
        let base = baseline[0].char_len() + 1;
        // Room for the newest pair ("cómo estás" + "bien") only.
        let (engine, _dir) = engine(base + 14 + 5);
        let msgs = engine.build_context("x", "u");
        assert_eq!(msgs.len(), 5);
        assert_eq!(msgs[1].content, "cómo estás");
    }

    #[test]
    fn facts_are_appended_to_system_message() {
        let dir = tempfile::tempdir().unwrap();
        let facts = FileFactStore::new(dir.path()).unwrap();
        facts.set("u", "color", "azul").unwrap();
        let engine = CognitiveEngine::new(Arc::new(Capture::default()), &CognitiveConfig::default())
            .with_facts(Arc::new(facts));
        let msgs = engine.build_context("hola", "u");
        assert!(msgs[0].content.ends_with("- color: azul"));
    }

    #[tokio::test]
    async fn reflect_appends_output_and_instruction_without_tools() {
        let capture = Arc::new(Capture::default());
        let engine = CognitiveEngine::new(capture.clone(), &CognitiveConfig::default());
        let context = engine.build_context("hola", "u");
        engine.think_with(&context, "u", Some("m")).await.unwrap();
        engine
            .reflect("texto\n\n[📦 ENVÍO]: ok", &context, "u", None)
            .await
            .unwrap();

        let seen = capture.seen.lock().unwrap();
        assert!(seen[0].1.enable_tools);
        assert_eq!(seen[0].1.model.as_deref(), Some("m"));
        let (msgs, opts) = &seen[1];
        assert!(!opts.enable_tools);
        assert_eq!(msgs.len(), context.len() + 2);
        assert_eq!(msgs[msgs.len() - 2].role, Role::Assistant);
        assert_eq!(msgs[msgs.len() - 1].content, REFLECTION_INSTRUCTION);
    }
}
