//! Configuration types for Lucy.
//!
//! Loaded from TOML. Every section has defaults, so a partial file (or
//! none at all) is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::LucyError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LucyConfig {
    /// Which language model backend to use.
    pub llm: LlmConfig,
    /// Local Ollama server settings.
    pub ollama: OllamaConfig,
    /// CLI gateway backend settings.
    pub gateway: GatewayConfig,
    /// Speech recognition settings.
    pub asr: AsrConfig,
    /// Speech synthesis settings.
    pub tts: TtsConfig,
    /// Audio input settings.
    pub audio: AudioConfig,
    /// Tool sandbox and safe-mode settings.
    pub tools: ToolsConfig,
    /// Prompt construction limits.
    pub cognitive: CognitiveConfig,
    /// Turn retry and history policy.
    pub orchestrator: OrchestratorConfig,
    /// n8n workflow webhooks.
    pub n8n: N8nConfig,
    /// Web search settings.
    pub search: SearchSettings,
}

/// Language model backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Local Ollama HTTP server.
    #[default]
    Ollama,
    /// Agent CLI gateway, one subprocess per request.
    Gateway,
}

/// `[llm]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend used for think and reflect calls.
    pub provider: LlmBackend,
}

/// `[ollama]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server.
    pub host: String,
    /// Default model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:11434".into(),
            model: "gpt-oss:20b".into(),
            timeout_secs: 120,
        }
    }
}

/// `[gateway]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway executable, looked up on `PATH`.
    pub binary: String,
    /// Agent identifier passed as `--agent`.
    pub agent_id: String,
    /// Timeout passed to the gateway; the subprocess gets ten seconds more.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            binary: "clawdbot".into(),
            agent_id: "main".into(),
            timeout_secs: 120,
        }
    }
}

/// `[asr]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    /// Model identifier for the recognizer.
    pub model: String,
    /// Expected spoken language.
    pub language: String,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            model: "Systran/faster-whisper-small".into(),
            language: "es".into(),
        }
    }
}

/// `[tts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Voice name passed to the synthesizer.
    pub voice: String,
    /// Speaking rate multiplier (`1.0` = normal).
    pub length_scale: Option<f32>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice: "es_ES/m-ailabs_low#karen_savage".into(),
            length_scale: None,
        }
    }
}

/// `[audio]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
        }
    }
}

/// `[tools]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Disables destructive or sensitive tools.
    pub safe_mode: bool,
    /// Root directory for file tools. `None` means the current directory.
    pub project_root: Option<PathBuf>,
    /// Wall-clock limit for `os_run` commands.
    pub command_timeout_secs: u64,
    /// Wall-clock limit for window manager commands.
    pub window_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            safe_mode: false,
            project_root: None,
            command_timeout_secs: 10,
            window_timeout_secs: 5,
        }
    }
}

impl ToolsConfig {
    /// The effective project root.
    pub fn resolved_project_root(&self) -> PathBuf {
        self.project_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// `[cognitive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveConfig {
    /// Character budget for the whole prompt.
    pub max_context_chars: usize,
    /// How many past turns to consider for the prompt.
    pub history_limit: usize,
}

impl Default for CognitiveConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 16_000,
            history_limit: 10,
        }
    }
}

/// `[orchestrator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Extra think attempts after the first failure.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub base_delay_ms: u64,
    /// Backoff ceiling.
    pub max_delay_ms: u64,
    /// Replies shorter than this (after trimming) count as failures.
    pub min_reply_chars: usize,
    /// Append every completed turn to the history store.
    pub record_history: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 4_000,
            min_reply_chars: 2,
            record_history: true,
        }
    }
}

/// `[n8n]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct N8nConfig {
    /// Base URL of the n8n instance. Workflow tools are only registered
    /// when this is set.
    pub base_url: Option<String>,
    /// Prefix prepended to every workflow id in the webhook path.
    pub webhook_prefix: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for N8nConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            webhook_prefix: String::new(),
            timeout_secs: 30,
        }
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Number of results handed to the model.
    pub max_results: usize,
    /// HTTP timeout in seconds for searches and page reads.
    pub timeout_secs: u64,
    /// Results endpoint override. `None` uses DuckDuckGo.
    pub endpoint: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 5,
            timeout_secs: 10,
            endpoint: None,
        }
    }
}

impl SearchSettings {
    /// Translate into the search crate's configuration.
    pub fn to_search_config(&self) -> lucy_search::SearchConfig {
        let mut config = lucy_search::SearchConfig {
            max_results: self.max_results,
            timeout_seconds: self.timeout_secs,
            ..Default::default()
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        config
    }
}

impl LucyConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| LucyError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error only when an existing file is unreadable or invalid.
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LucyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::lucy_dirs::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn defaults_match_runtime_expectations() {
        let config = LucyConfig::default();
        assert_eq!(config.llm.provider, LlmBackend::Ollama);
        assert_eq!(config.cognitive.max_context_chars, 16_000);
        assert_eq!(config.cognitive.history_limit, 10);
        assert_eq!(config.orchestrator.max_retries, 2);
        assert_eq!(config.tools.command_timeout_secs, 10);
        assert!(!config.tools.safe_mode);
        assert!(config.n8n.base_url.is_none());
        assert_eq!(config.search.max_results, 5);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let toml_str = r#"
[llm]
provider = "gateway"

[tools]
safe_mode = true
"#;
        let config: LucyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, LlmBackend::Gateway);
        assert!(config.tools.safe_mode);
        assert_eq!(config.tools.command_timeout_secs, 10);
        assert_eq!(config.ollama.host, "http://127.0.0.1:11434");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = LucyConfig::default();
        config.n8n.base_url = Some("http://localhost:5678".into());
        config.n8n.webhook_prefix = "lucy-".into();
        config.save_to_file(&path).unwrap();

        let loaded = LucyConfig::from_file(&path).unwrap();
        assert_eq!(loaded.n8n.base_url.as_deref(), Some("http://localhost:5678"));
        assert_eq!(loaded.n8n.webhook_prefix, "lucy-");
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        match LucyConfig::from_file(&path) {
            Err(LucyError::Config(_)) => {}
            other => unreachable!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LucyConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.ollama.model, "gpt-oss:20b");
    }

    #[test]
    fn search_settings_override_endpoint() {
        let settings = SearchSettings {
            endpoint: Some("http://127.0.0.1:9/html/".into()),
            ..Default::default()
        };
        let search = settings.to_search_config();
        assert_eq!(search.endpoint, "http://127.0.0.1:9/html/");
        assert_eq!(search.max_results, 5);
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = LucyConfig::default_config_path();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
