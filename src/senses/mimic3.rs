//! Text-to-speech through the `mimic3` command-line synthesizer.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::wav::decode_wav;
use super::{SynthesizedAudio, TtsProvider};
use crate::config::TtsConfig;
use crate::error::{LucyError, Result};
use crate::exec::run_command;

/// Cached syntheses kept before least-recently-used eviction.
pub const CACHE_CAPACITY: u64 = 100;
const SYNTH_TIMEOUT: Duration = Duration::from_secs(60);

/// `mimic3 --voice {voice} --stdout` with text on stdin.
#[derive(Debug)]
pub struct Mimic3Tts {
    binary: Option<PathBuf>,
    voice: String,
    length_scale: Option<f32>,
    cache: Cache<String, SynthesizedAudio>,
}

impl Mimic3Tts {
    /// Locate `mimic3` on `PATH`. A missing binary is logged and every
    /// uncached synthesis then fails.
    pub fn new(config: &TtsConfig) -> Self {
        let binary = which::which("mimic3").ok();
        if binary.is_none() {
            tracing::warn!("mimic3 not found in PATH, voice output disabled");
        }
        Self::with_binary(binary, config)
    }

    /// Use an explicit binary path.
    pub fn with_binary(binary: Option<PathBuf>, config: &TtsConfig) -> Self {
        Self {
            binary,
            voice: config.voice.clone(),
            length_scale: config.length_scale,
            cache: Cache::builder().max_capacity(CACHE_CAPACITY).build(),
        }
    }

    /// Whether a binary was found.
    pub fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    /// Command-line arguments for one synthesis.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["--voice".to_owned(), self.voice.clone(), "--stdout".to_owned()];
        if let Some(scale) = self.length_scale {
            args.push("--length-scale".to_owned());
            args.push(scale.to_string());
        }
        args
    }

    fn cache_key(&self, text: &str) -> String {
        format!("{}:{text}", self.voice)
    }
}

#[async_trait]
impl TtsProvider for Mimic3Tts {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let key = self.cache_key(text);
        if let Some(audio) = self.cache.get(&key).await {
            tracing::debug!(entries = self.cache.entry_count(), "tts cache hit");
            return Ok(audio);
        }
        let Some(binary) = &self.binary else {
            return Err(LucyError::Tts("mimic3 not found".into()));
        };

        let program = binary.to_string_lossy();
        let out = run_command(&program, &self.args(), SYNTH_TIMEOUT, Some(text.as_bytes()))
            .await
            .map_err(|e| LucyError::Tts(e.to_string()))?;
        if !out.success() {
            return Err(LucyError::Tts(format!(
                "mimic3 failed: {}",
                out.stderr_text().trim()
            )));
        }
        let (samples, sample_rate) = decode_wav(&out.stdout)?;
        let audio = SynthesizedAudio {
            samples,
            sample_rate,
        };

        self.cache.insert(key, audio.clone()).await;
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn audio(n: usize) -> SynthesizedAudio {
        SynthesizedAudio {
            samples: vec![0.0; n],
            sample_rate: 22_050,
        }
    }

    #[test]
    fn args_include_length_scale_when_set() {
        let config = TtsConfig {
            voice: "es_ES/x".into(),
            length_scale: Some(1.2),
        };
        let tts = Mimic3Tts::with_binary(None, &config);
        assert_eq!(
            tts.args(),
            vec!["--voice", "es_ES/x", "--stdout", "--length-scale", "1.2"]
        );
        assert!(!tts.is_available());
    }

    #[tokio::test]
    async fn cached_audio_is_served_without_the_binary() {
        let tts = Mimic3Tts::with_binary(None, &TtsConfig::default());
        tts.cache.insert(tts.cache_key("hola"), audio(3)).await;
        let hit = tts.synthesize("hola").await.unwrap();
        assert_eq!(hit.samples.len(), 3);
        assert!(tts.synthesize("chau").await.is_err());
    }

    #[tokio::test]
    async fn cache_stays_bounded() {
        let tts = Mimic3Tts::with_binary(None, &TtsConfig::default());
        for i in 0..(CACHE_CAPACITY * 3) {
            tts.cache.insert(format!("k{i}"), audio(1)).await;
        }
        tts.cache.run_pending_tasks().await;
        assert!(tts.cache.entry_count() <= CACHE_CAPACITY);
    }

    #[test]
    fn cache_key_includes_voice() {
        let a = Mimic3Tts::with_binary(None, &TtsConfig { voice: "a".into(), length_scale: None });
        let b = Mimic3Tts::with_binary(None, &TtsConfig { voice: "b".into(), length_scale: None });
        assert_ne!(a.cache_key("hola"), b.cache_key("hola"));
    }

    #[tokio::test]
    async fn missing_binary_fails() {
        let tts = Mimic3Tts::with_binary(None, &TtsConfig::default());
        assert!(tts.synthesize("hola").await.is_err());
    }
}
