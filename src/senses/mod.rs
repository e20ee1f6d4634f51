//! Hearing and speaking.
//!
//! Speech recognition and synthesis are collaborators behind the
//! [`AsrProvider`] and [`TtsProvider`] traits. [`Senses`] wraps them so
//! that a failure never fails a turn: a broken recognizer hears nothing
//! and a broken synthesizer produces empty audio.

pub mod mimic3;
pub mod normalize;
pub mod wav;

use std::sync::Arc;

use async_trait::async_trait;

pub use mimic3::Mimic3Tts;
pub use normalize::normalize_for_tts;
pub use wav::{decode_audio_bytes, decode_wav, encode_wav_f32};

use crate::error::Result;

/// Recognized speech.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcription {
    pub text: String,
    /// Detected or configured language code.
    pub language: String,
}

/// Synthesized speech, mono float samples.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SynthesizedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Speech-to-text engine.
#[async_trait]
pub trait AsrProvider: Send + Sync {
    /// Transcribe mono float samples at `sample_rate`.
    async fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<Transcription>;
}

/// Text-to-speech engine.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio>;
}

/// A spoken reply encoded as WAV. Empty when synthesis failed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpokenReply {
    pub wav: Vec<u8>,
    pub sample_rate: u32,
}

/// Optional recognizer and synthesizer.
#[derive(Clone, Default)]
pub struct Senses {
    asr: Option<Arc<dyn AsrProvider>>,
    tts: Option<Arc<dyn TtsProvider>>,
}

impl std::fmt::Debug for Senses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Senses")
            .field("asr", &self.asr.is_some())
            .field("tts", &self.tts.is_some())
            .finish()
    }
}

impl Senses {
    pub fn new(asr: Option<Arc<dyn AsrProvider>>, tts: Option<Arc<dyn TtsProvider>>) -> Self {
        Self { asr, tts }
    }

    /// Transcribe `samples`. Returns an empty string on silence, on a
    /// missing recognizer or on failure.
    pub async fn listen(&self, samples: &[f32], sample_rate: u32) -> String {
        let Some(asr) = &self.asr else {
            tracing::warn!("no speech recognizer configured");
            return String::new();
        };
        match asr.transcribe(samples, sample_rate).await {
            Ok(result) => {
                let text = result.text.trim().to_owned();
                if !text.is_empty() {
                    tracing::info!(language = %result.language, chars = text.chars().count(), "heard");
                }
                text
            }
            Err(e) => {
                tracing::error!(error = %e, "speech recognition failed");
                String::new()
            }
        }
    }

    /// Normalize `text` for speech, synthesize it and encode WAV.
    pub async fn speak(&self, text: &str) -> SpokenReply {
        let Some(tts) = &self.tts else {
            return SpokenReply::default();
        };
        let clean = normalize_for_tts(text);
        if clean.is_empty() {
            return SpokenReply::default();
        }
        let encoded = tts.synthesize(&clean).await.and_then(|audio| {
            encode_wav_f32(&audio.samples, audio.sample_rate).map(|wav| SpokenReply {
                wav,
                sample_rate: audio.sample_rate,
            })
        });
        encoded.unwrap_or_else(|e| {
            tracing::error!(error = %e, "speech synthesis failed");
            SpokenReply::default()
        })
    }
}
