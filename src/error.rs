//! Error types for the Lucy assistant.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum LucyError {
    /// Configuration could not be read, parsed or written.
    #[error("config error: {0}")]
    Config(String),

    /// Fact or history storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Speech recognition error.
    #[error("ASR error: {0}")]
    Asr(String),

    /// Speech synthesis error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Subprocess spawn or wait error.
    #[error("process error: {0}")]
    Process(String),

    /// Language model backend error.
    #[error(transparent)]
    Llm(#[from] crate::llm::LlmError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, LucyError>;
