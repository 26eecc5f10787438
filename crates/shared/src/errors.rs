//! Error taxonomy for provider calls, local audio and storage.

/// Failures surfaced by Daily Drip operations. Each one is terminal for the
/// operation that raised it; nothing is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum DripError {
    /// Transport, auth or rate-limit failure from the AI backend.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Structured output did not match the expected shape.
    #[error("Could not parse provider response: {0}")]
    Parse(String),

    #[error("No audio data returned from API.")]
    NoAudio,

    /// Local decode or playback failure.
    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DripError {
    pub fn provider(err: impl std::fmt::Display) -> Self {
        DripError::Provider(err.to_string())
    }

    pub fn parse(err: impl std::fmt::Display) -> Self {
        DripError::Parse(err.to_string())
    }

    pub fn playback(err: impl std::fmt::Display) -> Self {
        DripError::Playback(err.to_string())
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        DripError::Storage(err.to_string())
    }
}
