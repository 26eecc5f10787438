//! Generative response client: news generation, speech synthesis, image
//! analysis and chat streaming against the Gemini API.

pub mod gemini;
pub mod news;
pub mod sse;

pub use gemini::GeminiClient;

use shared::agent_api::{ChatRequest, StreamChunk};
use shared::chat::ImageAttachment;
use shared::news::ArticleDraft;
use shared::DripError;
use tokio::sync::mpsc::UnboundedSender;

/// Provider boundary consumed by the chat controller and the news desk.
///
/// Streaming calls follow one contract: a failure before any chunk is sent
/// returns `Err`; once streaming has started, failures arrive as
/// `StreamChunk::Error` and the call returns `Ok(())`. The sender is dropped
/// when the call returns, which closes the stream.
#[async_trait::async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Today's curated articles (five expected).
    async fn fetch_daily_news(&self) -> Result<Vec<ArticleDraft>, DripError>;

    /// Base64 PCM (16-bit, 24 kHz, mono) for `text`.
    async fn synthesize_speech(&self, text: &str) -> Result<String, DripError>;

    /// Single-turn analysis of an image. Only text deltas are produced.
    async fn stream_image_analysis(
        &self,
        prompt: &str,
        image: &ImageAttachment,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<(), DripError>;

    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<(), DripError>;
}
