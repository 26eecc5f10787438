//! One streamed assistant reply per user turn.

use providers::GenerativeClient;
use shared::agent_api::{ChatRequest, StreamChunk};
use shared::chat::{ChatModeConfig, ImageAttachment, MessageId};
use shared::settings::ModelSet;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

use crate::aggregate::{apply_chunk, history_from};
use crate::modes::select_chat_config;
use crate::session::ChatSession;

/// Shown in place of the reply when a turn fails.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// What the user submitted for this turn.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub text: String,
    pub image: Option<ImageAttachment>,
}

impl TurnInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing to send: no text and no image.
    Skipped,
    Completed { message_id: MessageId },
    /// The reply was replaced with [`APOLOGY`].
    Failed { message_id: MessageId },
}

pub struct ChatTurnController {
    client: Arc<dyn GenerativeClient>,
    models: ModelSet,
}

impl ChatTurnController {
    pub fn new(client: Arc<dyn GenerativeClient>, models: ModelSet) -> Self {
        Self { client, models }
    }

    /// Run one turn: append the user message and a placeholder reply, stream
    /// the provider's answer into the placeholder, and publish after every
    /// chunk.
    ///
    /// `mode` is read once, when the turn starts. With an image attached the
    /// turn goes to image analysis and the mode toggles are ignored.
    pub async fn send(
        &self,
        session: &mut ChatSession,
        input: TurnInput,
        mode: &ChatModeConfig,
    ) -> TurnOutcome {
        if input.is_empty() {
            return TurnOutcome::Skipped;
        }

        let history = history_from(session.messages());
        session.push_user(&input.text, input.image.clone());
        let reply_id = session.push_placeholder();

        let (tx, mut rx) = unbounded_channel::<StreamChunk>();
        let with_grounding = input.image.is_none();

        let call = async {
            match &input.image {
                Some(image) => {
                    tracing::info!(mime = %image.mime_type, "chat turn: image analysis");
                    self.client
                        .stream_image_analysis(&input.text, image, tx)
                        .await
                }
                None => {
                    let config = select_chat_config(mode, &self.models);
                    let tools: Vec<&str> = config.tools.iter().map(|t| t.as_str()).collect();
                    tracing::info!(
                        model = %config.model,
                        tools = %tools.join(","),
                        thinking = config.thinking_budget.is_some(),
                        "chat turn"
                    );
                    let request = ChatRequest {
                        history,
                        message: input.text.clone(),
                        config,
                    };
                    self.client.stream_chat(request, tx).await
                }
            }
        };

        let fold = async {
            let mut chunks = 0usize;
            let mut stream_error: Option<String> = None;
            while let Some(chunk) = rx.recv().await {
                match chunk {
                    StreamChunk::Delta { text, grounding } => {
                        if stream_error.is_some() {
                            continue;
                        }
                        chunks += 1;
                        session.update(reply_id, |message| {
                            apply_chunk(message, &text, &grounding, with_grounding)
                        });
                    }
                    StreamChunk::Done { stop_reason } => {
                        tracing::debug!(?stop_reason, chunks, "stream finished");
                    }
                    StreamChunk::Error(err) => {
                        stream_error.get_or_insert(err);
                    }
                }
            }
            (chunks, stream_error)
        };

        let (call_result, (chunks, stream_error)) = tokio::join!(call, fold);

        let failure = match (call_result, stream_error) {
            (Err(err), _) => Some(err.to_string()),
            (Ok(()), Some(err)) => Some(err),
            (Ok(()), None) => None,
        };

        match failure {
            Some(err) => {
                tracing::error!(%reply_id, chunks, "chat turn failed: {}", err);
                session.update(reply_id, |message| message.text = APOLOGY.to_string());
                TurnOutcome::Failed {
                    message_id: reply_id,
                }
            }
            None => {
                tracing::info!(%reply_id, chunks, "chat turn complete");
                TurnOutcome::Completed {
                    message_id: reply_id,
                }
            }
        }
    }
}
