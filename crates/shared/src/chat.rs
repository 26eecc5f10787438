//! Chat data model shared by the turn controller, the provider client and the
//! front-end.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session-local message identifier. Ids increase in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// An uploaded image, kept as base64 so it can be sent inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub data: String,
    pub mime_type: String,
}

/// A citation attached to a model reply. `uri` is the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: Option<String>,
    pub uri: String,
}

impl GroundingSource {
    /// Label shown to the user: the title when present, otherwise the uri.
    pub fn label(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.uri,
        }
    }
}

/// Grounding entry as reported by the provider. Web results and maps results
/// arrive under different keys; anything else is carried as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroundingChunk {
    Web {
        uri: Option<String>,
        title: Option<String>,
    },
    Maps {
        uri: Option<String>,
        title: Option<String>,
    },
    Unknown,
}

impl GroundingChunk {
    /// Normalize to a source. Entries without a uri yield nothing.
    pub fn source(&self) -> Option<GroundingSource> {
        let (uri, title) = match self {
            GroundingChunk::Web { uri, title } | GroundingChunk::Maps { uri, title } => {
                (uri.as_ref()?, title)
            }
            GroundingChunk::Unknown => return None,
        };
        if uri.is_empty() {
            return None;
        }
        Some(GroundingSource {
            title: title.clone(),
            uri: uri.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Feature toggles for the chat assistant. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChatModeConfig {
    pub use_thinking: bool,
    pub use_search: bool,
    pub use_maps: bool,
    pub location: Option<GeoLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<GroundingSource>,
}

impl ChatMessage {
    pub fn user(id: MessageId, text: impl Into<String>, image: Option<ImageAttachment>) -> Self {
        Self {
            id,
            role: Role::User,
            text: text.into(),
            image,
            sources: Vec::new(),
        }
    }

    /// Empty model message that a streaming reply is folded into.
    pub fn placeholder(id: MessageId) -> Self {
        Self {
            id,
            role: Role::Model,
            text: String::new(),
            image: None,
            sources: Vec::new(),
        }
    }
}
