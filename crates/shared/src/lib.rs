pub mod chat;
pub mod errors;
pub mod news;

pub use errors::DripError;

pub mod settings {
    use serde::{Deserialize, Serialize};

    use crate::chat::GeoLocation;

    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

    /// Model identifiers used for each kind of request.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ModelSet {
        pub news_model: String,   // structured news generation
        pub tts_model: String,    // speech synthesis
        pub image_model: String,  // single-turn image analysis
        pub lite_model: String,   // default chat model
        pub mid_model: String,    // search / maps grounding
        pub pro_model: String,    // deep reasoning
        pub thinking_budget: u32, // tokens granted to the reasoning model
        pub voice: String,
    }

    impl Default for ModelSet {
        fn default() -> Self {
            Self {
                news_model: "gemini-2.5-flash".into(),
                tts_model: "gemini-2.5-flash-preview-tts".into(),
                image_model: "gemini-2.5-flash".into(),
                lite_model: "gemini-2.5-flash-lite".into(),
                mid_model: "gemini-2.5-flash".into(),
                pro_model: "gemini-2.5-pro".into(),
                thinking_budget: 32768,
                voice: "Kore".into(),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct ProviderAuth {
        pub api_key: Option<String>,
    }

    /// Missing fields take their defaults, so a file may set only `auth`.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct GeminiSettings {
        pub base_url: String,
        pub auth: ProviderAuth,
        pub models: ModelSet,
        /// Request timeout in seconds.
        pub timeout_secs: u64,
    }

    impl Default for GeminiSettings {
        fn default() -> Self {
            Self {
                base_url: DEFAULT_BASE_URL.into(),
                auth: ProviderAuth::default(),
                models: ModelSet::default(),
                timeout_secs: 120,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct AppSettings {
        #[serde(default)]
        pub gemini: GeminiSettings,
        /// Overrides the platform data directory for persisted state.
        #[serde(default)]
        pub data_dir: Option<String>,
        /// Where exported brews are written; defaults to the current directory.
        #[serde(default)]
        pub export_dir: Option<String>,
        /// Location handed to maps grounding when the user enables it.
        #[serde(default)]
        pub location: Option<GeoLocation>,
    }
}

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    use crate::chat::{GeoLocation, GroundingChunk, Role};

    /// One prior turn as replayed to the provider. Images and sources stay local.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct HistoryEntry {
        pub role: Role,
        pub text: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum ChatTool {
        WebSearch,
        Maps,
    }

    impl ChatTool {
        pub fn as_str(&self) -> &'static str {
            match self {
                ChatTool::WebSearch => "web-search",
                ChatTool::Maps => "maps",
            }
        }
    }

    /// Model and tool configuration for one chat turn.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ChatModelConfig {
        pub model: String,
        pub thinking_budget: Option<u32>,
        pub tools: Vec<ChatTool>,
        /// Only set when maps grounding is enabled and a location is known.
        pub location: Option<GeoLocation>,
    }

    #[derive(Debug, Clone)]
    pub struct ChatRequest {
        pub history: Vec<HistoryEntry>,
        pub message: String,
        pub config: ChatModelConfig,
    }

    /// Incremental output of a streaming call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum StreamChunk {
        Delta {
            text: String,
            grounding: Vec<GroundingChunk>,
        },
        Done {
            stop_reason: Option<String>,
        },
        Error(String),
    }

    impl StreamChunk {
        pub fn text(text: impl Into<String>) -> Self {
            StreamChunk::Delta {
                text: text.into(),
                grounding: Vec::new(),
            }
        }
    }
}
