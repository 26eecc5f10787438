use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::agent_api::{ChatModelConfig, ChatRequest, ChatTool, HistoryEntry, StreamChunk};
use shared::chat::{GeoLocation, GroundingChunk, ImageAttachment};
use shared::news::ArticleDraft;
use shared::settings::{GeminiSettings, ModelSet};
use shared::DripError;
use std::env;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;
use zeroize::Zeroizing;

use crate::news::{news_schema, parse_news, NEWS_PROMPT};
use crate::sse::SseParser;
use crate::GenerativeClient;

const API_VERSION: &str = "v1beta";

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

impl GeminiRequest {
    fn new(contents: Vec<GeminiContent>) -> Self {
        Self {
            contents,
            generation_config: None,
            tools: Vec::new(),
            tool_config: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![GeminiPart::text(text)],
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    /// Marks reasoning output, which is not part of the reply text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

/// Serializes as `{}`.
#[derive(Debug, Default, Serialize)]
struct EmptyObject {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum GeminiTool {
    GoogleSearch(EmptyObject),
    GoogleMaps(EmptyObject),
}

impl From<ChatTool> for GeminiTool {
    fn from(tool: ChatTool) -> Self {
        match tool {
            ChatTool::WebSearch => GeminiTool::GoogleSearch(EmptyObject {}),
            ChatTool::Maps => GeminiTool::GoogleMaps(EmptyObject {}),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    retrieval_config: RetrievalConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfig {
    lat_lng: LatLng,
}

#[derive(Debug, Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl From<GeoLocation> for ToolConfig {
    fn from(location: GeoLocation) -> Self {
        Self {
            retrieval_config: RetrievalConfig {
                lat_lng: LatLng {
                    latitude: location.latitude,
                    longitude: location.longitude,
                },
            },
        }
    }
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct WireGroundingChunk {
    #[serde(default)]
    web: Option<WireSource>,
    #[serde(default)]
    maps: Option<WireSource>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl From<WireGroundingChunk> for GroundingChunk {
    fn from(chunk: WireGroundingChunk) -> Self {
        match (chunk.web, chunk.maps) {
            (Some(web), _) => GroundingChunk::Web {
                uri: web.uri,
                title: web.title,
            },
            (None, Some(maps)) => GroundingChunk::Maps {
                uri: maps.uri,
                title: maps.title,
            },
            (None, None) => GroundingChunk::Unknown,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiApiError {
    fn describe(&self) -> String {
        match (self.code, self.status.as_deref()) {
            (Some(code), Some(status)) => format!("{} {}: {}", code, status, self.message),
            (Some(code), None) => format!("{}: {}", code, self.message),
            _ => self.message.clone(),
        }
    }
}

impl GeminiResponse {
    fn first_candidate(&self) -> Option<&GeminiCandidate> {
        self.candidates.first()
    }

    /// Reply text of the first candidate, skipping reasoning parts.
    fn text(&self) -> String {
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| p.thought != Some(true))
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn grounding(self) -> Vec<GroundingChunk> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.grounding_metadata)
            .map(|m| m.grounding_chunks.into_iter().map(Into::into).collect())
            .unwrap_or_default()
    }

    fn inline_audio(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.inline_data)
            .map(|d| d.data)
            .filter(|data| !data.is_empty())
    }
}

// ── Client ───────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: Client,
    auth_token: Zeroizing<String>,
    base_url: Url,
    models: ModelSet,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str, models: ModelSet) -> Result<Self, DripError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(DripError::provider)?;
        Self::with_http(http, api_key, base_url, models)
    }

    /// Build from settings, falling back to `GEMINI_API_KEY` when no key is stored.
    pub fn from_settings(settings: &GeminiSettings) -> Result<Self, DripError> {
        let api_key = match &settings.auth.api_key {
            Some(key) if !key.trim().is_empty() => key.clone(),
            _ => env::var("GEMINI_API_KEY")
                .map_err(|_| DripError::Config("No Gemini authentication configured".into()))?,
        };
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(DripError::provider)?;
        Self::with_http(http, &api_key, &settings.base_url, settings.models.clone())
    }

    fn with_http(
        http: Client,
        api_key: &str,
        base_url: &str,
        models: ModelSet,
    ) -> Result<Self, DripError> {
        // join() drops the last path segment unless the base ends with a slash
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| DripError::Config(format!("invalid base url {}: {}", base_url, e)))?;
        Ok(Self {
            http,
            auth_token: Zeroizing::new(api_key.to_string()),
            base_url,
            models,
        })
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    fn endpoint(&self, model: &str, method: &str, stream: bool) -> Result<Url, DripError> {
        let mut url = self
            .base_url
            .join(&format!("{}/models/{}:{}", API_VERSION, model, method))
            .map_err(|e| DripError::Config(format!("invalid model endpoint: {}", e)))?;
        if stream {
            url.query_pairs_mut().append_pair("alt", "sse");
        }
        Ok(url)
    }

    async fn post(
        &self,
        model: &str,
        method: &str,
        stream: bool,
        req: &GeminiRequest,
    ) -> Result<Response, DripError> {
        let url = self.endpoint(model, method, stream)?;
        tracing::debug!(model, method, "gemini request");
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", self.auth_token.as_str())
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await
            .map_err(DripError::provider)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.trim().chars().take(800).collect();
            if detail.is_empty() {
                return Err(DripError::Provider(format!("gemini error: {}", status)));
            }
            return Err(DripError::Provider(format!(
                "gemini error: {}\n{}",
                status, detail
            )));
        }
        Ok(resp)
    }

    async fn generate(&self, model: &str, req: &GeminiRequest) -> Result<GeminiResponse, DripError> {
        let resp = self.post(model, "generateContent", false, req).await?;
        let body: GeminiResponse = resp.json().await.map_err(DripError::parse)?;
        if let Some(err) = &body.error {
            return Err(DripError::Provider(err.describe()));
        }
        Ok(body)
    }

    /// Stream a request and forward every SSE event as a [`StreamChunk`].
    ///
    /// Errors before the first byte are returned; later failures are sent
    /// through `tx` as `StreamChunk::Error`.
    async fn stream_generate(
        &self,
        model: &str,
        req: &GeminiRequest,
        with_grounding: bool,
        tx: &UnboundedSender<StreamChunk>,
    ) -> Result<(), DripError> {
        let resp = self
            .post(model, "streamGenerateContent", true, req)
            .await?;

        let mut parser = SseParser::new();
        let mut stream = resp.bytes_stream();
        let mut stop_reason: Option<String> = None;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {}", e)));
                    return Ok(());
                }
            };
            for event in parser.feed(&bytes) {
                if !forward_event(&event.data, with_grounding, &mut stop_reason, tx) {
                    return Ok(());
                }
            }
        }
        if let Some(event) = parser.finish() {
            if !forward_event(&event.data, with_grounding, &mut stop_reason, tx) {
                return Ok(());
            }
        }

        let _ = tx.send(StreamChunk::Done { stop_reason });
        Ok(())
    }

    fn chat_request(&self, request: ChatRequest) -> GeminiRequest {
        let ChatRequest {
            history,
            message,
            config,
        } = request;
        let ChatModelConfig {
            thinking_budget,
            tools,
            location,
            ..
        } = config;

        let mut contents: Vec<GeminiContent> = history
            .iter()
            .map(|HistoryEntry { role, text }| GeminiContent::text(role.as_str(), text))
            .collect();
        contents.push(GeminiContent::text("user", &message));

        let mut req = GeminiRequest::new(contents);
        if let Some(budget) = thinking_budget {
            req.generation_config = Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: budget,
                }),
                ..Default::default()
            });
        }
        req.tools = tools.into_iter().map(GeminiTool::from).collect();
        req.tool_config = location.map(ToolConfig::from);
        req
    }
}

/// Decode one SSE payload and forward it. Returns false when the stream
/// should stop because an error was reported.
fn forward_event(
    data: &str,
    with_grounding: bool,
    stop_reason: &mut Option<String>,
    tx: &UnboundedSender<StreamChunk>,
) -> bool {
    let body: GeminiResponse = match serde_json::from_str(data) {
        Ok(body) => body,
        Err(e) => {
            let _ = tx.send(StreamChunk::Error(format!(
                "Failed to parse Gemini stream: {}",
                e
            )));
            return false;
        }
    };
    if let Some(err) = &body.error {
        let _ = tx.send(StreamChunk::Error(err.describe()));
        return false;
    }
    if let Some(reason) = body.first_candidate().and_then(|c| c.finish_reason.clone()) {
        *stop_reason = Some(reason);
    }

    let text = body.text();
    let grounding = if with_grounding {
        body.grounding()
    } else {
        Vec::new()
    };
    let _ = tx.send(StreamChunk::Delta { text, grounding });
    true
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn fetch_daily_news(&self) -> Result<Vec<ArticleDraft>, DripError> {
        let mut req = GeminiRequest::new(vec![GeminiContent::text("user", NEWS_PROMPT)]);
        req.generation_config = Some(GenerationConfig {
            response_mime_type: Some("application/json".into()),
            response_schema: Some(news_schema()),
            ..Default::default()
        });
        let body = self.generate(&self.models.news_model, &req).await?;
        parse_news(&body.text())
    }

    async fn synthesize_speech(&self, text: &str) -> Result<String, DripError> {
        let mut req = GeminiRequest::new(vec![GeminiContent {
            role: None,
            parts: vec![GeminiPart::text(text)],
        }]);
        req.generation_config = Some(GenerationConfig {
            response_modalities: Some(vec!["AUDIO".into()]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: self.models.voice.clone(),
                    },
                },
            }),
            ..Default::default()
        });
        let body = self.generate(&self.models.tts_model, &req).await?;
        body.inline_audio().ok_or(DripError::NoAudio)
    }

    async fn stream_image_analysis(
        &self,
        prompt: &str,
        image: &ImageAttachment,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<(), DripError> {
        let image_part = GeminiPart {
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            }),
            ..Default::default()
        };
        let req = GeminiRequest::new(vec![GeminiContent {
            role: Some("user".into()),
            parts: vec![image_part, GeminiPart::text(prompt)],
        }]);
        self.stream_generate(&self.models.image_model, &req, false, &tx)
            .await
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<(), DripError> {
        let model = request.config.model.clone();
        let req = self.chat_request(request);
        self.stream_generate(&model, &req, true, &tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::chat::Role;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", "http://localhost:9", ModelSet::default()).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let c = GeminiClient::new("k", "http://proxy.local/gemini", ModelSet::default()).unwrap();
        let url = c.endpoint("gemini-2.5-flash", "streamGenerateContent", true).unwrap();
        assert_eq!(
            url.as_str(),
            "http://proxy.local/gemini/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            history: vec![
                HistoryEntry {
                    role: Role::User,
                    text: "hi".into(),
                },
                HistoryEntry {
                    role: Role::Model,
                    text: "hello".into(),
                },
            ],
            message: "coffee near me?".into(),
            config: ChatModelConfig {
                model: "gemini-2.5-flash".into(),
                thinking_budget: None,
                tools: vec![ChatTool::WebSearch, ChatTool::Maps],
                location: Some(GeoLocation {
                    latitude: 45.5,
                    longitude: -122.6,
                }),
            },
        };
        let value = serde_json::to_value(client().chat_request(request)).unwrap();
        assert_eq!(value["contents"][1]["role"], json!("model"));
        assert_eq!(value["contents"][2]["parts"][0]["text"], json!("coffee near me?"));
        assert_eq!(
            value["tools"],
            json!([{"googleSearch": {}}, {"googleMaps": {}}])
        );
        assert_eq!(
            value["toolConfig"]["retrievalConfig"]["latLng"]["latitude"],
            json!(45.5)
        );
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn test_thinking_budget_serialized() {
        let request = ChatRequest {
            history: vec![],
            message: "why?".into(),
            config: ChatModelConfig {
                model: "gemini-2.5-pro".into(),
                thinking_budget: Some(32768),
                tools: vec![],
                location: None,
            },
        };
        let value = serde_json::to_value(client().chat_request(request)).unwrap();
        assert_eq!(
            value["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            json!(32768)
        );
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_text_skips_thought_parts() {
        let body: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "pondering", "thought": true},
                    {"text": "Hel"},
                    {"text": "lo"}
                ]}
            }]
        }))
        .unwrap();
        assert_eq!(body.text(), "Hello");
    }

    #[test]
    fn test_grounding_decodes_both_shapes() {
        let body: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"maps": {"uri": "https://maps.example/b", "title": "B"}},
                    {"retrievedContext": {"uri": "ignored"}}
                ]}
            }]
        }))
        .unwrap();
        let chunks = body.grounding();
        assert!(matches!(chunks[0], GroundingChunk::Web { .. }));
        assert!(matches!(chunks[1], GroundingChunk::Maps { .. }));
        assert_eq!(chunks[2], GroundingChunk::Unknown);
    }

    #[test]
    fn test_forward_event_reports_errors() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut stop = None;
        let keep_going = forward_event(
            r#"{"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}"#,
            true,
            &mut stop,
            &tx,
        );
        assert!(!keep_going);
        assert_eq!(
            rx.try_recv().unwrap(),
            StreamChunk::Error("429 RESOURCE_EXHAUSTED: quota".into())
        );
    }

    #[test]
    fn test_missing_audio_is_none() {
        let body: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "no audio here"}]}}]
        }))
        .unwrap();
        assert!(body.inline_audio().is_none());
    }
}
