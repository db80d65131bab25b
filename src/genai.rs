use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_SOURCE_TITLE: &str = "Fonte";

#[derive(Debug, thiserror::Error)]
pub enum GenAiError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("decode response: {0}")]
    Decode(String),
    #[error("request worker stopped: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "3:4")]
    ClassicPortrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Classic,
        AspectRatio::ClassicPortrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Classic => "4:3",
            AspectRatio::ClassicPortrait => "3:4",
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextReply {
    pub text: Option<String>,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageReply {
    pub image: Option<InlineImage>,
    pub text: Option<String>,
}

/// The generative-content backend the lab panels talk to.
pub trait GenerativeService: Send + Sync {
    fn generate_text(&self, prompt: &str, search_grounding: bool) -> Result<TextReply, GenAiError>;
    fn generate_image(&self, prompt: &str, aspect: AspectRatio) -> Result<ImageReply, GenAiError>;
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub timeout: Option<Duration>,
    pub user_agent: String,
    pub http_client: Option<HttpClient>,
}

pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
    chat_model: String,
    image_model: String,
    user_agent: String,
}

impl GeminiClient {
    pub fn new(config: ClientConfig) -> Result<Self, GenAiError> {
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(60)))
                .build()?,
        };
        Ok(Self {
            http,
            api_key: config.api_key.trim().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model,
            image_model: config.image_model,
            user_agent: config.user_agent,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn post(&self, model: &str, body: &Value) -> Result<GenerateResponse, GenAiError> {
        if self.api_key.is_empty() {
            return Err(GenAiError::MissingApiKey);
        }
        let url = self.endpoint(model);
        tracing::debug!(%url, "generateContent request");
        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(GenAiError::Status {
                status: status.as_u16(),
                message: error_message(&text).unwrap_or_else(|| status.to_string()),
            });
        }
        serde_json::from_str(&text).map_err(|err| GenAiError::Decode(err.to_string()))
    }
}

impl GenerativeService for GeminiClient {
    fn generate_text(&self, prompt: &str, search_grounding: bool) -> Result<TextReply, GenAiError> {
        let body = text_request(prompt, search_grounding);
        let response = self.post(&self.chat_model, &body)?;
        Ok(response.into_text_reply())
    }

    fn generate_image(&self, prompt: &str, aspect: AspectRatio) -> Result<ImageReply, GenAiError> {
        let body = image_request(prompt, aspect);
        let response = self.post(&self.image_model, &body)?;
        response.into_image_reply()
    }
}

pub fn text_request(prompt: &str, search_grounding: bool) -> Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
    });
    if search_grounding {
        body["tools"] = json!([{ "google_search": {} }]);
    }
    body
}

pub fn image_request(prompt: &str, aspect: AspectRatio) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": { "aspectRatio": aspect.as_str() },
        },
    })
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl GenerateResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    fn text(&self) -> Option<String> {
        let parts = &self.first_candidate()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    pub fn into_text_reply(self) -> TextReply {
        let text = self.text();
        let sources = self
            .first_candidate()
            .and_then(|candidate| candidate.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .map(|web| Source {
                        uri: web.uri.clone().unwrap_or_default(),
                        title: web
                            .title
                            .clone()
                            .filter(|t| !t.is_empty())
                            .unwrap_or_else(|| DEFAULT_SOURCE_TITLE.to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default();
        TextReply { text, sources }
    }

    /// The first inline-data part wins. A part that is present but does
    /// not decode is a malformed response.
    pub fn into_image_reply(self) -> Result<ImageReply, GenAiError> {
        let text = self.text();
        let inline = self
            .first_candidate()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.iter().find_map(|part| part.inline_data.as_ref()));
        let image = match inline {
            Some(data) => {
                let bytes = general_purpose::STANDARD
                    .decode(data.data.trim())
                    .map_err(|err| GenAiError::Decode(format!("inline image: {err}")))?;
                let mime_type = if data.mime_type.is_empty() {
                    "image/png".to_string()
                } else {
                    data.mime_type.clone()
                };
                (!bytes.is_empty()).then_some(InlineImage { mime_type, bytes })
            }
            None => None,
        };
        Ok(ImageReply { image, text })
    }
}

/// Offline stand-in used when no API key is configured and in tests.
#[derive(Default)]
pub struct MockService;

impl GenerativeService for MockService {
    fn generate_text(&self, prompt: &str, _search_grounding: bool) -> Result<TextReply, GenAiError> {
        Ok(TextReply {
            text: Some(format!(
                "Modo offline: configure `lab.api_key` para conversar com o Gemini.\n\nVocê disse: *{}*",
                prompt.trim()
            )),
            sources: Vec::new(),
        })
    }

    fn generate_image(&self, _prompt: &str, _aspect: AspectRatio) -> Result<ImageReply, GenAiError> {
        Err(GenAiError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> GenerateResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn text_request_enables_search_tool() {
        let body = text_request("oi", true);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "oi");
        assert!(body["tools"][0].get("google_search").is_some());
        assert!(text_request("oi", false).get("tools").is_none());
    }

    #[test]
    fn image_request_carries_aspect_ratio() {
        let body = image_request("a cat", AspectRatio::Landscape);
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
    }

    #[test]
    fn text_reply_collects_web_sources() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]},
            "groundingMetadata":{"groundingChunks":[
                {"web":{"uri":"https://a.example","title":"A"}},
                {"retrievedContext":{}},
                {"web":{"uri":"https://b.example"}}
            ]}}]}"#,
        );
        let reply = response.into_text_reply();
        assert_eq!(reply.text.as_deref(), Some("Hello world"));
        assert_eq!(reply.sources.len(), 2);
        assert_eq!(reply.sources[1].title, "Fonte");
    }

    #[test]
    fn empty_candidates_give_no_text() {
        let reply = parse(r#"{"candidates":[]}"#).into_text_reply();
        assert_eq!(reply, TextReply::default());
    }

    #[test]
    fn image_reply_decodes_first_inline_part() {
        let encoded = general_purpose::STANDARD.encode([1u8, 2, 3]);
        let body = format!(
            r#"{{"candidates":[{{"content":{{"parts":[{{"text":"here"}},{{"inlineData":{{"mimeType":"image/png","data":"{encoded}"}}}}]}}}}]}}"#
        );
        let reply = parse(&body).into_image_reply().unwrap();
        let image = reply.image.unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn image_reply_without_inline_data_is_empty() {
        let reply = parse(r#"{"candidates":[{"content":{"parts":[{"text":"refused"}]}}]}"#)
            .into_image_reply()
            .unwrap();
        assert!(reply.image.is_none());
        assert_eq!(reply.text.as_deref(), Some("refused"));
    }

    #[test]
    fn bad_base64_is_a_decode_error() {
        let err = parse(r#"{"candidates":[{"content":{"parts":[{"inlineData":{"data":"@@@"}}]}}]}"#)
            .into_image_reply()
            .unwrap_err();
        assert!(matches!(err, GenAiError::Decode(_)));
    }

    #[test]
    fn missing_key_fails_before_network() {
        let client = GeminiClient::new(ClientConfig {
            base_url: "http://127.0.0.1:9".into(),
            chat_model: "m".into(),
            ..ClientConfig::default()
        })
        .unwrap();
        let err = client.generate_text("hi", false).unwrap_err();
        assert!(matches!(err, GenAiError::MissingApiKey));
    }

    #[test]
    fn error_body_message_is_extracted() {
        let message = error_message(r#"{"error":{"code":429,"message":"quota"}}"#);
        assert_eq!(message.as_deref(), Some("quota"));
    }

    #[test]
    fn aspect_ratio_cycles() {
        let mut ratio = AspectRatio::default();
        for _ in 0..AspectRatio::ALL.len() {
            ratio = ratio.next();
        }
        assert_eq!(ratio, AspectRatio::Square);
    }
}
