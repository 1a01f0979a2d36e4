//! Gemini video-oracle client.
//!
//! The engine treats the oracle as a black box behind [`VideoOracle`]: a
//! clip (or single frame) plus a prompt go in, free text comes out. All
//! session state the oracle needs must be re-injected into every prompt —
//! the API holds no memory between calls.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{OracleError, OracleResult};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Upper bound on one analysis round trip. Short clips return in seconds;
/// long recordings (extraction) can take minutes.
const ANALYSIS_TIMEOUT_SECS: u64 = 600;

/// Fallback model chain, tried in order.
const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];

/// The interface the engine uses to request analysis of visual input.
#[async_trait]
pub trait VideoOracle: Send + Sync {
    /// Analyze a short MP4 clip, returning the oracle's free-text reply.
    async fn analyze_clip(&self, video: &[u8], prompt: &str) -> OracleResult<String>;

    /// Analyze a single JPEG frame.
    async fn analyze_frame(&self, image: &[u8], prompt: &str) -> OracleResult<String>;

    /// Analyze a clip with schema-constrained JSON output.
    async fn analyze_clip_structured(
        &self,
        video: &[u8],
        prompt: &str,
        schema: serde_json::Value,
    ) -> OracleResult<String>;
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Media {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    client: Client,
    base_url: String,
    models: Vec<String>,
    temperature: f32,
}

impl GeminiClient {
    /// Create a new client from the `GEMINI_API_KEY` environment variable.
    pub fn new() -> OracleResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| OracleError::config_error("GEMINI_API_KEY not set"))?;
        Ok(Self::with_api_key(api_key))
    }

    /// Create a new client with an explicit API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(ANALYSIS_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_key: api_key.into(),
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            temperature: 0.1,
        }
    }

    /// Override the API base URL (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the model fallback chain.
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Override the generation temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Try each model in the fallback chain until one succeeds.
    async fn generate(
        &self,
        media: &[u8],
        mime_type: &str,
        prompt: &str,
        schema: Option<serde_json::Value>,
    ) -> OracleResult<String> {
        let mut last_error = None;

        for model in &self.models {
            match self
                .call_api(model, media, mime_type, prompt, schema.clone())
                .await
            {
                Ok(text) => {
                    info!("Oracle analysis completed with model {}", model);
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Failed with model {}: {}", model, e);
                    let give_up = !e.is_retryable();
                    last_error = Some(e);
                    if give_up {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(OracleError::AllModelsFailed))
    }

    /// Call the generateContent endpoint for one model.
    async fn call_api(
        &self,
        model: &str,
        media: &[u8],
        mime_type: &str,
        prompt: &str,
        schema: Option<serde_json::Value>,
    ) -> OracleResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Media {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(media),
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: schema.is_some().then(|| "application/json".to_string()),
                response_schema: schema,
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::ApiError { status, body });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or(OracleError::EmptyResponse)
    }
}

#[async_trait]
impl VideoOracle for GeminiClient {
    async fn analyze_clip(&self, video: &[u8], prompt: &str) -> OracleResult<String> {
        self.generate(video, "video/mp4", prompt, None).await
    }

    async fn analyze_frame(&self, image: &[u8], prompt: &str) -> OracleResult<String> {
        self.generate(image, "image/jpeg", prompt, None).await
    }

    async fn analyze_clip_structured(
        &self,
        video: &[u8],
        prompt: &str,
        schema: serde_json::Value,
    ) -> OracleResult<String> {
        self.generate(video, "video/mp4", prompt, Some(schema)).await
    }
}
