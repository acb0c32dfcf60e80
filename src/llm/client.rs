//! HTTP client for the hosted `generateContent` API

use super::config::GatewayConfig;
use crate::{AlfredoError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Anything that turns a prompt into raw model text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
    }
}

/// Single-turn client. One POST per prompt, no retries.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GatewayConfig,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate().map_err(AlfredoError::ConfigError)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        let api_key = config.resolve_api_key();
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn build_request<'a>(&self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AlfredoError::GatewayError("API key not configured".to_string()))?;

        let url = self.config.generate_url();
        debug!("POST {} ({} prompt chars)", url, prompt.len());

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&self.build_request(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AlfredoError::GatewayError(format!(
                "Gemini API error ({status}): {error_text}"
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AlfredoError::GatewayError(format!("malformed response: {e}")))?;

        if let Some(err) = result.error.as_ref() {
            return Err(AlfredoError::GatewayError(format!(
                "Gemini API error: {}",
                err.message
            )));
        }

        match result.first_text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AlfredoError::GatewayError(
                "empty response from model".to_string(),
            )),
        }
    }
}
