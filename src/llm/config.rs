//! Language-model gateway configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for the hosted generative model
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the generative language API
    pub endpoint: String,

    /// Model name used in `models/{model}:generateContent`
    pub model: String,

    /// API key; falls back to `GEMINI_API_KEY` when absent
    pub api_key: Option<String>,

    /// Temperature for sampling
    pub temperature: f32,

    /// Top-k sampling parameter
    pub top_k: u32,

    /// Top-p (nucleus) sampling parameter
    pub top_p: f32,

    /// Maximum tokens to generate per response
    pub max_output_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash-latest".to_string(),
            api_key: None,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 512,
            timeout_secs: 30,
        }
    }
}

impl GatewayConfig {
    /// Create a new gateway configuration for the specified model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Point the gateway at a different base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set maximum tokens
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured key, else the environment. Empty keys count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        let usable = |key: &String| !key.trim().is_empty();
        self.api_key
            .clone()
            .filter(usable)
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(usable))
    }

    /// Full `generateContent` URL without the key parameter
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("Gateway endpoint is required".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("Gateway model is required".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!("Temperature out of range: {}", self.temperature));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(format!("top_p out of range: {}", self.top_p));
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be positive".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}
