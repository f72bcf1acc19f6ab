// src/services/generator.rs

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use crate::config::Config;

/// Why a call to the text generator did not yield usable quiz content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The provider refused the call because the key ran out of quota.
    Quota(String),
    /// Network failure, non-success status, or an unexpected response shape.
    Transport(String),
    /// No answer within the configured timeout.
    Timeout,
    /// The completion did not contain a readable quiz object.
    Malformed(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Quota(msg) => write!(f, "quota exceeded: {}", msg),
            GenerationError::Transport(msg) => write!(f, "transport error: {}", msg),
            GenerationError::Timeout => write!(f, "timed out"),
            GenerationError::Malformed(msg) => write!(f, "malformed AI output: {}", msg),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Turns a prompt into a free-text completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Error text from the provider is all we get, so quota problems are recognised by content.
pub fn is_quota_error(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("quota") || lower.contains("resource_exhausted") || lower.contains("429")
}

/// Classifies an opaque provider error message.
pub fn classify_error(text: impl Into<String>) -> GenerationError {
    let text = text.into();
    if is_quota_error(&text) {
        GenerationError::Quota(text)
    } else {
        GenerationError::Transport(text)
    }
}

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.ai_timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::Transport(
                "GEMINI_API_KEY is not configured".to_string(),
            ));
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        tracing::debug!("Sending generation request to model {}", self.model);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(request_error)?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::Quota(text));
        }
        if !status.is_success() {
            return Err(classify_error(format!("Gemini API error {}: {}", status, text)));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Transport(format!("Unreadable Gemini response: {}", e)))?;

        completion_text(&body)
            .map(str::to_owned)
            .ok_or_else(|| GenerationError::Transport("Missing Gemini response content".to_string()))
    }
}

fn request_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        classify_error(e.to_string())
    }
}

fn completion_text(body: &Value) -> Option<&str> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}
