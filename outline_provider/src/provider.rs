use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Errors that can be produced by a completion call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("http error: {0}")]
    Http(String),
    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed completion payload: {0}")]
    Malformed(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Core interface for anything that turns a prompt into model text.
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
    fn model_id(&self) -> &str;
}

/// Connection and sampling settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    /// Scheme and host, without the `/v1/...` path.
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Blocking chat-completions client.
#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    config: OpenAiConfig,
}

const SYSTEM_PROMPT: &str = "You extract tables of contents from academic papers and answer with JSON only.";

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured("OPENAI_API_KEY is empty".into()));
        }
        if config.model.trim().is_empty() {
            return Err(ProviderError::NotConfigured("model id is empty".into()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ProviderError::Http(err.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn map_reqwest(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.config.timeout)
        } else {
            ProviderError::Http(err.to_string())
        }
    }
}

impl CompletionProvider for OpenAiProvider {
    fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = self.endpoint();
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        debug!(url = %url, model = %self.config.model, prompt_chars = prompt.chars().count(), "completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| self.map_reqwest(e))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let resp: serde_json::Value = response.json().map_err(|e| self.map_reqwest(e))?;
        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed("missing choices[0].message.content".into()))
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
