use std::time::Duration;

use crate::provider::OpenAiConfig;

/// Default settings for the OpenAI-compatible completion client.
#[derive(Debug, Clone, Copy)]
pub struct OpenAiDefaults {
    pub model: &'static str,
    pub base_url: &'static str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// Shared defaults so the CLI, the service and tests stay in sync.
pub const OPENAI_DEFAULTS: OpenAiDefaults = OpenAiDefaults {
    model: "gpt-4-turbo-preview",
    base_url: "https://api.openai.com",
    temperature: 0.3,
    max_tokens: 500,
    timeout_secs: 60,
};

/// Convenience helper to build an [`OpenAiConfig`] from the shared defaults.
pub fn default_openai_config(api_key: impl Into<String>) -> OpenAiConfig {
    OpenAiConfig {
        api_key: api_key.into(),
        model: OPENAI_DEFAULTS.model.into(),
        base_url: OPENAI_DEFAULTS.base_url.into(),
        temperature: OPENAI_DEFAULTS.temperature,
        max_tokens: OPENAI_DEFAULTS.max_tokens,
        timeout: Duration::from_secs(OPENAI_DEFAULTS.timeout_secs),
    }
}
