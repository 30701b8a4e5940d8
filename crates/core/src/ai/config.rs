use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AiError, AnthropicClient, LlmClient, OpenAiCompatibleClient};

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Anthropic Claude API.
    Anthropic,
    /// OpenAI API.
    OpenAi,
    /// Local Ollama instance (OpenAI-compatible endpoint).
    Ollama,
    /// Custom HTTP endpoint (must be OpenAI-compatible).
    Custom,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Ollama => "ollama",
            LlmProvider::Custom => "custom",
        }
    }

    fn default_api_base(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Anthropic => Some("https://api.anthropic.com"),
            LlmProvider::OpenAi => Some("https://api.openai.com"),
            LlmProvider::Ollama => Some("http://localhost:11434"),
            LlmProvider::Custom => None,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, LlmProvider::Anthropic | LlmProvider::OpenAi)
    }
}

/// The `[ai]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Turn the AI fallback on or off without removing the section.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub provider: LlmProvider,
    /// Model name/identifier.
    #[serde(default)]
    pub model: String,
    /// API key (can reference env var with ${VAR_NAME}).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout() -> u32 {
    30
}

fn default_max_tokens() -> u32 {
    256
}

impl AiConfig {
    /// The API key with `${VAR}` references expanded from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        let raw = self.api_key.as_deref()?.trim();
        let value = match raw.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            Some(var) => std::env::var(var).ok()?,
            None => raw.to_string(),
        };
        (!value.is_empty()).then_some(value)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs as u64)
    }
}

/// Build the LLM client described by `config`.
pub fn create_llm_client(config: &AiConfig) -> Result<Arc<dyn LlmClient>, AiError> {
    if config.model.trim().is_empty() {
        return Err(AiError::NotConfigured("ai.model is empty".to_string()));
    }

    let api_key = config.resolved_api_key();
    if config.provider.requires_api_key() && api_key.is_none() {
        return Err(AiError::NotConfigured(format!(
            "provider {} requires an api_key",
            config.provider.as_str()
        )));
    }

    let api_base = config
        .api_base
        .clone()
        .or_else(|| config.provider.default_api_base().map(String::from))
        .ok_or_else(|| AiError::NotConfigured("custom provider requires api_base".to_string()))?;

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Anthropic => {
            let key = api_key.unwrap_or_default();
            Arc::new(AnthropicClient::new(key, &config.model, config.timeout())?.with_api_base(api_base))
        }
        LlmProvider::OpenAi | LlmProvider::Ollama | LlmProvider::Custom => {
            let mut client = OpenAiCompatibleClient::new(
                config.provider.as_str(),
                &config.model,
                api_base,
                config.timeout(),
            )?;
            if let Some(key) = api_key {
                client = client.with_api_key(key);
            }
            Arc::new(client)
        }
    };

    Ok(client)
}
