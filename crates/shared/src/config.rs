use thiserror::Error;

use crate::config_env::{
    optional_trimmed_env, parse_f64_env, parse_http_url_env, parse_u32_env, parse_u64_env,
};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3001";
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_PROVIDER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_PROVIDER_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 20_000;
const DEFAULT_APP_TITLE: &str = "AI Tools Directory";
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1_500;
const DEFAULT_MAX_CONTEXT_TURNS: usize = 20;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub backend: BackendConfig,
    /// `None` when no provider credential is configured; every question then
    /// goes straight to the backend.
    pub provider: Option<ProviderConfig>,
    pub assistant: AssistantDefaults,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_ms: u64,
    pub public_app_url: Option<String>,
    pub app_title: String,
}

impl ProviderConfig {
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssistantDefaults {
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_context_turns: usize,
}

impl Default for AssistantDefaults {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_context_turns: DEFAULT_MAX_CONTEXT_TURNS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load .env file: {0}")]
    DotEnv(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid number in env var {0}")]
    ParseFloat(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Loads `.env` from the working directory when one exists.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::DotEnv(err.to_string())),
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: optional_trimmed_env("API_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            backend: BackendConfig {
                base_url: parse_http_url_env("BACKEND_URL", DEFAULT_BACKEND_URL)?,
                timeout_ms: parse_u64_env("BACKEND_TIMEOUT_MS", DEFAULT_BACKEND_TIMEOUT_MS)?,
            },
            provider: ProviderConfig::from_env()?,
            assistant: AssistantDefaults::from_env()?,
        })
    }
}

impl ProviderConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = optional_trimmed_env("OPENROUTER_API_KEY") else {
            return Ok(None);
        };

        Ok(Some(Self {
            base_url: parse_http_url_env("OPENROUTER_BASE_URL", DEFAULT_PROVIDER_BASE_URL)?,
            api_key,
            model: optional_trimmed_env("OPENROUTER_MODEL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_MODEL.to_string()),
            timeout_ms: parse_u64_env("OPENROUTER_TIMEOUT_MS", DEFAULT_PROVIDER_TIMEOUT_MS)?,
            public_app_url: optional_trimmed_env("PUBLIC_APP_URL"),
            app_title: optional_trimmed_env("APP_TITLE")
                .unwrap_or_else(|| DEFAULT_APP_TITLE.to_string()),
        }))
    }
}

impl AssistantDefaults {
    fn from_env() -> Result<Self, ConfigError> {
        let temperature = parse_f64_env("ASSISTANT_DEFAULT_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidConfiguration(
                "ASSISTANT_DEFAULT_TEMPERATURE must be between 0 and 2".to_string(),
            ));
        }

        let max_tokens = parse_u32_env("ASSISTANT_DEFAULT_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        if max_tokens == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "ASSISTANT_DEFAULT_MAX_TOKENS must be positive".to_string(),
            ));
        }

        Ok(Self {
            temperature,
            max_tokens,
            max_context_turns: parse_u32_env(
                "ASSISTANT_MAX_CONTEXT_TURNS",
                DEFAULT_MAX_CONTEXT_TURNS as u32,
            )? as usize,
        })
    }
}
