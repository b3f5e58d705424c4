use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use super::gateway::{
    ChatCompletion, ChatCompletionRequest, LlmGateway, LlmGatewayError, LlmGatewayFuture,
    LlmTokenUsage,
};
use crate::config::ProviderConfig;

const MAX_ERROR_DETAIL_LEN: usize = 500;

#[derive(Debug, Error)]
pub enum OpenRouterConfigError {
    #[error("invalid identification header {0}")]
    InvalidHeader(&'static str),
    #[error("failed to build OpenRouter http client: {0}")]
    HttpClient(String),
}

/// Chat-completions client for OpenRouter and any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenRouterGateway {
    client: reqwest::Client,
    chat_completions_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterGateway {
    pub fn new(config: &ProviderConfig) -> Result<Self, OpenRouterConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(identification_headers(config)?)
            .build()
            .map_err(|err| OpenRouterConfigError::HttpClient(err.to_string()))?;

        Ok(Self {
            client,
            chat_completions_url: config.chat_completions_url(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn send(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletion, LlmGatewayError> {
        let request_body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let response = self
            .client
            .post(&self.chat_completions_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmGatewayError::Timeout
                } else {
                    LlmGatewayError::Unreachable(err.to_string())
                }
            })?;

        let status = response.status();
        let header_request_id = header_request_id(response.headers());
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                LlmGatewayError::Timeout
            } else {
                LlmGatewayError::InvalidProviderPayload("response_body_read_failed".to_string())
            }
        })?;

        if !status.is_success() {
            return Err(LlmGatewayError::ProviderFailure {
                status: status.as_u16(),
                detail: provider_error_detail(&body),
            });
        }

        let parsed: ChatCompletionsResponse = serde_json::from_str(&body).map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_json_parse_failed".to_string())
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| match message.content {
                Some(Value::String(text)) => Some(text),
                _ => None,
            })
            .unwrap_or_default();

        Ok(ChatCompletion {
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            provider_request_id: header_request_id.or(parsed.id),
            content,
            usage: parsed.usage.map(|usage| LlmTokenUsage {
                prompt_tokens: clamp_u64_to_u32(usage.prompt_tokens.unwrap_or(0)),
                completion_tokens: clamp_u64_to_u32(usage.completion_tokens.unwrap_or(0)),
                total_tokens: clamp_u64_to_u32(usage.total_tokens.unwrap_or(0)),
            }),
        })
    }
}

impl LlmGateway for OpenRouterGateway {
    fn complete<'a>(&'a self, request: ChatCompletionRequest) -> LlmGatewayFuture<'a> {
        Box::pin(self.send(request))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatCompletionsChoice>,
    usage: Option<ChatCompletionsUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsChoice {
    message: Option<ChatCompletionsMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsMessage {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

fn identification_headers(config: &ProviderConfig) -> Result<HeaderMap, OpenRouterConfigError> {
    let mut headers = HeaderMap::new();
    if let Some(app_url) = config.public_app_url.as_deref() {
        let value = HeaderValue::from_str(app_url)
            .map_err(|_| OpenRouterConfigError::InvalidHeader("HTTP-Referer"))?;
        headers.insert(HeaderName::from_static("http-referer"), value);
    }

    let title = HeaderValue::from_str(&config.app_title)
        .map_err(|_| OpenRouterConfigError::InvalidHeader("X-Title"))?;
    headers.insert(HeaderName::from_static("x-title"), title);

    Ok(headers)
}

fn header_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

/// Pulls `error.message` (or `error.code`) out of a provider error body,
/// falling back to the truncated raw body.
fn provider_error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        message: Option<String>,
        code: Option<Value>,
    }

    let details = serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);

    if let Some(details) = details {
        if let Some(message) = details.message.filter(|message| !message.trim().is_empty()) {
            return message;
        }
        match details.code {
            Some(Value::String(code)) => return code,
            Some(Value::Number(code)) => return code.to_string(),
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }
    trimmed.chars().take(MAX_ERROR_DETAIL_LEN).collect()
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
