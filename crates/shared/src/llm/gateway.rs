use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type LlmGatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ChatCompletion, LlmGatewayError>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmTokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub model: String,
    pub provider_request_id: Option<String>,
    /// Text of the first choice; empty when the provider sent none.
    pub content: String,
    pub usage: Option<LlmTokenUsage>,
}

#[derive(Debug, Error)]
pub enum LlmGatewayError {
    #[error("llm provider request timed out")]
    Timeout,
    #[error("llm provider unreachable: {0}")]
    Unreachable(String),
    #[error("llm provider request failed: status={status} detail={detail}")]
    ProviderFailure { status: u16, detail: String },
    #[error("llm provider returned an invalid payload: {0}")]
    InvalidProviderPayload(String),
}

impl LlmGatewayError {
    /// True when no HTTP response was received at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unreachable(_))
    }

    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Unreachable(_) => "unreachable",
            Self::ProviderFailure { .. } => "provider_failure",
            Self::InvalidProviderPayload(_) => "invalid_provider_payload",
        }
    }
}

pub trait LlmGateway: Send + Sync {
    fn complete<'a>(&'a self, request: ChatCompletionRequest) -> LlmGatewayFuture<'a>;
}
