use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde_json::Value;
use tracing::{info, warn};

use super::error::AssistantError;
use super::prompts::build_messages;
use super::request::{AssistantRequest, RequestValidationError};
use super::response::{AssistantResponse, normalize_reply, parse_completion_text};
use crate::backend::FallbackBackend;
use crate::config::AssistantDefaults;
use crate::llm::{ChatCompletionRequest, LlmGateway, LlmGatewayError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Primary,
    Fallback,
}

impl AnswerSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub enum AskOutcome {
    /// Provider reply, normalized.
    Primary(AssistantResponse),
    /// Backend reply, passed through untouched.
    Fallback(Value),
}

impl AskOutcome {
    pub fn source(&self) -> AnswerSource {
        match self {
            Self::Primary(_) => AnswerSource::Primary,
            Self::Fallback(_) => AnswerSource::Fallback,
        }
    }
}

#[derive(Clone)]
pub struct AssistantGateway {
    llm: Option<Arc<dyn LlmGateway>>,
    backend: Arc<dyn FallbackBackend>,
    defaults: AssistantDefaults,
}

impl AssistantGateway {
    pub fn new(
        llm: Option<Arc<dyn LlmGateway>>,
        backend: Arc<dyn FallbackBackend>,
        defaults: AssistantDefaults,
    ) -> Self {
        Self {
            llm,
            backend,
            defaults,
        }
    }

    pub fn provider_configured(&self) -> bool {
        self.llm.is_some()
    }

    /// Answers one `/assistant/ask` body. At most two upstream calls are made,
    /// provider first and backend second, and never concurrently.
    pub async fn ask(&self, body: Bytes) -> Result<AskOutcome, AssistantError> {
        let payload: Value =
            serde_json::from_slice(&body).map_err(|_| RequestValidationError::InvalidBody)?;
        let request = AssistantRequest::from_payload(&payload, self.defaults.max_context_turns)?;

        let Some(llm) = self.llm.as_deref() else {
            info!(
                fallback_reason = "provider_not_configured",
                "assistant question routed to backend"
            );
            return self.ask_backend(body, None).await;
        };

        let completion_request = ChatCompletionRequest {
            messages: build_messages(&request),
            temperature: request.temperature.unwrap_or(self.defaults.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.defaults.max_tokens),
        };
        let context_turns = request.context.len();
        let started_at = Instant::now();

        match llm.complete(completion_request).await {
            Ok(completion) => {
                let usage = completion.usage.unwrap_or_default();
                info!(
                    source = AnswerSource::Primary.as_str(),
                    model = %completion.model,
                    provider_request_id = completion.provider_request_id.as_deref().unwrap_or(""),
                    latency_ms = started_at.elapsed().as_millis() as u64,
                    context_turns,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    total_tokens = usage.total_tokens,
                    "assistant question answered by provider"
                );
                let raw = parse_completion_text(&completion.content);
                Ok(AskOutcome::Primary(normalize_reply(&raw, &request.question)))
            }
            Err(err) => {
                warn!(
                    fallback_reason = "provider_failed",
                    error_type = err.error_type(),
                    provider_transport_failure = err.is_transport(),
                    latency_ms = started_at.elapsed().as_millis() as u64,
                    "assistant provider request failed: {err}"
                );
                self.ask_backend(body, Some(&err)).await
            }
        }
    }

    pub async fn suggestions(&self, query: Option<String>) -> Result<Value, AssistantError> {
        self.backend.suggestions(query).await.map_err(|err| {
            warn!(error = %err, "assistant suggestions request failed");
            AssistantError::from_backend(err, None)
        })
    }

    async fn ask_backend(
        &self,
        body: Bytes,
        provider_error: Option<&LlmGatewayError>,
    ) -> Result<AskOutcome, AssistantError> {
        let started_at = Instant::now();
        match self.backend.ask(body).await {
            Ok(reply) => {
                info!(
                    source = AnswerSource::Fallback.as_str(),
                    latency_ms = started_at.elapsed().as_millis() as u64,
                    "assistant question answered by backend"
                );
                Ok(AskOutcome::Fallback(reply))
            }
            Err(err) => {
                warn!(
                    backend_transport_failure = err.is_transport(),
                    latency_ms = started_at.elapsed().as_millis() as u64,
                    "assistant backend request failed: {err}"
                );
                Err(AssistantError::from_backend(
                    err,
                    provider_error.map(ToString::to_string),
                ))
            }
        }
    }
}
