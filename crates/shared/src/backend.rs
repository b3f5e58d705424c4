use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use thiserror::Error;

use crate::config::BackendConfig;

const MAX_ERROR_BODY_LEN: usize = 1_000;

pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, BackendError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request timed out")]
    Timeout,
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend returned status {status}")]
    Status { status: u16, body: Value },
    #[error("backend returned an invalid payload: {0}")]
    InvalidPayload(String),
}

impl BackendError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unreachable(_))
    }

    /// Human-readable upstream detail carried into the caller-facing error.
    pub fn detail(&self) -> Value {
        match self {
            Self::Status { body, .. } => body.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to build backend http client: {0}")]
pub struct BackendClientError(String);

/// The secondary service that exposes the same `/assistant/*` contract.
pub trait FallbackBackend: Send + Sync {
    /// Forwards the caller's request body verbatim to `/assistant/ask`.
    fn ask<'a>(&'a self, body: Bytes) -> BackendFuture<'a>;

    /// Proxies `/assistant/suggestions` with the caller's raw query string.
    fn suggestions<'a>(&'a self, query: Option<String>) -> BackendFuture<'a>;
}

#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| BackendClientError(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_ask(&self, body: Bytes) -> Result<Value, BackendError> {
        let response = self
            .client
            .post(self.endpoint("/assistant/ask"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        read_json_response(response).await
    }

    async fn get_suggestions(&self, query: Option<String>) -> Result<Value, BackendError> {
        let mut url = self.endpoint("/assistant/suggestions");
        if let Some(query) = query.filter(|query| !query.is_empty()) {
            url.push('?');
            url.push_str(&query);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        read_json_response(response).await
    }
}

impl FallbackBackend for BackendClient {
    fn ask<'a>(&'a self, body: Bytes) -> BackendFuture<'a> {
        Box::pin(self.post_ask(body))
    }

    fn suggestions<'a>(&'a self, query: Option<String>) -> BackendFuture<'a> {
        Box::pin(self.get_suggestions(query))
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Unreachable(err.to_string())
    }
}

async fn read_json_response(response: reqwest::Response) -> Result<Value, BackendError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: error_body_value(&body),
        });
    }

    serde_json::from_str::<Value>(&body)
        .map_err(|_| BackendError::InvalidPayload("response_json_parse_failed".to_string()))
}

fn error_body_value(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => Value::String(body.trim().chars().take(MAX_ERROR_BODY_LEN).collect()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{BackendError, error_body_value};

    #[test]
    fn error_bodies_keep_json_or_truncated_text() {
        assert_eq!(
            error_body_value(r#"{"error":"boom"}"#),
            json!({ "error": "boom" })
        );
        assert_eq!(
            error_body_value(" Internal Server Error "),
            Value::String("Internal Server Error".to_string())
        );
        assert_eq!(
            error_body_value(&"y".repeat(2_000))
                .as_str()
                .map(str::len),
            Some(1_000)
        );
    }

    #[test]
    fn detail_exposes_status_body_or_message() {
        let status = BackendError::Status {
            status: 500,
            body: json!({ "error": "db down" }),
        };
        assert_eq!(status.detail(), json!({ "error": "db down" }));
        assert!(!status.is_transport());

        let timeout = BackendError::Timeout;
        assert!(timeout.is_transport());
        assert_eq!(timeout.detail(), json!("backend request timed out"));
    }
}
