use serde_json::Value;
use thiserror::Error;

use super::request::RequestValidationError;
use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Validation(#[from] RequestValidationError),
    /// The backend answered with an error status or an unusable body after
    /// the provider was skipped or failed.
    #[error("assistant backend failed: {backend_error}")]
    FallbackFailed {
        status: Option<u16>,
        backend_error: String,
        detail: Value,
        provider_error: Option<String>,
    },
    /// The backend could not be reached at all.
    #[error("assistant backend unreachable: {backend_error}")]
    ServiceUnreachable {
        backend_error: String,
        provider_error: Option<String>,
    },
    #[error("internal assistant error: {0}")]
    Internal(String),
}

impl AssistantError {
    pub(crate) fn from_backend(err: BackendError, provider_error: Option<String>) -> Self {
        if err.is_transport() {
            return Self::ServiceUnreachable {
                backend_error: err.to_string(),
                provider_error,
            };
        }

        let status = match &err {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        };
        Self::FallbackFailed {
            status,
            backend_error: err.to_string(),
            detail: err.detail(),
            provider_error,
        }
    }
}
