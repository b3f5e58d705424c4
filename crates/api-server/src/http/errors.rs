use std::any::Any;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use shared::assistant::AssistantError;
use shared::models::ErrorResponse;
use tracing::error;

const UPSTREAM_FAILED: &str = "Erreur du service assistant";
const SERVICE_UNREACHABLE: &str = "Service assistant injoignable";
const INTERNAL_ERROR: &str = "Erreur interne du serveur";

pub(super) fn assistant_error_response(err: AssistantError) -> Response {
    match err {
        AssistantError::Validation(err) => bad_request_response(&err.to_string()),
        AssistantError::FallbackFailed {
            status,
            backend_error,
            detail,
            provider_error,
        } => {
            let status = status
                .and_then(|status| StatusCode::from_u16(status).ok())
                .filter(StatusCode::is_server_error)
                .unwrap_or(StatusCode::BAD_GATEWAY);
            let details = upstream_details(Some(detail), provider_error);
            (
                status,
                Json(
                    ErrorResponse::new(UPSTREAM_FAILED)
                        .with_message(backend_error)
                        .with_details(details),
                ),
            )
                .into_response()
        }
        AssistantError::ServiceUnreachable {
            backend_error,
            provider_error,
        } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(
                ErrorResponse::new(SERVICE_UNREACHABLE)
                    .with_message(backend_error)
                    .with_details(upstream_details(None, provider_error)),
            ),
        )
            .into_response(),
        AssistantError::Internal(message) => internal_error_response(&message),
    }
}

fn bad_request_response(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
}

fn internal_error_response(detail: &str) -> Response {
    error!("assistant request failed unexpectedly: {detail}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(INTERNAL_ERROR).with_message("Unexpected server error")),
    )
        .into_response()
}

/// Turns a handler panic into the same 500 body as any other internal error.
pub(super) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    internal_error_response(&format!("handler panicked: {detail}"))
}

fn upstream_details(backend: Option<Value>, provider_error: Option<String>) -> Value {
    let mut details = Map::new();
    if let Some(backend) = backend {
        details.insert("backend".to_string(), backend);
    }
    if let Some(provider_error) = provider_error {
        details.insert("provider".to_string(), Value::String(provider_error));
    }
    Value::Object(details)
}
