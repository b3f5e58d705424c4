use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use shared::assistant::{AskOutcome, AssistantError};
use shared::models::ErrorResponse;
use tracing::warn;

use super::super::{ASSISTANT_SOURCE_HEADER, AppState};
use super::super::errors::assistant_error_response;
use super::super::observability::RequestContext;

pub(crate) async fn ask(
    State(state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                request_id = %request_context.request_id,
                "assistant request body rejected: {rejection}"
            );
            return (
                rejection.status(),
                Json(
                    ErrorResponse::new("Corps de requête invalide")
                        .with_message(rejection.body_text()),
                ),
            )
                .into_response();
        }
    };

    let outcome = match state.assistant.ask(body).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if !matches!(err, AssistantError::Validation(_)) {
                warn!(
                    request_id = %request_context.request_id,
                    "assistant question could not be answered: {err}"
                );
            }
            return assistant_error_response(err);
        }
    };

    let source = outcome.source();
    let body = match outcome {
        AskOutcome::Primary(response) => match serde_json::to_value(&response) {
            Ok(value) => value,
            Err(err) => {
                return assistant_error_response(AssistantError::Internal(format!(
                    "failed to serialize assistant response: {err}"
                )));
            }
        },
        AskOutcome::Fallback(value) => value,
    };

    let mut response = (StatusCode::OK, Json(body)).into_response();
    response.headers_mut().insert(
        HeaderName::from_static(ASSISTANT_SOURCE_HEADER),
        HeaderValue::from_static(source.as_str()),
    );
    response
}
