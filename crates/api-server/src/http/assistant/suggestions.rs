use axum::Json;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::super::AppState;
use super::super::errors::assistant_error_response;

/// Pass-through to the backend's suggestion list.
pub(crate) async fn suggestions(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    match state.assistant.suggestions(query).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => assistant_error_response(err),
    }
}
