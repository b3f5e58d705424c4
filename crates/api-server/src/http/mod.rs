use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::assistant::AssistantGateway;
use tower_http::catch_panic::CatchPanicLayer;

mod assistant;
mod errors;
mod health;
mod observability;

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
const ASSISTANT_SOURCE_HEADER: &str = "x-assistant-source";

#[derive(Clone)]
pub struct AppState {
    pub assistant: AssistantGateway,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/assistant/ask", post(assistant::ask))
        .route("/assistant/suggestions", get(assistant::suggestions))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(CatchPanicLayer::custom(errors::panic_response))
        .layer(middleware::from_fn(
            observability::request_observability_middleware,
        ))
        .with_state(app_state)
}
