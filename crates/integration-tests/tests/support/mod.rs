#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use api_server::http::{AppState, build_router};
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::assistant::AssistantGateway;
use shared::backend::BackendClient;
use shared::config::{AssistantDefaults, BackendConfig, ProviderConfig};
use shared::llm::{LlmGateway, OpenRouterGateway};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub body: Value,
}

impl MockReply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn error(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

/// One in-process server playing both the chat-completions provider and the
/// secondary backend, recording everything it receives.
#[derive(Debug, Clone, Default)]
pub struct UpstreamState {
    provider_replies: Arc<Mutex<VecDeque<MockReply>>>,
    backend_replies: Arc<Mutex<VecDeque<MockReply>>>,
    pub provider_payloads: Arc<Mutex<Vec<Value>>>,
    pub backend_bodies: Arc<Mutex<Vec<Bytes>>>,
    pub suggestion_queries: Arc<Mutex<Vec<Option<String>>>>,
}

impl UpstreamState {
    pub fn new(provider_replies: Vec<MockReply>, backend_replies: Vec<MockReply>) -> Self {
        Self {
            provider_replies: Arc::new(Mutex::new(VecDeque::from(provider_replies))),
            backend_replies: Arc::new(Mutex::new(VecDeque::from(backend_replies))),
            ..Self::default()
        }
    }

    pub async fn provider_calls(&self) -> usize {
        self.provider_payloads.lock().await.len()
    }

    pub async fn backend_calls(&self) -> usize {
        self.backend_bodies.lock().await.len()
    }
}

pub struct Upstream {
    pub base_url: String,
    pub state: UpstreamState,
    shutdown_tx: oneshot::Sender<()>,
    server_task: tokio::task::JoinHandle<()>,
}

impl Upstream {
    pub async fn start(state: UpstreamState) -> Self {
        let app = Router::new()
            .route("/api/v1/chat/completions", post(chat_completions_handler))
            .route("/assistant/ask", post(backend_ask_handler))
            .route("/assistant/suggestions", get(backend_suggestions_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let local_addr = listener
            .local_addr()
            .expect("listener address should resolve");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("upstream test server should run");
        });

        Self {
            base_url: format!("http://{local_addr}"),
            state,
            shutdown_tx,
            server_task,
        }
    }

    pub async fn stop(self) {
        self.shutdown_tx
            .send(())
            .expect("shutdown signal should send");
        self.server_task.await.expect("server task should join");
    }
}

/// Router wired to `upstream`; the provider is left unconfigured when
/// `with_provider` is false.
pub fn build_test_router(upstream: &Upstream, with_provider: bool) -> Router {
    build_test_router_with_backend_url(upstream, with_provider, &upstream.base_url)
}

pub fn build_test_router_with_backend_url(
    upstream: &Upstream,
    with_provider: bool,
    backend_url: &str,
) -> Router {
    let llm = with_provider.then(|| {
        let gateway = OpenRouterGateway::new(&ProviderConfig {
            base_url: format!("{}/api/v1", upstream.base_url),
            api_key: "integration-test-key".to_string(),
            model: "test-model".to_string(),
            timeout_ms: 5_000,
            public_app_url: None,
            app_title: "AI Tools Directory".to_string(),
        })
        .expect("provider gateway should build");
        Arc::new(gateway) as Arc<dyn LlmGateway>
    });

    build_router_with_llm(llm, backend_url)
}

/// Router backed by an arbitrary provider implementation.
pub fn build_router_with_llm(llm: Option<Arc<dyn LlmGateway>>, backend_url: &str) -> Router {
    let backend = BackendClient::new(&BackendConfig {
        base_url: backend_url.to_string(),
        timeout_ms: 5_000,
    })
    .expect("backend client should build");

    build_router(AppState {
        assistant: AssistantGateway::new(llm, Arc::new(backend), AssistantDefaults::default()),
    })
}

pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "gen-integration",
        "model": "test-model",
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

async fn chat_completions_handler(
    State(state): State<UpstreamState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.provider_payloads.lock().await.push(payload);
    let reply = state
        .provider_replies
        .lock()
        .await
        .pop_front()
        .unwrap_or(MockReply::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": { "code": "exhausted_test_replies" } }),
        ));
    (reply.status, Json(reply.body))
}

async fn backend_ask_handler(
    State(state): State<UpstreamState>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    state.backend_bodies.lock().await.push(body);
    let reply = state
        .backend_replies
        .lock()
        .await
        .pop_front()
        .unwrap_or(MockReply::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "exhausted_test_replies" }),
        ));
    (reply.status, Json(reply.body))
}

async fn backend_suggestions_handler(
    State(state): State<UpstreamState>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    state.suggestion_queries.lock().await.push(query);
    Json(json!({ "suggestions": ["Quel outil pour automatiser mes emails ?"] }))
}
