use std::net::SocketAddr;
use std::sync::Arc;

use api_server::http::{AppState, build_router};
use shared::assistant::AssistantGateway;
use shared::backend::BackendClient;
use shared::config::{ApiConfig, load_dotenv};
use shared::llm::{LlmGateway, OpenRouterGateway};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=info,shared=info,axum=info".to_string()),
        )
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .init();

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load api server config");
            std::process::exit(1);
        }
    };

    let backend = match BackendClient::new(&config.backend) {
        Ok(backend) => backend,
        Err(err) => {
            error!(error = %err, "failed to initialize backend client");
            std::process::exit(1);
        }
    };

    let llm: Option<Arc<dyn LlmGateway>> = match config.provider.as_ref() {
        Some(provider) => match OpenRouterGateway::new(provider) {
            Ok(gateway) => {
                info!(model = %provider.model, "assistant provider configured");
                Some(Arc::new(gateway) as Arc<dyn LlmGateway>)
            }
            Err(err) => {
                error!(error = %err, "failed to initialize assistant provider");
                std::process::exit(1);
            }
        },
        None => {
            warn!("OPENROUTER_API_KEY not set; assistant questions will use the backend only");
            None
        }
    };

    let assistant = AssistantGateway::new(llm, Arc::new(backend), config.assistant);
    let provider_configured = assistant.provider_configured();
    let app = build_router(AppState { assistant });

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!(error = %err, bind_addr = %config.bind_addr, "invalid API_BIND_ADDR");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, "failed to bind api server listener");
            std::process::exit(1);
        }
    };

    info!(
        backend_url = %config.backend.base_url,
        provider_configured,
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %err, "api server terminated");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
