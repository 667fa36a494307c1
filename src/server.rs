use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::{
    chat::{
        CompletionGateway,
        client::GeminiTransport,
        engine::RetryPolicy,
    },
    config::GatewayConfig,
};

pub mod error;
pub mod routes;
pub mod session;

pub use session::{InMemorySessionStore, Session, SessionStore, SessionSummary};

pub struct AppState {
    pub gateway: CompletionGateway,
    pub sessions: Arc<dyn SessionStore>,
    pub system_prompt: String,
    pub chat_timeout: Duration,
}

impl AppState {
    /// Wires the production gateway from config. `default_credential` is
    /// resolved once by the caller and never re-read.
    pub fn from_config(config: &GatewayConfig, default_credential: Option<String>) -> Result<Self> {
        let transport = Arc::new(GeminiTransport::new(&config.llm)?);
        let gateway = CompletionGateway::new(
            transport,
            RetryPolicy::from(&config.retry),
            default_credential,
        )
        .with_max_output_tokens(config.llm.max_output_tokens);

        Ok(Self {
            gateway,
            sessions: Arc::new(InMemorySessionStore::new()),
            system_prompt: config.tutor.system_prompt.clone(),
            chat_timeout: Duration::from_secs(config.server.chat_timeout_secs),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/socratic_chat", post(routes::socratic_chat))
        .route("/socratic_sessions", get(routes::list_sessions))
        .route(
            "/socratic_sessions/{session_id}",
            get(routes::get_session).delete(routes::delete_session),
        )
        .with_state(state)
}

pub async fn serve(config: &GatewayConfig, state: AppState) -> Result<()> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address).await?;

    log::info!("socratic gateway listening on {address}");

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(async {
            if let Err(why) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for shutdown signal: {why:?}");
            }
            log::info!("shutting down");
        })
        .await?;

    Ok(())
}
