//! HTTP surface
//!
//! An axum router translating JSON and multipart requests into
//! `ChatService` calls. Every handled request answers HTTP 200 with a
//! `success` flag; only malformed bodies are rejected by the extractors.

mod handlers;

use crate::auth::{HeaderIdentity, IdentityResolver};
use crate::config::Config;
use crate::error::{ParleyError, Result};
use crate::service::ChatService;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state for every handler
pub struct AppState {
    pub service: ChatService,
    pub identity: Arc<dyn IdentityResolver>,
    /// Request body cap for multipart uploads (bytes)
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Build the state described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the service or identity resolver cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            service: ChatService::from_config(config)?,
            identity: Arc::new(HeaderIdentity::new(&config.server.identity_header)?),
            max_upload_bytes: config.server.max_upload_bytes,
        })
    }
}

/// Build the axum router with all routes
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/chat/create", post(handlers::create_chat))
        .route("/api/chat/get", get(handlers::list_chats))
        .route("/api/chats/:chat_id", get(handlers::get_chat))
        .route("/api/chat/ai", post(handlers::submit_prompt))
        .route(
            "/api/chat/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/chat/regenerate", post(handlers::regenerate))
        .route("/api/chat/pin", post(handlers::pin))
        .route("/api/chat/rename", post(handlers::rename_chat))
        .route("/api/chat/delete", post(handlers::delete_chat))
        .with_state(state)
}

/// Bind `bind` and serve until Ctrl-C
///
/// # Errors
///
/// Returns error if the address is invalid or cannot be bound
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| ParleyError::Config(format!("Invalid bind address {}: {}", bind, e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Parley listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
