//! Webhook endpoint: `POST /chaos` answers one envelope, `GET /health`
//! reports liveness and which providers are configured.

use crate::reply::{InboundRequest, Reviewer};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub reviewer: Arc<Reviewer>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookReply {
    pub lines: [String; 2],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub providers: Vec<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chaos", post(chaos))
        .route("/health", get(health))
        .with_state(state)
}

/// POST /chaos
///
/// The body is normally an envelope; anything that does not decode as one
/// is answered as plain chat text.
async fn chaos(State(state): State<AppState>, body: String) -> Json<WebhookReply> {
    let request = match serde_json::from_str::<InboundRequest>(&body) {
        Ok(request) => request,
        Err(err) => {
            debug!("webhook body is not an envelope: {}", err);
            InboundRequest {
                text: Some(body),
                ..InboundRequest::default()
            }
        }
    };
    let reply = state.reviewer.respond_request(&request).await;
    Json(WebhookReply {
        lines: reply.into_lines(),
    })
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        providers: state.reviewer.chain().provider_names(),
    })
}

/// Serve until ctrl-c.
pub async fn serve(reviewer: Arc<Reviewer>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("webhook listening on http://{}", listener.local_addr()?);

    let app = create_router(AppState { reviewer });
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("webhook stopping");
        })
        .await?;
    Ok(())
}
