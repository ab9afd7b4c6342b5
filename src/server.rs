//! HTTP and WebSocket server for GUI clients
//!
//! Routes:
//! - `GET /`, `GET /ws` - WebSocket endpoint (plain `GET /` redirects to the
//!   front-end when one is served)
//! - `GET /api/health` - liveness
//! - `GET /api/status` - gateway snapshot
//! - everything else - static front-end, if configured

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{debug, info, warn};

use crate::gateway::GatewayHandle;
use crate::hub::{ClientConnection, ClientId, CLIENT_QUEUE_CAPACITY};
use crate::protocol::ServerEvent;
use crate::router::parse_client_message;

/// Shared state for HTTP handlers
pub struct ServerState {
    pub gateway: GatewayHandle,
    /// Pre-built front-end served as fallback
    pub static_dir: Option<PathBuf>,
}

/// Build the HTTP router
pub fn build_router(state: Arc<ServerState>) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/ws", get(websocket_upgrade))
        .route("/api/health", get(health_check))
        .route("/api/status", get(gateway_status))
        .with_state(Arc::clone(&state));

    if let Some(dir) = &state.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.layer(CorsLayer::permissive())
}

/// GET / - WebSocket upgrade, or a pointer to the front-end
async fn root(ws: Option<WebSocketUpgrade>, State(state): State<Arc<ServerState>>) -> Response {
    match ws {
        Some(ws) => upgrade(ws, state),
        None if state.static_dir.is_some() => Redirect::temporary("/index.html").into_response(),
        None => "Launchkey MIDI server - connect a WebSocket client to /ws".into_response(),
    }
}

/// GET /ws - WebSocket upgrade
async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    upgrade(ws, state)
}

fn upgrade(ws: WebSocketUpgrade, state: Arc<ServerState>) -> Response {
    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| handle_websocket(socket, gateway))
}

/// GET /api/health - Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "message": "MIDI server running"}))
}

/// GET /api/status - Gateway snapshot
async fn gateway_status(State(state): State<Arc<ServerState>>) -> Response {
    match state.gateway.status().await {
        Some(status) => Json(status).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "gateway stopped"})),
        )
            .into_response(),
    }
}

/// Parse one inbound frame and pass it on. Returns the reply for the sender, if any.
fn handle_client_text(gateway: &GatewayHandle, client: ClientId, text: &str) -> Option<String> {
    match parse_client_message(text) {
        Ok(command) => {
            gateway.send_command(command);
            None
        }
        Err(e) if e.needs_reply() => {
            warn!(client = %client, "Invalid client message: {}", e);
            ServerEvent::invalid_format().to_json().ok()
        }
        Err(e) => {
            warn!(client = %client, "Dropping client message: {}", e);
            None
        }
    }
}

/// Handle one WebSocket connection until either side goes away
async fn handle_websocket(mut socket: WebSocket, gateway: GatewayHandle) {
    let (tx, mut rx) = mpsc::channel::<String>(CLIENT_QUEUE_CAPACITY);
    let client = ClientConnection::new(tx);
    let id = client.id;
    gateway.connect(client);
    debug!(client = %id, "WebSocket connection opened");

    loop {
        tokio::select! {
            // Events from the gateway
            outbound = rx.recv() => {
                match outbound {
                    Some(text) => {
                        if socket.send(Message::Text(text)).await.is_err() {
                            debug!(client = %id, "WebSocket send failed");
                            break;
                        }
                    }
                    None => {
                        debug!(client = %id, "Gateway released client");
                        break;
                    }
                }
            }
            // Commands from the client
            inbound = socket.recv() => {
                let reply = match inbound {
                    Some(Ok(Message::Text(text))) => handle_client_text(&gateway, id, &text),
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => handle_client_text(&gateway, id, text),
                        Err(_) => {
                            warn!(client = %id, "Binary frame is not UTF-8");
                            ServerEvent::invalid_format().to_json().ok()
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                        None
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(client = %id, "WebSocket client closed connection");
                        break;
                    }
                    Some(Ok(Message::Pong(_))) => None,
                    Some(Err(e)) => {
                        warn!(client = %id, "WebSocket error: {}", e);
                        break;
                    }
                };

                if let Some(reply) = reply {
                    if socket.send(Message::Text(reply)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    gateway.disconnect(id);
}

/// Bind the listening socket
pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind server to {}", addr))?;

    info!("🚀 MIDI server listening on http://{}", addr);
    info!("🔌 WebSocket endpoint: ws://{}/ws", addr);
    Ok(listener)
}

/// Serve until the task is aborted
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) -> Result<()> {
    let router = build_router(state);

    axum::serve(listener, router)
        .await
        .context("HTTP server error")?;

    Ok(())
}
