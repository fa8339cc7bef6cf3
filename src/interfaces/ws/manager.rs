//! WebSocket endpoint for cinema managers
//!
//! A manager keeps one socket open to receive booking confirmations for the
//! cinemas they own. Inbound text is ignored; the channel is push-only.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::{select, sync::mpsc, time::timeout};
use tracing::{debug, error, info, warn};

use crate::application::SharedManagerRegistry;
use crate::infrastructure::crypto::AuthError;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{auth_error_response, bearer_token, IdentityProvider};
use crate::shared::ShutdownSignal;

/// State for the manager socket handler
#[derive(Clone)]
pub struct ManagerWsState {
    pub registry: SharedManagerRegistry,
    pub identity: Arc<dyn IdentityProvider>,
    pub write_timeout: Duration,
    pub channel_capacity: usize,
    pub shutdown: ShutdownSignal,
}

/// Browsers cannot set headers on a WebSocket handshake
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler for `/ws/{manager_id}`
///
/// Authentication runs before the upgrade is inspected, so a plain GET
/// without credentials gets a 401 rather than an upgrade error.
pub async fn manager_ws_handler(
    State(state): State<ManagerWsState>,
    Path(manager_id): Path<i32>,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = bearer_token(&headers).or(query.token.as_deref());
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return auth_error_response(AuthError::MissingToken);
    };

    let identity = match state.identity.identify(token) {
        Ok(identity) => identity,
        Err(e) => return auth_error_response(e),
    };

    if !identity.can_act_for(manager_id) {
        warn!(
            caller = identity.user_id,
            manager_id, "Rejected manager socket for another account"
        );
        let body = Json(ApiResponse::<()>::error(
            "Forbidden: cannot subscribe to another manager's notifications",
        ));
        return (StatusCode::FORBIDDEN, body).into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    info!(manager_id, caller = identity.user_id, "Manager WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_manager_socket(socket, state, manager_id))
}

async fn handle_manager_socket(socket: WebSocket, state: ManagerWsState, manager_id: i32) {
    let (tx, mut rx) = mpsc::channel(state.channel_capacity.max(1));
    let connection_id = state.registry.register(manager_id, tx);
    let (mut sender, mut receiver) = socket.split();

    info!(manager_id, connection_id, "Manager connected");

    loop {
        select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(manager_id, "Ignoring inbound text: {}", text.as_str());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            warn!(manager_id, "Failed to send pong: {}", e);
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!(manager_id, "Manager sent close");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(manager_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!(manager_id, "WebSocket stream ended");
                        break;
                    }
                    _ => {}
                }
            }

            outbound = rx.recv() => {
                let Some(message) = outbound else {
                    // sender dropped by the registry: a newer socket replaced this one
                    info!(manager_id, connection_id, "Connection superseded");
                    break;
                };

                let text = match message.to_text() {
                    Ok(text) => text,
                    Err(e) => {
                        error!(manager_id, "Failed to serialize {}: {}", message.kind(), e);
                        continue;
                    }
                };

                match timeout(state.write_timeout, sender.send(Message::Text(text.into()))).await {
                    Ok(Ok(())) => debug!(manager_id, kind = message.kind(), "Notification sent"),
                    Ok(Err(e)) => {
                        warn!(manager_id, "Failed to send notification: {}", e);
                        break;
                    }
                    Err(_) => {
                        warn!(
                            manager_id,
                            timeout_ms = state.write_timeout.as_millis() as u64,
                            "Notification write timed out"
                        );
                        break;
                    }
                }
            }

            _ = state.shutdown.wait() => {
                if timeout(state.write_timeout, sender.send(Message::Close(None))).await.is_err() {
                    warn!(manager_id, "Close frame write timed out");
                }
                break;
            }
        }
    }

    if state.registry.unregister_connection(manager_id, connection_id) {
        info!(manager_id, connection_id, "Manager disconnected");
    }
}
