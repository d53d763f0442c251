use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::jwt::{verify_token, TokenType};
use crate::planner::{
    self,
    clock::{self, RolloverWatcher},
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    // Authenticate the connection via token query param.
    let user_id = match authenticate_ws(&state, query.token.as_deref()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("WebSocket auth failed: {}", e);
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

fn authenticate_ws(state: &AppState, token: Option<&str>) -> Result<Uuid, &'static str> {
    let token = token.ok_or("Missing token query parameter")?;

    let token_data =
        verify_token(token, &state.config).map_err(|_| "Invalid or expired token")?;

    if token_data.claims.token_type != TokenType::Access {
        return Err("Must use access token for WebSocket");
    }

    Ok(token_data.claims.sub)
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!(user_id = %user_id, "WebSocket connection established");

    let mut rx = state
        .ws_tx
        .as_ref()
        .map(|tx| tx.subscribe())
        .expect("WebSocket broadcast channel not initialized");

    // One rollover watcher per connection, in the user's own timezone.
    // The watcher lives in this scope so closing the socket drops it and
    // aborts the polling task.
    let tz = match planner::user_timezone(&state.db, user_id).await {
        Ok(tz) => tz,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to resolve timezone, closing socket");
            return;
        }
    };

    let (rollover_tx, mut rollover_rx) = tokio::sync::mpsc::channel::<String>(8);
    let _watcher = RolloverWatcher::spawn(tz, state.config.rollover_poll(), move |prev, new| {
        let msg = serde_json::json!({
            "type": "day_rollover",
            "previous_date": clock::date_key(prev),
            "new_date": clock::date_key(new),
        });
        let _ = rollover_tx.try_send(msg.to_string());
    });

    let uid = user_id;
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                broadcast = rx.recv() => match broadcast {
                    Ok(msg) => {
                        // Record-change events carry the owning user's id;
                        // forward only this user's.
                        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&msg) {
                            if let Some(owner) = parsed.get("user_id").and_then(|v| v.as_str()) {
                                if owner != uid.to_string() {
                                    continue;
                                }
                            }
                        }
                        msg
                    }
                    Err(_) => break,
                },
                rollover = rollover_rx.recv() => match rollover {
                    Some(msg) => msg,
                    None => break,
                },
            };

            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    tracing::debug!(user_id = %user_id, message = %text, "WebSocket message received");
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}
