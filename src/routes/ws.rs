//! WebSocket endpoint
//!
//! Push-style variant of the query API over a persistent connection:
//! `welcome` on connect, then per query a `status` frame followed by either
//! `results` or `error`.

use crate::agents;
use crate::models::{AppState, QueryResult};
use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

#[derive(Deserialize)]
struct WsClientMessage {
    #[serde(rename = "type")]
    msg_type: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WsServerMessage {
    Welcome { message: String },
    Status { status: String, message: String },
    Results { results: QueryResult },
    Error { message: String },
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    info!("WebSocket connection established");

    let welcome = WsServerMessage::Welcome {
        message: "Connected to Art History AI. Send queries about biblical narratives to \
                  explore historical religious artwork."
            .to_string(),
    };
    if !send(&mut socket, &welcome).await {
        return;
    }

    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue, // ignore binary, ping, pong
            Err(_) => break,
        };

        let client_msg: WsClientMessage = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "Malformed WebSocket message");
                let err = WsServerMessage::Error {
                    message: "Failed to process your request".to_string(),
                };
                if !send(&mut socket, &err).await {
                    return;
                }
                continue;
            }
        };

        if client_msg.msg_type != "query" || client_msg.content.trim().is_empty() {
            continue;
        }
        let query = client_msg.content.trim().to_string();

        // Counts toward stats even if the pipeline fails below.
        state.stats.record_query(&query).await;

        let status = WsServerMessage::Status {
            status: "processing".to_string(),
            message: "Searching for artistic depictions...".to_string(),
        };
        if !send(&mut socket, &status).await {
            return;
        }

        match agents::process_query(&state, &query).await {
            Ok(results) => {
                if !send(&mut socket, &WsServerMessage::Results { results }).await {
                    return;
                }
            }
            Err(e) => {
                error!(error = %e, query = %query, "WebSocket query failed");
                let err = WsServerMessage::Error {
                    message: "Failed to process your request".to_string(),
                };
                if !send(&mut socket, &err).await {
                    return;
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

/// Send a frame; false means the client went away.
async fn send(socket: &mut WebSocket, message: &WsServerMessage) -> bool {
    let json = serde_json::to_string(message).unwrap_or_default();
    socket.send(WsMessage::Text(json.into())).await.is_ok()
}
