//! WebSocket upgrade + message loop. One connection is one game session.
//!
//! The loop is the session's event loop: it waits on either the next client frame or the
//! next finished service call, hands it to the `GameSession`, and writes every reply.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::game::GameSession;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "riddle_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let (mut game, mut completions) = GameSession::new(state.services.clone());
  info!(target: "riddle_backend", session = %game.id, "WebSocket connected");

  if send_all(&mut socket, game.start()).await.is_err() {
    return;
  }

  loop {
    let replies = tokio::select! {
      frame = socket.recv() => match frame {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "riddle_backend", session = %game.id, "WS received: {:?}", &incoming);
            game.handle_client(incoming)
          }
          Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          continue;
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Ok(_)) => continue,
        Some(Err(e)) => {
          error!(target: "riddle_backend", session = %game.id, error = %e, "WS receive error");
          break;
        }
      },
      Some(done) = completions.recv() => game.handle_completion(done),
    };

    if send_all(&mut socket, replies).await.is_err() {
      break;
    }
  }
  info!(target: "riddle_backend", session = %game.id, "WebSocket disconnected");
}

async fn send_all(socket: &mut WebSocket, msgs: Vec<ServerWsMessage>) -> Result<(), axum::Error> {
  for msg in msgs {
    let out = serde_json::to_string(&msg).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
    });
    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "riddle_backend", error = %e, "WS send error");
      return Err(e);
    }
  }
  Ok(())
}
