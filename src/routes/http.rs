//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::error::ServiceError;
use crate::logic::{classify_message, fetch_riddle};
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for ServiceError {
  fn into_response(self) -> Response {
    let status = match self {
      ServiceError::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
      ServiceError::Connectivity(_) => StatusCode::BAD_GATEWAY,
      ServiceError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorOut { error: self.kind(), message: self.riddle_message().to_string() };
    (status, Json(body)).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, q), fields(constraints = %q.constraints.as_deref().unwrap_or("")))]
pub async fn http_get_riddle(
  State(state): State<Arc<AppState>>,
  Query(q): Query<RiddleQuery>,
) -> Result<Json<GeneratedRiddleOut>, ServiceError> {
  let constraints = q.constraints.unwrap_or_default();
  let riddle = fetch_riddle(&state.services, constraints.trim()).await?;
  info!(target: "riddle", source = ?riddle.source, "HTTP riddle served");
  Ok(Json(riddle.into()))
}

#[instrument(level = "info", skip(state, body), fields(message_len = body.message.len()))]
pub async fn http_post_chat(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ChatIn>,
) -> Response {
  let message = body.message.trim();
  if message.is_empty() {
    return (
      StatusCode::BAD_REQUEST,
      Json(serde_json::json!({ "error": "empty_message", "message": "Message cannot be empty." })),
    )
      .into_response();
  }
  let c = classify_message(&state.services, message).await;
  info!(target: "chat", intent = ?c.intent, "HTTP chat classified");
  Json(ChatOut::from(c)).into_response()
}
