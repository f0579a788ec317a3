//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/riddle", get(http::http_get_riddle))
        .route("/api/v1/chat", post(http::http_post_chat))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Riddle, RiddleSource};
    use crate::error::ServiceError;
    use crate::local::KeywordClassifier;
    use crate::services::RiddleGenerator;
    use crate::state::Services;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    struct Fixed(Result<Riddle, ServiceError>);

    #[async_trait]
    impl RiddleGenerator for Fixed {
        async fn generate(&self, _constraints: &str) -> Result<Riddle, ServiceError> {
            self.0.clone()
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn app(result: Result<Riddle, ServiceError>) -> Router {
        let services = Services {
            riddles: Arc::new(Fixed(result)),
            intents: Arc::new(KeywordClassifier),
            timeout: Duration::from_secs(5),
        };
        build_router(Arc::new(AppState::with_services(services)))
    }

    async fn json_body(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), 64 * 1024).await.expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    fn map_riddle() -> Riddle {
        Riddle::new(
            "I have cities, but no houses. What am I?",
            "A map",
            "I show you places.",
            RiddleSource::LocalBank,
        )
        .expect("riddle")
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = app(Ok(map_riddle()))
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["ok"], true);
    }

    #[tokio::test]
    async fn riddle_endpoint_returns_full_riddle() {
        let res = app(Ok(map_riddle()))
            .oneshot(
                Request::get("/api/v1/riddle?constraints=topic%3A%20geography")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::OK);
        let v = json_body(res).await;
        assert_eq!(v["answer"], "A map");
        assert_eq!(v["hint"], "I show you places.");
        assert_eq!(v["source"], "local_bank");
    }

    #[tokio::test]
    async fn riddle_errors_map_to_status_and_kind() {
        let cases = [
            (ServiceError::Overloaded("503".into()), StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
            (ServiceError::Connectivity("down".into()), StatusCode::BAD_GATEWAY, "connectivity"),
            (ServiceError::Unexpected("boom".into()), StatusCode::INTERNAL_SERVER_ERROR, "unexpected"),
        ];
        for (err, status, kind) in cases {
            let res = app(Err(err))
                .oneshot(Request::get("/api/v1/riddle").body(Body::empty()).expect("request"))
                .await
                .expect("response");
            assert_eq!(res.status(), status);
            assert_eq!(json_body(res).await["error"], kind);
        }
    }

    #[tokio::test]
    async fn chat_endpoint_classifies_and_builds_constraint() {
        let res = app(Ok(map_riddle()))
            .oneshot(
                Request::post("/api/v1/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message":"make it harder"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::OK);
        let v = json_body(res).await;
        assert_eq!(v["intent"], "difficulty");
        assert_eq!(v["value"], "hard");
        assert_eq!(v["constraint"], "difficulty: hard");
    }

    #[tokio::test]
    async fn chat_endpoint_rejects_empty_message() {
        let res = app(Ok(map_riddle()))
            .oneshot(
                Request::post("/api/v1/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message":"   "}"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
