//! HTTP surface of the gateway.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use memo_protocol::api::{AnalyzeRequest, ChatRequest};

use crate::{config::GatewayConfig, error, relay, upstream::UpstreamClient};

/// Maximum accepted input length, in characters. The browser extension caps
/// selections at 1000; the gateway allows headroom for other clients.
const MAX_INPUT_CHARS: usize = 2000;

/// Shared state for all requests. Holds no per-request mutable state —
/// every stream owns its own buffers and connections.
pub struct AppContext {
    pub config: GatewayConfig,
    pub upstream: UpstreamClient,
}

/// Build the router: the two streaming endpoints plus a health probe, with
/// permissive CORS (the extension calls from arbitrary page origins) and
/// request tracing.
pub fn app(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn analyze(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    let text = request.text.trim();
    if let Err(response) = validate_input("text", text) {
        return response;
    }
    relay::analyze_stream(&ctx, text).await
}

async fn chat(State(ctx): State<Arc<AppContext>>, Json(request): Json<ChatRequest>) -> Response {
    let message = request.message.trim();
    if let Err(response) = validate_input("message", message) {
        return response;
    }
    if request.context.chars().count() > MAX_INPUT_CHARS {
        return error::bad_request(
            "input_too_long",
            format!("'context' exceeds {MAX_INPUT_CHARS} characters"),
        );
    }
    relay::chat_stream(&ctx, request.context.trim(), message).await
}

async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

fn validate_input(field: &str, value: &str) -> Result<(), Response> {
    if value.is_empty() {
        return Err(error::bad_request(
            "invalid_request",
            format!("'{field}' must not be empty"),
        ));
    }
    if value.chars().count() > MAX_INPUT_CHARS {
        return Err(error::bad_request(
            "input_too_long",
            format!("'{field}' exceeds {MAX_INPUT_CHARS} characters"),
        ));
    }
    Ok(())
}
