//! Error taxonomy and HTTP error responses.
//!
//! Per-line parse failures never reach this module — they are recovered
//! where they happen. What surfaces here are connection-level conditions,
//! reported once per request and never fatal to the process.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Failures that prevent a relayed stream from starting. Conditions after
/// the first byte flows — premature termination, idle upstream, client
/// disconnect — are soft stream endings handled inside the relay, not
/// values of this type.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream connection failed: {source}")]
    UpstreamUnavailable {
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned status {status}")]
    UpstreamStatus { status: StatusCode, body: String },
}

impl RelayError {
    /// Map a pre-stream failure to the client-facing error response.
    pub fn into_error_response(self) -> Response {
        match self {
            Self::UpstreamUnavailable { source } if source.is_timeout() => gateway_timeout(
                "upstream_timeout",
                sanitize_upstream_text(&format!("Upstream request timed out: {source}")),
            ),
            Self::UpstreamUnavailable { source } => bad_gateway(
                "upstream_unavailable",
                sanitize_upstream_text(&format!("Upstream connection failed: {source}")),
            ),
            Self::UpstreamStatus { status, body } => bad_gateway(
                "upstream_status",
                format!(
                    "Upstream returned {}: {}",
                    status,
                    sanitize_upstream_text(&body)
                ),
            ),
        }
    }
}

// ============================================================================
// HTTP error responses
// ============================================================================

pub const HEADER_X_MGW_ERROR_CODE: &str = "X-MGW-Error-Code";

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    #[serde(rename = "type")]
    error_type: &'static str,
    code: &'a str,
    message: &'a str,
}

pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::BAD_REQUEST, code, message)
}

pub fn internal_error(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::INTERNAL_SERVER_ERROR, code, message)
}

pub fn bad_gateway(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::BAD_GATEWAY, code, message)
}

pub fn gateway_timeout(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::GATEWAY_TIMEOUT, code, message)
}

pub fn create_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> Response {
    let code_str = code.into();
    let message_str = message.into();

    let mut headers = HeaderMap::with_capacity(1);
    if let Ok(value) = HeaderValue::from_str(&code_str) {
        headers.insert(HEADER_X_MGW_ERROR_CODE, value);
    }

    (
        status,
        headers,
        Json(ErrorResponse {
            error: ErrorDetail {
                error_type: status.canonical_reason().unwrap_or("Unknown Status Code"),
                code: &code_str,
                message: &message_str,
            },
        }),
    )
        .into_response()
}

// ============================================================================
// Upstream text sanitization
// ============================================================================

static API_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bsk-[A-Za-z0-9_\-]{8,}").unwrap());
static BEARER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bBearer\s+\S+").unwrap());

/// Strip credential-shaped substrings from upstream error text before it is
/// echoed to a client.
pub fn sanitize_upstream_text(text: &str) -> String {
    let redacted = API_KEY_RE.replace_all(text, "sk-[redacted]");
    BEARER_RE.replace_all(&redacted, "Bearer [redacted]").into_owned()
}
