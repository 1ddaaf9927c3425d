//! Feed error taxonomy and HTTP response formatting.
//!
//! Every failure mode a render can hit maps to one variant, and each
//! variant maps to exactly one HTTP status. A feed is all-or-nothing: an
//! error here means no partial feed was produced.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Errors surfaced by a feed render, mapped to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Credential exchange failed, or the upstream rejected a fresh token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Invalid request parameters (e.g., non-numeric event id).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested drop or address is unknown upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream returned 429.
    #[error("upstream rate limit exceeded")]
    RateLimited,

    /// Upstream returned an unexpected non-2xx status.
    #[error("upstream error: status {status}")]
    Upstream {
        /// HTTP status code from the upstream response.
        status: u16,
        /// Response body, kept for logging.
        body: String,
    },

    /// Transport-level failure talking to the upstream (timeout, DNS, TLS).
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream body did not match the expected shape.
    #[error("unparseable upstream response: {0}")]
    Parse(String),

    /// Internal defect (serialization of well-formed entries, etc.).
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            Self::Auth(msg) => {
                tracing::error!(error = %msg, "credential failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "auth_failed",
                    Some("Could not authenticate with the POAP API".to_string()),
                )
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone())),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            Self::RateLimited => (
                StatusCode::SERVICE_UNAVAILABLE,
                "rate_limited",
                Some("The POAP API is rate limiting requests; try again later".to_string()),
            ),
            Self::Upstream { status, body } => {
                tracing::error!(status, body_len = body.len(), "upstream error");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    Some(format!("The POAP API returned status {status}")),
                )
            }
            Self::Http(err) => {
                tracing::error!(error = %err, "upstream request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_unreachable",
                    Some("Could not reach the POAP API".to_string()),
                )
            }
            Self::Parse(msg) => {
                tracing::error!(shape = %msg, "unparseable upstream response");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "parse_error",
                    Some("The POAP API returned an unexpected response".to_string()),
                )
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    Some("An internal error occurred".to_string()),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
