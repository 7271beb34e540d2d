//! Translation of rate limit decisions into HTTP responses.
//!
//! Every evaluated request, admitted or denied, carries the standard
//! `X-RateLimit-*` feedback headers; denied requests additionally get a
//! `Retry-After` header and a JSON 429 body naming the reset time.

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::ratelimit::Decision;

/// Maximum requests allowed in the window.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Requests left in the current window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// RFC 3339 timestamp at which the window resets.
pub const RESET_HEADER: &str = "x-ratelimit-reset";
/// Seconds until the client may retry, sent on denial only.
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Build the rate limit feedback headers for a decision.
pub fn decision_headers(decision: &Decision, now_ms: i64) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    if let Ok(reset) = HeaderValue::from_str(&decision.reset_rfc3339()) {
        headers.insert(RESET_HEADER, reset);
    }

    if !decision.admitted {
        headers.insert(
            RETRY_AFTER_HEADER,
            HeaderValue::from(decision.retry_after_secs(now_ms)),
        );
    }

    headers
}

/// Apply the feedback headers for a decision to an existing header map.
pub fn apply_headers(decision: &Decision, now_ms: i64, headers: &mut HeaderMap) {
    headers.extend(decision_headers(decision, now_ms));
}

/// Build the 429 response for a denied request.
pub fn too_many_requests(decision: &Decision, now_ms: i64) -> Response {
    let body = Json(serde_json::json!({
        "error": "Too many requests",
        "message": format!(
            "Rate limit exceeded. Please try again after {}.",
            decision.reset_rfc3339()
        ),
    }));

    (
        StatusCode::TOO_MANY_REQUESTS,
        decision_headers(decision, now_ms),
        body,
    )
        .into_response()
}
