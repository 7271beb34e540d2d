//! Client identity resolution.
//!
//! Derives a stable client key from proxy and transport metadata. Resolution
//! never fails: a request with no identifying signal at all falls back to the
//! shared [`UNKNOWN_CLIENT`] key. That means all unidentified callers count
//! against a single quota bucket, which is a deliberate trade-off — see the
//! crate documentation.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Sentinel client key for requests with no identifying signal.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Header set by proxies with the original client address chain.
const FORWARDED_FOR: &str = "x-forwarded-for";

/// Single-value client address header set by some reverse proxies.
const REAL_IP: &str = "x-real-ip";

/// Resolve the client key for a request.
///
/// Resolution order, first match wins:
/// 1. `x-forwarded-for` — the first entry of the comma-separated chain,
///    whitespace trimmed;
/// 2. `x-real-ip`;
/// 3. the transport-level peer address;
/// 4. the literal `"unknown"`.
///
/// When an authenticated subject is supplied, it is appended as
/// `address:subject` so one network address maps to distinct buckets per
/// authenticated user.
pub fn resolve_client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    subject: Option<&str>,
) -> String {
    let address = forwarded_address(headers)
        .or_else(|| real_ip(headers))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    match subject {
        Some(subject) => format!("{}:{}", address, subject),
        None => address,
    }
}

fn forwarded_address(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(first.to_string())
}

fn real_ip(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REAL_IP)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}
