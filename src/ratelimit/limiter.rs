//! Core sliding-window rate limiter.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::identity::resolve_client_key;
use super::policy::Policy;
use super::window::WindowStore;

/// The outcome of one rate limit evaluation.
///
/// Ephemeral: decisions are computed per request and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request was admitted
    pub admitted: bool,
    /// The policy's request limit
    pub limit: u32,
    /// Requests left in the current window, zero when denied
    pub remaining: u32,
    /// Epoch milliseconds at which the window resets for this client
    pub reset_at: i64,
}

impl Decision {
    /// Seconds until the window resets, rounded up. Zero when the reset
    /// moment has already passed.
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let delta = self.reset_at.saturating_sub(now_ms);
        if delta <= 0 {
            0
        } else {
            (delta as u64).div_ceil(1000)
        }
    }

    /// The reset moment formatted as an RFC 3339 timestamp.
    pub fn reset_rfc3339(&self) -> String {
        match DateTime::<Utc>::from_timestamp_millis(self.reset_at) {
            Some(instant) => instant.to_rfc3339(),
            // Unrepresentable only for timestamps hundreds of millennia out.
            None => self.reset_at.to_string(),
        }
    }
}

/// Per-endpoint, per-client sliding-window rate limiter.
///
/// One limiter instance holds an independent window store for every endpoint
/// it has seen; stores are created lazily on first evaluation and live for
/// the lifetime of the limiter. Endpoints never share client state.
///
/// The limiter is an owned registry — construct it at the application's
/// composition root and share it via `Arc` — rather than a process-global,
/// so tests and embedded deployments can run multiple independent instances.
///
/// State is process-local only: horizontally scaled deployments enforce a
/// per-instance quota, not a global one.
pub struct RateLimiter {
    /// Window stores indexed by endpoint name
    endpoints: DashMap<String, Arc<Mutex<WindowStore>>>,
}

impl RateLimiter {
    /// Create a new limiter with no tracked endpoints.
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
        }
    }

    /// Evaluate a request end to end: resolve the client key from request
    /// metadata, then run the sliding-window check.
    ///
    /// This is the contract consumed by the middleware adapter; callers that
    /// already hold a client key can use [`RateLimiter::check`] directly.
    pub fn evaluate(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        subject: Option<&str>,
        policy: &Policy,
        now_ms: i64,
    ) -> Decision {
        let client_key = resolve_client_key(headers, peer, subject);
        self.check(endpoint, &client_key, policy, now_ms)
    }

    /// Run the sliding-window check for one (endpoint, client key) pair.
    ///
    /// The window is half-open `(now - interval, now]`: timestamps at or
    /// before the window start are pruned, survivors are counted against the
    /// policy limit, and an admitted request appends `now`. The whole
    /// read-prune-append-write runs as a single critical section on the
    /// endpoint's store, so two concurrent requests can never both claim the
    /// last slot.
    pub fn check(
        &self,
        endpoint: &str,
        client_key: &str,
        policy: &Policy,
        now_ms: i64,
    ) -> Decision {
        let store = self.endpoint_store(endpoint);
        let mut store = store.lock();

        let interval_ms = policy.interval_ms();
        let window_start = now_ms - interval_ms;

        let mut timestamps = store
            .get(client_key, now_ms)
            .map(|entry| entry.timestamps().to_vec())
            .unwrap_or_default();
        timestamps.retain(|&t| t > window_start);

        if timestamps.len() >= policy.max_requests as usize {
            let reset_at = match timestamps.first() {
                Some(&oldest) => oldest + interval_ms,
                None => {
                    // Unreachable while max_requests > 0; fail closed anyway.
                    error!(
                        endpoint = %endpoint,
                        client_key = %client_key,
                        "Denied request with empty window, failing closed"
                    );
                    now_ms + interval_ms
                }
            };

            warn!(
                endpoint = %endpoint,
                client_key = %client_key,
                count = timestamps.len(),
                limit = policy.max_requests,
                "Rate limit exceeded"
            );

            // Persist the prune only; the denied request is not counted.
            store.set(
                client_key,
                timestamps,
                now_ms,
                interval_ms,
                policy.tracked_clients,
            );

            return Decision {
                admitted: false,
                limit: policy.max_requests,
                remaining: 0,
                reset_at,
            };
        }

        timestamps.push(now_ms);
        let remaining = policy.max_requests - timestamps.len() as u32;

        debug!(
            endpoint = %endpoint,
            client_key = %client_key,
            count = timestamps.len(),
            remaining = remaining,
            "Request admitted"
        );

        store.set(
            client_key,
            timestamps,
            now_ms,
            interval_ms,
            policy.tracked_clients,
        );

        Decision {
            admitted: true,
            limit: policy.max_requests,
            remaining,
            reset_at: now_ms + interval_ms,
        }
    }

    /// Clear the window for one (endpoint, client key) pair.
    ///
    /// Idempotent; a missing endpoint or key is a no-op. Intended for use
    /// after a successful authentication, to forgive a client's accumulated
    /// failed-attempt counters.
    pub fn clear(&self, endpoint: &str, client_key: &str) {
        if let Some(store) = self.endpoints.get(endpoint) {
            debug!(
                endpoint = %endpoint,
                client_key = %client_key,
                "Clearing rate limit window"
            );
            store.lock().delete(client_key);
        }
    }

    /// The number of endpoints with a window store.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// The number of distinct client keys tracked for an endpoint, or zero
    /// for an endpoint that has never been evaluated.
    pub fn tracked_clients(&self, endpoint: &str) -> usize {
        self.endpoints
            .get(endpoint)
            .map(|store| store.lock().len())
            .unwrap_or(0)
    }

    fn endpoint_store(&self, endpoint: &str) -> Arc<Mutex<WindowStore>> {
        self.endpoints
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(WindowStore::new())))
            .clone()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
