//! Axum middleware adapter for the rate limiter.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use super::report;
use crate::ratelimit::{Policy, RateLimiter};

/// Authenticated subject identifier attached to a request by upstream
/// authentication middleware.
///
/// When present, the subject is appended to the resolved client address so
/// authenticated users behind one proxy address get separate quota buckets.
#[derive(Debug, Clone)]
pub struct AuthenticatedSubject(pub String);

/// State for one rate-limited route group: the shared limiter, the policy to
/// enforce, and an optional explicit endpoint name.
///
/// By default each request counts against its own request path. Routes that
/// should share a single logical bucket can be given a common endpoint name
/// with [`RateLimit::for_endpoint`].
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
    policy: Policy,
    endpoint: Option<String>,
}

impl RateLimit {
    /// Rate-limit requests under `policy`, counting per request path.
    pub fn new(limiter: Arc<RateLimiter>, policy: Policy) -> Self {
        Self {
            limiter,
            policy,
            endpoint: None,
        }
    }

    /// Count all wrapped routes against one named endpoint instead of their
    /// individual request paths.
    pub fn for_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Middleware function enforcing the rate limit.
///
/// Apply with `axum::middleware::from_fn_with_state`:
///
/// ```ignore
/// let limiter = Arc::new(RateLimiter::new());
/// let app = Router::new()
///     .route("/login", post(login))
///     .layer(middleware::from_fn_with_state(
///         RateLimit::new(limiter, Policy::AUTH),
///         rate_limit,
///     ));
/// ```
///
/// Admitted requests run the wrapped handler and get the `X-RateLimit-*`
/// feedback headers applied to its response. Denied requests short-circuit
/// with a 429 without invoking the handler. The middleware never fails the
/// request pipeline itself.
pub async fn rate_limit(State(state): State<RateLimit>, req: Request, next: Next) -> Response {
    let endpoint = match &state.endpoint {
        Some(endpoint) => endpoint.clone(),
        None => req.uri().path().to_string(),
    };
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let subject = req
        .extensions()
        .get::<AuthenticatedSubject>()
        .map(|subject| subject.0.clone());

    let now_ms = Utc::now().timestamp_millis();
    let decision = state.limiter.evaluate(
        &endpoint,
        req.headers(),
        peer,
        subject.as_deref(),
        &state.policy,
        now_ms,
    );

    if !decision.admitted {
        return report::too_many_requests(&decision, now_ms);
    }

    let mut response = next.run(req).await;
    report::apply_headers(&decision, now_ms, response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{middleware, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(limiter: Arc<RateLimiter>, policy: Policy) -> Router {
        Router::new()
            .route("/api/status", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                RateLimit::new(limiter, policy),
                rate_limit,
            ))
    }

    fn request(client: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri("/api/status")
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_admitted_request_passes_through_with_headers() {
        let limiter = Arc::new(RateLimiter::new());
        let policy = Policy::new(Duration::from_secs(60), 3, 100).unwrap();
        let app = app(limiter, policy);

        let response = app.oneshot(request("1.1.1.1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(report::LIMIT_HEADER).unwrap(), "3");
        assert_eq!(
            response.headers().get(report::REMAINING_HEADER).unwrap(),
            "2"
        );
        assert!(response.headers().get(report::RESET_HEADER).is_some());
        assert!(response.headers().get(report::RETRY_AFTER_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_denied_request_short_circuits_with_429() {
        let limiter = Arc::new(RateLimiter::new());
        let policy = Policy::new(Duration::from_secs(60), 1, 100).unwrap();
        let app = app(limiter, policy);

        let first = app.clone().oneshot(request("1.1.1.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(request("1.1.1.1")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers().get(report::LIMIT_HEADER).unwrap(), "1");
        assert!(second.headers().get(report::RETRY_AFTER_HEADER).is_some());

        let bytes = axum::body::to_bytes(second.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Too many requests");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Rate limit exceeded. Please try again after "));
    }

    #[tokio::test]
    async fn test_clients_do_not_share_quota() {
        let limiter = Arc::new(RateLimiter::new());
        let policy = Policy::new(Duration::from_secs(60), 1, 100).unwrap();
        let app = app(limiter, policy);

        let first = app.clone().oneshot(request("1.1.1.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let denied = app.clone().oneshot(request("1.1.1.1")).await.unwrap();
        assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app.oneshot(request("2.2.2.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_named_endpoint_shares_one_bucket() {
        let limiter = Arc::new(RateLimiter::new());
        let policy = Policy::new(Duration::from_secs(60), 1, 100).unwrap();
        let app = Router::new()
            .route("/a", get(|| async { "a" }))
            .route("/b", get(|| async { "b" }))
            .layer(middleware::from_fn_with_state(
                RateLimit::new(limiter, policy).for_endpoint("shared"),
                rate_limit,
            ));

        let make = |path: &str| {
            HttpRequest::builder()
                .uri(path)
                .header("x-forwarded-for", "1.1.1.1")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(make("/a")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // Both routes count against "shared", so /b is already exhausted.
        let second = app.oneshot(make("/b")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_auth_preset_denies_sixth_login() {
        let limiter = Arc::new(RateLimiter::new());
        let app = app(limiter, Policy::AUTH);

        for _ in 0..5 {
            let response = app.clone().oneshot(request("1.1.1.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let sixth = app.oneshot(request("1.1.1.1")).await.unwrap();
        assert_eq!(sixth.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
