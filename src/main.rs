use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::Utc;
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use floodgate::config::FloodgateConfig;
use floodgate::http::{rate_limit, RateLimit};
use floodgate::ratelimit::{resolve_client_key, RateLimiter};

/// Demo HTTP service showing the Floodgate middleware wiring.
#[derive(Parser, Debug)]
#[command(name = "floodgate", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configured listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Clone)]
struct AppState {
    limiter: Arc<RateLimiter>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    info!("Starting Floodgate demo service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => FloodgateConfig::from_file(path)?,
        None => FloodgateConfig::default(),
    };
    if let Some(port) = args.port {
        config.server.http_addr.set_port(port);
    }
    info!(http_addr = %config.server.http_addr, "Configuration loaded");

    let limiter = Arc::new(RateLimiter::new());
    let state = AppState {
        limiter: Arc::clone(&limiter),
    };

    let auth_routes = Router::new()
        .route("/login", post(login_handler))
        .layer(middleware::from_fn_with_state(
            RateLimit::new(Arc::clone(&limiter), config.auth_policy()?),
            rate_limit,
        ));

    let api_routes = Router::new()
        .route("/api/status", get(status_handler))
        .layer(middleware::from_fn_with_state(
            RateLimit::new(Arc::clone(&limiter), config.api_policy()?),
            rate_limit,
        ));

    let public_routes = Router::new().route("/healthz", get(health_handler)).layer(
        middleware::from_fn_with_state(
            RateLimit::new(Arc::clone(&limiter), config.public_policy()?),
            rate_limit,
        ),
    );

    let app = auth_routes
        .merge(api_routes)
        .merge(public_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.server.http_addr).await?;
    info!(addr = %config.server.http_addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Floodgate demo service stopped");
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn status_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(serde::Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// Demo login route. A successful login clears the client's accumulated
/// window on `/login`, so earlier failed attempts no longer count against
/// the auth quota.
async fn login_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Json<serde_json::Value> {
    // Stand-in credential check for the demo.
    let authenticated = !body.username.is_empty() && body.password == "demo";

    if authenticated {
        let client_key = resolve_client_key(&headers, Some(peer), None);
        state.limiter.clear("/login", &client_key);
        Json(serde_json::json!({ "authenticated": true, "user": body.username }))
    } else {
        Json(serde_json::json!({ "authenticated": false }))
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
