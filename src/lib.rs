//! Floodgate - In-Process Sliding-Window Rate Limiting
//!
//! This crate implements a per-endpoint, per-client sliding-window request
//! limiter with bounded memory, header-based client feedback, and named
//! policy presets, exposed as an axum middleware. State is in-memory and
//! process-scoped: horizontally scaled deployments enforce per-instance
//! quotas, and callers with no identifying signal share one `"unknown"`
//! quota bucket.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
