//! HTTP integration: middleware adapter and decision reporting.

pub mod middleware;
pub mod report;

pub use middleware::{rate_limit, AuthenticatedSubject, RateLimit};
