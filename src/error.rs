//! Error types for the Floodgate crate.

use thiserror::Error;

/// Main error type for Floodgate operations.
///
/// Rate limit evaluation itself is infallible: a request is either admitted
/// or denied, and both outcomes are expressed through
/// [`crate::ratelimit::Decision`]. Errors only arise when constructing
/// policies or loading configuration.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// A policy with a non-positive limit, interval, or tracking capacity
    #[error("Invalid policy: {0}")]
    Policy(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
