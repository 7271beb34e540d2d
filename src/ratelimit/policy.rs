//! Rate limit policies and named presets.

use std::time::Duration;

use crate::error::{FloodgateError, Result};

/// An immutable rate limit policy.
///
/// A policy bounds one client's requests to `max_requests` per sliding
/// `interval`, and bounds the limiter's memory by retaining at most
/// `tracked_clients` distinct client keys per endpoint (least-recently-used
/// keys are evicted beyond that).
///
/// Policies are supplied per evaluation; the named presets ([`Policy::AUTH`],
/// [`Policy::API`], [`Policy::PUBLIC`]) are convenience constants around the
/// same evaluation path. Ad-hoc policies should go through [`Policy::new`],
/// which validates the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Length of the sliding window
    pub interval: Duration,
    /// Maximum requests admitted per window
    pub max_requests: u32,
    /// Maximum distinct client keys tracked per endpoint before LRU eviction
    pub tracked_clients: usize,
}

impl Policy {
    /// Preset for authentication endpoints: 5 requests per 15 minutes.
    pub const AUTH: Policy = Policy {
        interval: Duration::from_secs(15 * 60),
        max_requests: 5,
        tracked_clients: 100,
    };

    /// Preset for general API endpoints: 100 requests per minute.
    pub const API: Policy = Policy {
        interval: Duration::from_secs(60),
        max_requests: 100,
        tracked_clients: 500,
    };

    /// Preset for public, unauthenticated endpoints: 200 requests per minute.
    pub const PUBLIC: Policy = Policy {
        interval: Duration::from_secs(60),
        max_requests: 200,
        tracked_clients: 1000,
    };

    /// Create a validated ad-hoc policy.
    ///
    /// Rejects zero-length intervals, zero limits, and zero tracking
    /// capacities at construction time, so the per-request evaluation path
    /// never has to deal with a degenerate policy.
    pub fn new(interval: Duration, max_requests: u32, tracked_clients: usize) -> Result<Self> {
        if interval.is_zero() {
            return Err(FloodgateError::Policy(
                "interval must be greater than zero".to_string(),
            ));
        }
        if max_requests == 0 {
            return Err(FloodgateError::Policy(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        if tracked_clients == 0 {
            return Err(FloodgateError::Policy(
                "tracked_clients must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            interval,
            max_requests,
            tracked_clients,
        })
    }

    /// The window length in integer milliseconds.
    pub(crate) fn interval_ms(&self) -> i64 {
        self.interval.as_millis() as i64
    }
}
