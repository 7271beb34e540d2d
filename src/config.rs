//! Configuration management for the Floodgate demo service.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{FloodgateError, Result};
use crate::ratelimit::Policy;

/// Main configuration for the Floodgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limit preset overrides
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().expect("static address")
}

/// Optional overrides for the named rate limit presets.
///
/// A preset with no override keeps its built-in numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Override for the authentication preset
    pub auth: Option<LimitOverride>,
    /// Override for the general API preset
    pub api: Option<LimitOverride>,
    /// Override for the public preset
    pub public: Option<LimitOverride>,
}

/// One preset override; all fields validated through [`Policy::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOverride {
    /// Maximum requests admitted per window
    pub max_requests: u32,
    /// Window length in seconds
    pub interval_secs: u64,
    /// Distinct client keys tracked before LRU eviction
    pub tracked_clients: usize,
}

impl LimitOverride {
    fn to_policy(&self) -> Result<Policy> {
        Policy::new(
            Duration::from_secs(self.interval_secs),
            self.max_requests,
            self.tracked_clients,
        )
    }
}

impl FloodgateConfig {
    /// Load configuration from a YAML file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|e| FloodgateError::Config(e.to_string()))
    }

    /// The effective authentication policy.
    pub fn auth_policy(&self) -> Result<Policy> {
        resolve_policy(&self.limits.auth, Policy::AUTH)
    }

    /// The effective general API policy.
    pub fn api_policy(&self) -> Result<Policy> {
        resolve_policy(&self.limits.api, Policy::API)
    }

    /// The effective public policy.
    pub fn public_policy(&self) -> Result<Policy> {
        resolve_policy(&self.limits.public, Policy::PUBLIC)
    }
}

fn resolve_policy(limit_override: &Option<LimitOverride>, preset: Policy) -> Result<Policy> {
    match limit_override {
        Some(limit_override) => limit_override.to_policy(),
        None => Ok(preset),
    }
}
