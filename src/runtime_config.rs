//! # Runtime Configuration Module
//!
//! Environment-sourced startup configuration for the gateway.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `OPENAPI_SPEC_PATH` | `openapi.json` | Specification file (JSON, or YAML by extension) |
//! | `UPSTREAM_SERVER_URL` | `https://example.com/api` | Base URL requests are forwarded to |
//! | `GATEWAY_BIND_ADDR` | `0.0.0.0:8000` | Listener address |
//! | `GATEWAY_UPSTREAM_TIMEOUT_SECS` | `30` | Upstream call timeout |
//! | `GATEWAY_MAX_BODY_BYTES` | `2097152` | Larger request bodies get 413 |
//!
//! Unset or empty variables use the default. A value that is set but does
//! not parse is a [`ConfigError`]. Sizes accept decimal or `0x` hexadecimal.
//!
//! Logging is configured separately, see [`crate::logging::LogConfig`].
//!
//! ```rust
//! use oasgate::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_lookup(|_| None).unwrap();
//! assert_eq!(config.spec_path.to_str(), Some("openapi.json"));
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SPEC_PATH: &str = "openapi.json";
pub const DEFAULT_UPSTREAM_URL: &str = "https://example.com/api";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid upstream URL '{value}': {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var}: expected a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub spec_path: PathBuf,
    /// Validated upstream base URL without trailing `/`
    pub upstream_url: String,
    pub bind_addr: String,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            spec_path: PathBuf::from(DEFAULT_SPEC_PATH),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// A set variable whose value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// A value that does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let spec_path = get("OPENAPI_SPEC_PATH").map_or(defaults.spec_path, PathBuf::from);
        let upstream_url = match get("UPSTREAM_SERVER_URL") {
            Some(raw) => normalize_upstream_url("UPSTREAM_SERVER_URL", &raw)?,
            None => defaults.upstream_url,
        };
        let bind_addr = get("GATEWAY_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let upstream_timeout = match get("GATEWAY_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("GATEWAY_UPSTREAM_TIMEOUT_SECS", &raw)?),
            None => defaults.upstream_timeout,
        };
        let max_body_bytes = match get("GATEWAY_MAX_BODY_BYTES") {
            Some(raw) => {
                let n = parse_number("GATEWAY_MAX_BODY_BYTES", &raw)?;
                usize::try_from(n).map_err(|_| ConfigError::InvalidNumber {
                    var: "GATEWAY_MAX_BODY_BYTES",
                    value: raw,
                })?
            }
            None => defaults.max_body_bytes,
        };

        Ok(Self {
            spec_path,
            upstream_url,
            bind_addr,
            upstream_timeout,
            max_body_bytes,
        })
    }
}

/// Check that `raw` is an absolute http(s) URL and drop a trailing `/`.
///
/// # Errors
///
/// [`ConfigError::InvalidUrl`] naming `var`.
pub fn normalize_upstream_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    let invalid = |reason: String| ConfigError::InvalidUrl {
        var,
        value: raw.to_string(),
        reason,
    };
    let url = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_number(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    };
    parsed
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        })
}
