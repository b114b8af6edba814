//! HTTP server configuration.
//!
//! Resolved once at startup from raw environment values; see [`ServerConfig::from_env_values`].

use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8084";
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
#[error("{name} is invalid: '{value}' ({reason})")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    addr: SocketAddr,
    max_body_bytes: usize,
    request_timeout: Duration,
}

impl ServerConfig {
    pub fn new(addr: SocketAddr, max_body_bytes: usize, request_timeout: Duration) -> Self {
        Self {
            addr,
            max_body_bytes,
            request_timeout,
        }
    }

    /// Build from the raw values of `GPUPDATE_ADDR`, `MAX_BODY_BYTES` and
    /// `REQUEST_TIMEOUT_SECS`. Unset or blank values take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is set but cannot be parsed, or if a limit is zero.
    pub fn from_env_values(
        addr: Option<String>,
        max_body_bytes: Option<String>,
        request_timeout_secs: Option<String>,
    ) -> Result<Self, ConfigError> {
        let addr: SocketAddr = parse_or("GPUPDATE_ADDR", addr, || {
            DEFAULT_ADDR
                .parse()
                .map_err(|e: std::net::AddrParseError| e.to_string())
        })?;
        let max_body_bytes: usize = parse_or("MAX_BODY_BYTES", max_body_bytes, || {
            Ok(DEFAULT_MAX_BODY_BYTES)
        })?;
        let timeout_secs: u64 = parse_or("REQUEST_TIMEOUT_SECS", request_timeout_secs, || {
            Ok(DEFAULT_REQUEST_TIMEOUT_SECS)
        })?;

        for (name, value) in [
            ("MAX_BODY_BYTES", max_body_bytes as u64),
            ("REQUEST_TIMEOUT_SECS", timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError {
                    name,
                    value: "0".into(),
                    reason: "must be greater than zero".into(),
                });
            }
        }

        Ok(Self::new(
            addr,
            max_body_bytes,
            Duration::from_secs(timeout_secs),
        ))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(
            SocketAddr::from(([0, 0, 0, 0], 8084)),
            DEFAULT_MAX_BODY_BYTES,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

fn parse_or<T, F>(name: &'static str, value: Option<String>, default: F) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: FnOnce() -> Result<T, String>,
{
    match value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError {
            name,
            reason: e.to_string(),
            value: raw,
        }),
        None => default().map_err(|reason| ConfigError {
            name,
            value: String::new(),
            reason,
        }),
    }
}
