//! Server configuration loaded from the environment.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PORT` | `3001` | TCP port to listen on |
//! | `BIND_ADDR` | `0.0.0.0` | Interface to bind |
//! | `CLIENT_URL` | unset | Allowed CORS origin; any origin when unset |
//! | `RELAY_CHANNEL_CAPACITY` | `256` | Per-connection outbound queue depth |
//!
//! A malformed value is a startup error, not a silent fallback.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use axum::http::HeaderValue;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_RELAY_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Origin allowed by the CORS layer. `None` allows any origin.
    pub client_origin: Option<HeaderValue>,
    /// Bound of each connection's relay queue. Always at least 1.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            port: DEFAULT_PORT,
            client_origin: None,
            channel_capacity: DEFAULT_RELAY_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Load from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a key is present but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = env_parse(get("PORT"), "PORT", DEFAULT_PORT)?;
        let bind_addr = env_parse(get("BIND_ADDR"), "BIND_ADDR", DEFAULT_BIND_ADDR)?;
        let channel_capacity =
            env_parse(get("RELAY_CHANNEL_CAPACITY"), "RELAY_CHANNEL_CAPACITY", DEFAULT_RELAY_CHANNEL_CAPACITY)?;
        if channel_capacity == 0 {
            return Err(ConfigError::Invalid { key: "RELAY_CHANNEL_CAPACITY", value: "0".into() });
        }

        let client_origin = match get("CLIENT_URL") {
            Some(url) => {
                let origin = url.trim().trim_end_matches('/');
                let value = HeaderValue::from_str(origin)
                    .map_err(|_| ConfigError::Invalid { key: "CLIENT_URL", value: url.clone() })?;
                Some(value)
            }
            None => None,
        };

        Ok(Self { bind_addr, port, client_origin, channel_capacity })
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn env_parse<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
