//! Transport configuration.
//!
//! Values come from `TransportConfig::default()` or, for the process-wide
//! default transport, from the environment:
//!
//! - `APIREQUEST_TIMEOUT_SECS`: whole-request timeout in seconds, `0` disables it.
//! - `APIREQUEST_MAX_IDLE_CONNECTIONS`: size of the idle connection pool.
//! - `APIREQUEST_MAX_BODY_BYTES`: largest response body read into memory, `0`
//!   removes the limit.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const TIMEOUT_ENV: &str = "APIREQUEST_TIMEOUT_SECS";
pub const MAX_IDLE_ENV: &str = "APIREQUEST_MAX_IDLE_CONNECTIONS";
pub const MAX_BODY_ENV: &str = "APIREQUEST_MAX_BODY_BYTES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub max_idle_connections: usize,
    pub max_idle_connections_per_host: usize,
    /// Largest response body, in bytes, a transport reads before failing.
    /// Defaults to `u64::MAX`, which is no limit.
    pub max_body_size: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            max_idle_connections: 100,
            max_idle_connections_per_host: 10,
            max_body_size: u64::MAX,
        }
    }
}

impl TransportConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(secs) = parse_var::<u64>(TIMEOUT_ENV, lookup(TIMEOUT_ENV)) {
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(max) = parse_var::<usize>(MAX_IDLE_ENV, lookup(MAX_IDLE_ENV)) {
            config.max_idle_connections = max;
        }
        if let Some(bytes) = parse_var::<u64>(MAX_BODY_ENV, lookup(MAX_BODY_ENV)) {
            config.max_body_size = if bytes == 0 { u64::MAX } else { bytes };
        }
        config
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_body_size(mut self, bytes: u64) -> Self {
        self.max_body_size = bytes;
        self
    }
}

fn parse_var<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}
