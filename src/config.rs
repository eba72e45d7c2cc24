//! Environment-driven configuration.
//!
//! Values are read once at startup (after `.env` is loaded). Anything that
//! fails to parse falls back to its default with a warning.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        _ => default,
    }
}

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Snapshot backlog per document before slow subscribers start lagging
    pub broadcast_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 7331,
            broadcast_capacity: 64,
        }
    }
}

impl RelayConfig {
    /// Load from ICEBREAKER_HOST, ICEBREAKER_PORT and
    /// ICEBREAKER_BROADCAST_CAPACITY
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or("ICEBREAKER_HOST", defaults.host),
            port: env_or("ICEBREAKER_PORT", defaults.port),
            broadcast_capacity: env_or(
                "ICEBREAKER_BROADCAST_CAPACITY",
                defaults.broadcast_capacity,
            )
            .max(1),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Write retry policy used by [`crate::sync::retry::commit_with_fallback`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts per write scope, at least 1
    pub attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff`
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryConfig {
    /// Load from ICEBREAKER_WRITE_ATTEMPTS and ICEBREAKER_RETRY_BACKOFF_MS
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            attempts: env_or("ICEBREAKER_WRITE_ATTEMPTS", defaults.attempts).max(1),
            backoff: Duration::from_millis(env_or(
                "ICEBREAKER_RETRY_BACKOFF_MS",
                defaults.backoff.as_millis() as u64,
            )),
        }
    }

    /// No waiting between attempts
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff: Duration::ZERO,
        }
    }
}
