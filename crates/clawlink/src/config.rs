//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`ClawClient`](crate::ClawClient).
///
/// Every field has a default, so a config file only needs the values it
/// wants to change:
///
/// ```rust
/// use clawlink::ClientConfig;
///
/// let config = ClientConfig {
///     max_reconnect_attempts: 10,
///     ..ClientConfig::new("wss://arcade.example/ws")
/// };
/// assert_eq!(config.heartbeat_interval.as_secs(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the machine server, supplied by the account system.
    pub endpoint: String,

    /// Period between heartbeat frames while `Ready`.
    pub heartbeat_interval: Duration,

    /// How long to wait for the server's login verdict before treating the
    /// credentials as rejected.
    pub login_timeout: Duration,

    /// Fixed wait before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Consecutive failed reconnect attempts allowed before giving up with
    /// `ConnectionLost`. 0 disables reconnection.
    pub max_reconnect_attempts: u32,

    /// Upper bound of random extra delay added to `reconnect_delay`, so a
    /// fleet of clients dropped by the same outage does not retry in
    /// lockstep. Zero keeps the delay exactly fixed.
    pub reconnect_jitter: Duration,

    /// How long `disconnect()` waits for the background task before
    /// aborting it.
    pub shutdown_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8080/ws".to_string(),
            heartbeat_interval: Duration::from_secs(30),
            login_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_attempts: 5,
            reconnect_jitter: Duration::ZERO,
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Default settings pointed at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically when a client is built. Rules:
    /// - a zero `heartbeat_interval` falls back to the default (a zero
    ///   period would make `tokio::time::interval` panic).
    /// - a zero `login_timeout` falls back to the default.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.heartbeat_interval.is_zero() {
            tracing::warn!(
                default = ?defaults.heartbeat_interval,
                "heartbeat_interval is zero, using default"
            );
            self.heartbeat_interval = defaults.heartbeat_interval;
        }
        if self.login_timeout.is_zero() {
            tracing::warn!(
                default = ?defaults.login_timeout,
                "login_timeout is zero, using default"
            );
            self.login_timeout = defaults.login_timeout;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_jitter, Duration::ZERO);
    }

    #[test]
    fn test_validated_replaces_zero_durations() {
        let config = ClientConfig {
            heartbeat_interval: Duration::ZERO,
            login_timeout: Duration::ZERO,
            ..ClientConfig::default()
        }
        .validated();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.login_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validated_keeps_sane_values() {
        let config = ClientConfig {
            heartbeat_interval: Duration::from_millis(250),
            ..ClientConfig::new("ws://machine")
        };
        assert_eq!(config.clone().validated(), config);
    }

    #[test]
    fn test_partial_json_uses_defaults_for_missing_fields() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"endpoint":"wss://arcade/ws","max_reconnect_attempts":2}"#)
                .unwrap();
        assert_eq!(config.endpoint, "wss://arcade/ws");
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.login_timeout, Duration::from_secs(10));
    }
}
