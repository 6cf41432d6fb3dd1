//! Network-facing configuration for the station server.

use std::time::Duration;

/// Bind address, port, and timing knobs for the connection front-end.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the listening socket.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Upper bound on how long the accept loop waits for a new
    /// connection before re-checking the `running` flag.
    pub select_timeout: Duration,
    /// How long the response worker sleeps when the queue is empty.
    pub idle_backoff: Duration,
    /// Idle threshold after which a producer's tracker and record expire.
    pub max_idle_seconds: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4567,
            select_timeout: Duration::from_millis(1000),
            idle_backoff: Duration::from_millis(1),
            max_idle_seconds: crate::producer::DEFAULT_MAX_IDLE_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 4567);
        assert_eq!(config.select_timeout, Duration::from_millis(1000));
        assert_eq!(config.idle_backoff, Duration::from_millis(1));
        assert_eq!(config.max_idle_seconds, 30);
    }
}
