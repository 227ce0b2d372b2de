//! Client configuration.

use std::time::Duration;

use posesync_tick::TickConfig;
use serde::{Deserialize, Serialize};

/// Tunables for a [`Client`](crate::Client).
///
/// Deserializable so a host application can keep it in its own settings
/// file; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Pose broadcasts per second.
    pub tick_rate: u32,

    /// Upper bound on inbound messages handled per `update()` call.
    pub max_messages: usize,

    /// How long `disconnect()` waits for the sync task before aborting it.
    pub join_timeout_ms: u64,

    /// Give up on a pending connect after this long. `None` waits for the
    /// transport to report success or failure on its own.
    pub connect_timeout_ms: Option<u64>,

    /// Random delay (µs) before the first broadcast tick.
    pub tick_jitter_us: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tick_rate: TickConfig::DEFAULT_TICK_RATE_HZ,
            max_messages: 100,
            join_timeout_ms: 1_000,
            connect_timeout_ms: None,
            tick_jitter_us: 0,
        }
    }
}

impl ClientConfig {
    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// - `tick_rate` clamped to `1..=128`
    /// - `max_messages` and `join_timeout_ms` at least 1
    pub fn validated(mut self) -> Self {
        self.tick_rate = self.tick_rate.clamp(1, TickConfig::MAX_TICK_RATE_HZ);
        self.max_messages = self.max_messages.max(1);
        self.join_timeout_ms = self.join_timeout_ms.max(1);
        self
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Ticker settings for the sync task.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            tick_rate_hz: self.tick_rate,
            initial_jitter_us: self.tick_jitter_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.tick_rate, 30);
        assert_eq!(cfg.max_messages, 100);
        assert_eq!(cfg.join_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.connect_timeout(), None);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{ "tick_rate": 60, "connect_timeout_ms": 2500 }"#)
                .unwrap();
        assert_eq!(cfg.tick_rate, 60);
        assert_eq!(cfg.connect_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(cfg.max_messages, 100);
    }

    #[test]
    fn test_validated_clamps() {
        let cfg = ClientConfig {
            tick_rate: 0,
            max_messages: 0,
            join_timeout_ms: 0,
            ..ClientConfig::default()
        }
        .validated();
        assert_eq!(cfg.tick_rate, 1);
        assert_eq!(cfg.max_messages, 1);
        assert_eq!(cfg.join_timeout_ms, 1);

        let cfg = ClientConfig {
            tick_rate: 500,
            ..ClientConfig::default()
        }
        .validated();
        assert_eq!(cfg.tick_rate, 128);
    }
}
