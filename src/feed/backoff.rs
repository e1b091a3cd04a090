/// Connection state and reconnect policy for the alerts socket.
///
/// The default policy never reconnects: once the socket closes or errors,
/// the feed stays silent until the session is restarted. With
/// `feed.reconnect = true` the feed cycles
/// `Connecting → Connected → Retrying → Connecting …` with exponential
/// backoff.
///
/// # Defaults
///
/// | Parameter       | Default | Description                            |
/// |-----------------|---------|----------------------------------------|
/// | Initial delay   | 1 s     | Delay before the first retry           |
/// | Max delay       | 30 s    | Cap for the doubled delay              |
/// | Max attempts    | 0       | Consecutive failures before giving up (0 = unlimited) |
use std::fmt;
use std::time::Duration;

use crate::config::schema::FeedConfig;

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Observable state of the alerts socket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedState {
    /// Not connected and not going to try again.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Receiving frames.
    Connected,
    /// Waiting `delay` before reconnect attempt number `attempt`.
    Retrying { attempt: u32, delay: Duration },
}

impl fmt::Display for FeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Retrying { attempt, delay } => {
                write!(f, "retry #{attempt} in {:.1}s", delay.as_secs_f64())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Decides whether, and after how long, to reconnect.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    enabled: bool,
    initial: Duration,
    max: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    pub fn never() -> Self {
        Self {
            enabled: false,
            initial: Duration::ZERO,
            max: Duration::ZERO,
            max_attempts: 0,
            attempt: 0,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            enabled: config.reconnect,
            initial: Duration::from_millis(config.initial_backoff_ms.max(1)),
            max: Duration::from_millis(config.max_backoff_ms.max(config.initial_backoff_ms)),
            max_attempts: config.max_attempts,
            attempt: 0,
        }
    }

    /// Call after a successful handshake. Resets the backoff.
    pub fn on_connected(&mut self) {
        self.attempt = 0;
    }

    /// Register a drop or failed attempt and return the delay before the
    /// next one, or `None` to give up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        if self.max_attempts > 0 && self.attempt >= self.max_attempts {
            return None;
        }

        let exponent = self.attempt.min(16);
        self.attempt += 1;
        let delay = self.initial.saturating_mul(1u32 << exponent);
        Some(delay.min(self.max))
    }

    /// Number of retries scheduled since the last successful connect.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(reconnect: bool, max_attempts: u32) -> FeedConfig {
        FeedConfig {
            reconnect,
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
            max_attempts,
            ..FeedConfig::default()
        }
    }

    #[test]
    fn disabled_policy_never_retries() {
        let mut policy = ReconnectPolicy::from_config(&config(false, 0));
        assert_eq!(policy.next_delay(), None);
        assert_eq!(ReconnectPolicy::never().next_delay(), None);
    }

    #[test]
    fn delay_doubles_up_to_cap() {
        let mut policy = ReconnectPolicy::from_config(&config(true, 0));
        let delays: Vec<u64> = (0..5)
            .map(|_| policy.next_delay().unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
        assert_eq!(policy.attempt(), 5);
    }

    #[test]
    fn connect_resets_backoff() {
        let mut policy = ReconnectPolicy::from_config(&config(true, 0));
        policy.next_delay();
        policy.next_delay();
        policy.on_connected();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut policy = ReconnectPolicy::from_config(&config(true, 2));
        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_some());
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn unlimited_attempts_do_not_overflow() {
        let mut policy = ReconnectPolicy::from_config(&config(true, 0));
        for _ in 0..100 {
            assert_eq!(
                policy.next_delay().map(|d| d <= Duration::from_millis(500)),
                Some(true)
            );
        }
    }

    #[test]
    fn state_display() {
        assert_eq!(FeedState::Connected.to_string(), "connected");
        assert_eq!(
            FeedState::Retrying {
                attempt: 2,
                delay: Duration::from_millis(1500)
            }
            .to_string(),
            "retry #2 in 1.5s"
        );
    }
}
