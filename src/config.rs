use crate::connection_state::ConnectionStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked with a fresh status after every connection state change
pub type StateChangeCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Exponential backoff settings for reconnect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Delay before the first retry
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Ceiling for any single retry delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

fn default_min_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> u32 {
    2
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retrying after `attempt` consecutive failures
    ///
    /// `min * multiplier^attempt`, capped at `max`: 1s, 2s, 4s, 8s ... 30s with defaults.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt);
        let delay = self.min_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Options for [`ResilientConnection::connect`](crate::ResilientConnection::connect)
#[derive(Clone, Default)]
pub struct ConnectionOptions {
    pub reconnect: ReconnectPolicy,
    pub on_state_change: Option<StateChangeCallback>,
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom backoff policy
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Register a callback for connection state changes
    pub fn on_state_change(mut self, callback: impl Fn(ConnectionStatus) + Send + Sync + 'static) -> Self {
        self.on_state_change = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("reconnect", &self.reconnect)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_sequence() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> = (0..7).map(|n| policy.delay_for(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(200), Duration::from_secs(30));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_policy_fields_fall_back_to_defaults() {
        let policy: ReconnectPolicy = serde_json::from_str(r#"{"maxDelayMs":5000}"#).unwrap();
        assert_eq!(policy.min_delay_ms, 1_000);
        assert_eq!(policy.max_delay_ms, 5_000);
        assert_eq!(policy.multiplier, 2);
        assert_eq!(policy.delay_for(3), Duration::from_secs(5));
    }
}
