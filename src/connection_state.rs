use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Link state of a resilient DMX connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Point-in-time copy of a connection's health
///
/// Handed out by value; later transitions never alter a status already returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub last_connected_at: Option<SystemTime>,
    pub last_disconnected_at: Option<SystemTime>,
    /// Consecutive reconnect attempts since the last successful connect
    pub reconnect_attempts: u32,
    pub last_error: Option<String>,
}

impl ConnectionStatus {
    /// Status for a connection that starts out in `state`
    pub fn initial(state: ConnectionState) -> Self {
        Self {
            state,
            last_connected_at: (state == ConnectionState::Connected).then(SystemTime::now),
            last_disconnected_at: None,
            reconnect_attempts: 0,
            last_error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status() {
        let connected = ConnectionStatus::initial(ConnectionState::Connected);
        assert!(connected.is_connected());
        assert!(connected.last_connected_at.is_some());

        let down = ConnectionStatus::initial(ConnectionState::Disconnected);
        assert!(!down.is_connected());
        assert_eq!(down.last_connected_at, None);
        assert_eq!(down.reconnect_attempts, 0);
        assert_eq!(down.last_error, None);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionState::Reconnecting).unwrap();
        assert_eq!(json, "\"reconnecting\"");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }
}
