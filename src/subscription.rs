use crate::connection_state::ConnectionStatus;
use crate::error::{DmxError, Result};
use tokio::sync::broadcast;

/// Receiver for connection status changes
pub struct StatusReceiver {
    rx: broadcast::Receiver<ConnectionStatus>,
}

impl StatusReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<ConnectionStatus>) -> Self {
        Self { rx }
    }

    /// Receive the next status change
    ///
    /// A slow receiver that fell behind skips ahead to the oldest status still buffered.
    /// Returns `ConnectionClosed` once the connection has been dropped.
    pub async fn recv(&mut self) -> Result<ConnectionStatus> {
        loop {
            match self.rx.recv().await {
                Ok(status) => return Ok(status),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("Status receiver lagged by {} updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(DmxError::ConnectionClosed),
            }
        }
    }

    /// Try to receive a status change without blocking
    ///
    /// Returns `None` if no change is pending.
    pub fn try_recv(&mut self) -> Result<Option<ConnectionStatus>> {
        loop {
            match self.rx.try_recv() {
                Ok(status) => return Ok(Some(status)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(broadcast::error::TryRecvError::Closed) => return Err(DmxError::ConnectionClosed),
            }
        }
    }
}
