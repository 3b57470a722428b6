use crate::config::ConnectionOptions;
use crate::connection::ResilientConnection;
use crate::connection_state::ConnectionStatus;
use crate::subscription::StatusReceiver;
use crate::transport::TransportFactory;
use crate::types::ChannelMap;
use crate::universe::UniverseManager;
use std::sync::{Arc, OnceLock, Weak};

/// A DMX universe wired to a resilient connection
///
/// The connection replays the manager's active channels after every reconnect. The
/// manager writes through the connection's universe proxy.
///
/// # Example
///
/// ```no_run
/// use dmxr::{ConnectionOptions, DmxOutput, NullTransportFactory};
///
/// #[tokio::main]
/// async fn main() {
///     let output = DmxOutput::start(NullTransportFactory::new(), ConnectionOptions::new()).await;
///
///     output.manager().apply_fixture_update("front-par", [(1u16, 255u8), (2, 128), (3, 64)]);
///     println!("active channels: {}", output.manager().active_channel_count());
///
///     output.close().await;
/// }
/// ```
pub struct DmxOutput {
    connection: ResilientConnection,
    manager: Arc<UniverseManager>,
}

impl DmxOutput {
    /// Connect through `factory` and create the universe on top of the connection
    pub async fn start(factory: impl TransportFactory + 'static, options: ConnectionOptions) -> Self {
        let slot: Arc<OnceLock<Weak<UniverseManager>>> = Arc::new(OnceLock::new());

        let source = Arc::clone(&slot);
        let snapshot = move || {
            source
                .get()
                .and_then(Weak::upgrade)
                .map(|manager| manager.full_snapshot())
                .unwrap_or_else(ChannelMap::new)
        };

        let connection = ResilientConnection::connect(factory, snapshot, options).await;
        let manager = Arc::new(UniverseManager::new(connection.universe()));
        let _ = slot.set(Arc::downgrade(&manager));

        Self { connection, manager }
    }

    /// The universe's channel state
    pub fn manager(&self) -> Arc<UniverseManager> {
        Arc::clone(&self.manager)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn subscribe_status(&self) -> StatusReceiver {
        self.connection.subscribe_status()
    }

    pub async fn close(&self) {
        self.connection.close().await;
    }
}
