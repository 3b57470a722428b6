use crate::config::{ConnectionOptions, ReconnectPolicy, StateChangeCallback};
use crate::connection_state::{ConnectionState, ConnectionStatus};
use crate::error::{DmxError, Result};
use crate::subscription::StatusReceiver;
use crate::transport::{ChannelSnapshot, DisconnectSignal, DmxUniverse, Transport, TransportFactory};
use crate::types::ChannelMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};

const STATUS_CHANNEL_CAPACITY: usize = 64;
const SUPERVISOR_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Live link state, guarded by a single mutex
struct Link {
    transport: Option<Box<dyn Transport>>,
    status: ConnectionStatus,
    closed: bool,
    /// Set after the first dropped write of a disconnect episode
    drop_logged: bool,
}

impl Link {
    fn transition(&mut self, state: ConnectionState, changes: &mut Vec<ConnectionStatus>) {
        if self.status.state == state {
            return;
        }
        tracing::info!("DMX connection: {} -> {}", self.status.state, state);

        self.status.state = state;
        match state {
            ConnectionState::Connected => {
                self.status.last_connected_at = Some(SystemTime::now());
                self.status.reconnect_attempts = 0;
                self.status.last_error = None;
            }
            ConnectionState::Disconnected => {
                self.status.last_disconnected_at = Some(SystemTime::now());
            }
            ConnectionState::Reconnecting => {}
        }
        changes.push(self.status.clone());
    }
}

/// State shared between the connection handle, its universe proxies and the supervisor task
struct Shared {
    link: Mutex<Link>,
    status_tx: broadcast::Sender<ConnectionStatus>,
    on_state_change: Option<StateChangeCallback>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver status changes; must be called without the link lock held
    fn publish(&self, changes: Vec<ConnectionStatus>) {
        for status in changes {
            let _ = self.status_tx.send(status.clone());
            if let Some(callback) = &self.on_state_change {
                callback(status);
            }
        }
    }

    /// Run a write against the current transport, or drop it while there is none
    fn write(&self, label: &str, op: impl FnOnce(&dyn Transport) -> Result<()>) -> Result<()> {
        let mut link = self.lock();
        if let Some(transport) = link.transport.as_deref() {
            return op(transport);
        }
        if !link.drop_logged {
            link.drop_logged = true;
            tracing::warn!("DMX {} dropped: no active connection", label);
        }
        Ok(())
    }
}

enum Event {
    Connected {
        transport: Box<dyn Transport>,
        replay: bool,
    },
    ConnectFailed(DmxError),
    Disconnected(DmxError),
}

enum Command {
    Close,
}

/// Owns the reconnect state machine
///
/// Every transition goes through [`Supervisor::handle`]. The pending retry lives in
/// `retry_at`, so there is never more than one outstanding timer.
struct Supervisor {
    shared: Arc<Shared>,
    factory: Arc<dyn TransportFactory>,
    snapshot: Arc<dyn ChannelSnapshot>,
    policy: ReconnectPolicy,
    commands: mpsc::UnboundedReceiver<Command>,
    disconnect: Option<DisconnectSignal>,
    retry_at: Option<Instant>,
}

impl Supervisor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.commands.recv() => break,
                reason = wait_for_disconnect(&mut self.disconnect) => {
                    self.handle(Event::Disconnected(reason));
                }
                _ = wait_for_retry(self.retry_at) => {
                    self.retry_at = None;
                    self.attempt_reconnect().await;
                }
            }
        }
        tracing::debug!("DMX connection supervisor stopped");
    }

    /// Apply one event to the link
    ///
    /// Returns a transport that arrived after close and still needs closing.
    fn handle(&mut self, event: Event) -> Option<Box<dyn Transport>> {
        let shared = Arc::clone(&self.shared);
        let mut changes = Vec::new();
        let orphan = {
            let mut link = shared.lock();
            if link.closed {
                return match event {
                    Event::Connected { transport, .. } => Some(transport),
                    _ => None,
                };
            }

            match event {
                Event::Connected { mut transport, replay } => {
                    self.disconnect = transport.subscribe_disconnect();
                    link.transition(ConnectionState::Connected, &mut changes);
                    if replay {
                        self.replay(transport.as_ref());
                    }
                    link.transport = Some(transport);
                }
                Event::ConnectFailed(err) => {
                    link.status.last_error = Some(err.to_string());
                    changes.push(link.status.clone());
                    self.schedule_retry(&mut link, &mut changes);
                }
                Event::Disconnected(err) => {
                    tracing::error!("DMX disconnect detected: {}", err);
                    self.disconnect = None;
                    link.transport = None;
                    link.drop_logged = false;
                    link.transition(ConnectionState::Disconnected, &mut changes);
                    self.schedule_retry(&mut link, &mut changes);
                }
            }
            None
        };
        shared.publish(changes);
        orphan
    }

    fn schedule_retry(&mut self, link: &mut Link, changes: &mut Vec<ConnectionStatus>) {
        if link.closed || self.retry_at.is_some() {
            return;
        }

        let attempt = link.status.reconnect_attempts;
        let delay = self.policy.delay_for(attempt);

        link.transition(ConnectionState::Reconnecting, changes);
        tracing::info!("Reconnect attempt {} in {}ms", attempt + 1, delay.as_millis());

        self.retry_at = Some(Instant::now() + delay);
    }

    async fn attempt_reconnect(&mut self) {
        let status = {
            let mut link = self.shared.lock();
            if link.closed {
                return;
            }
            link.status.reconnect_attempts += 1;
            link.status.clone()
        };
        self.shared.publish(vec![status]);

        let event = match self.factory.connect().await {
            Ok(transport) => Event::Connected {
                transport,
                replay: true,
            },
            Err(err) => {
                tracing::error!("Reconnect failed: {}", err);
                Event::ConnectFailed(err)
            }
        };

        if let Some(orphan) = self.handle(event) {
            if let Err(e) = orphan.close().await {
                tracing::warn!("Failed to close transport opened after shutdown: {}", e);
            }
        }
    }

    /// Resend every active channel so fixtures come back where they were
    ///
    /// Runs under the link lock, so no other write can reach the new transport first.
    /// The snapshot provider is called here and must not touch the connection.
    fn replay(&self, transport: &dyn Transport) {
        let snapshot = self.snapshot.full_snapshot();
        if snapshot.is_empty() {
            return;
        }
        match transport.send(&snapshot) {
            Ok(()) => tracing::info!("Replayed {} channels after reconnect", snapshot.len()),
            Err(e) => tracing::error!("Channel replay after reconnect failed: {}", e),
        }
    }
}

async fn wait_for_disconnect(signal: &mut Option<DisconnectSignal>) -> DmxError {
    let Some(rx) = signal.as_mut() else {
        return std::future::pending().await;
    };
    let fired = rx.await;
    *signal = None;
    match fired {
        Ok(reason) => reason,
        // Transport dropped its hook without reporting a disconnect
        Err(_) => std::future::pending().await,
    }
}

async fn wait_for_retry(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// DMX connection that survives transport disconnects
///
/// Writes go through [`ResilientUniverse`], which forwards to the live transport and
/// silently drops writes while the device is away. A background task reconnects with
/// exponential backoff and replays the active channels once the device is back.
///
/// # Example
///
/// ```no_run
/// use dmxr::{ChannelMap, ConnectionOptions, DmxUniverse, NullTransportFactory, ResilientConnection};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let connection = ResilientConnection::connect(
///         NullTransportFactory::new(),
///         ChannelMap::new,
///         ConnectionOptions::new(),
///     )
///     .await;
///
///     connection.universe().update(&ChannelMap::from([(1, 255)]))?;
///     println!("{:?}", connection.status());
///
///     connection.close().await;
///     Ok(())
/// }
/// ```
pub struct ResilientConnection {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl ResilientConnection {
    /// Open the first transport and start supervising it
    ///
    /// A failed first connect does not fail startup: the connection enters
    /// `reconnecting` and keeps retrying in the background.
    pub async fn connect(
        factory: impl TransportFactory + 'static,
        snapshot: impl ChannelSnapshot + 'static,
        options: ConnectionOptions,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            link: Mutex::new(Link {
                transport: None,
                status: ConnectionStatus::initial(ConnectionState::Disconnected),
                closed: false,
                drop_logged: false,
            }),
            status_tx,
            on_state_change: options.on_state_change,
        });

        let (command_tx, commands) = mpsc::unbounded_channel();
        let mut supervisor = Supervisor {
            shared: Arc::clone(&shared),
            factory: Arc::new(factory),
            snapshot: Arc::new(snapshot),
            policy: options.reconnect,
            commands,
            disconnect: None,
            retry_at: None,
        };

        let event = match supervisor.factory.connect().await {
            Ok(transport) => Event::Connected {
                transport,
                replay: false,
            },
            Err(err) => {
                tracing::error!("Initial DMX connection failed: {}", err);
                Event::ConnectFailed(err)
            }
        };
        supervisor.handle(event);

        let handle = tokio::spawn(supervisor.run());

        Self {
            shared,
            commands: command_tx,
            supervisor: Mutex::new(Some(handle)),
        }
    }

    /// Write interface that follows the live transport across reconnects
    pub fn universe(&self) -> ResilientUniverse {
        ResilientUniverse {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Snapshot of the current connection status
    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock().status.clone()
    }

    /// Subscribe to status changes
    ///
    /// Only changes after this call are delivered.
    pub fn subscribe_status(&self) -> StatusReceiver {
        StatusReceiver::new(self.shared.status_tx.subscribe())
    }

    /// Stop reconnecting and release the transport
    ///
    /// Safe to call more than once. Disconnects reported afterwards are ignored.
    pub async fn close(&self) {
        let transport = {
            let mut link = self.shared.lock();
            if link.closed {
                return;
            }
            link.closed = true;
            link.transport.take()
        };
        let _ = self.commands.send(Command::Close);

        if let Some(transport) = transport {
            if let Err(e) = transport.close().await {
                tracing::warn!("Error closing DMX transport: {}", e);
            }
        }

        let handle = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // A hung transport connect must not hang shutdown with it
            if timeout(SUPERVISOR_SHUTDOWN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("DMX connection supervisor did not stop in time");
            }
        }
    }
}

/// Write handle for a [`ResilientConnection`]
///
/// Dropped writes return `Ok(())`. Errors from a live transport are returned so the
/// caller can track send health; they never panic.
#[derive(Clone)]
pub struct ResilientUniverse {
    shared: Arc<Shared>,
}

impl DmxUniverse for ResilientUniverse {
    fn update(&self, channels: &ChannelMap) -> Result<()> {
        self.shared.write("update", |transport| transport.send(channels))
    }

    fn update_all(&self, value: u8) -> Result<()> {
        self.shared.write("updateAll", |transport| transport.send_all(value))
    }
}
