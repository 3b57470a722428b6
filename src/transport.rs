use crate::error::{DmxError, Result};
use crate::types::ChannelMap;
use futures_util::future::{self, BoxFuture, FutureExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Fires once when a transport loses its device
pub type DisconnectSignal = oneshot::Receiver<DmxError>;

/// Raw link to a DMX interface
///
/// Implementations own the DMX-512 framing; this crate only hands them channel values.
pub trait Transport: Send + Sync {
    /// Write a sparse set of channel values
    fn send(&self, channels: &ChannelMap) -> Result<()>;

    /// Write the same value to all 512 channels
    fn send_all(&self, value: u8) -> Result<()>;

    /// Take the transport's disconnect notification, if it has one
    ///
    /// Transports without a hook are treated as permanently healthy once connected.
    fn subscribe_disconnect(&mut self) -> Option<DisconnectSignal> {
        None
    }

    /// Flush and release the device
    fn close(&self) -> BoxFuture<'_, Result<()>>;
}

/// Opens transports, once at startup and again on every reconnect attempt
pub trait TransportFactory: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Transport>>>;
}

/// Write interface of a DMX universe
pub trait DmxUniverse: Send + Sync {
    fn update(&self, channels: &ChannelMap) -> Result<()>;

    fn update_all(&self, value: u8) -> Result<()>;
}

/// Source of the full active-channel state, replayed after a reconnect
///
/// Called once per successful reconnect while the connection's link lock is held.
/// Implementations must not write through the connection's universe or query its
/// status, or the reconnect deadlocks.
pub trait ChannelSnapshot: Send + Sync {
    fn full_snapshot(&self) -> ChannelMap;
}

impl<F> ChannelSnapshot for F
where
    F: Fn() -> ChannelMap + Send + Sync,
{
    fn full_snapshot(&self) -> ChannelMap {
        self()
    }
}

/// Transport that discards every frame
///
/// Used when no DMX hardware is attached.
#[derive(Debug, Default, Clone)]
pub struct NullTransport {
    frames: Arc<AtomicU64>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes accepted so far
    pub fn frames_sent(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl Transport for NullTransport {
    fn send(&self, channels: &ChannelMap) -> Result<()> {
        tracing::debug!("null transport: {} channels", channels.len());
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn send_all(&self, value: u8) -> Result<()> {
        tracing::debug!("null transport: all channels -> {}", value);
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        future::ready(Ok(())).boxed()
    }
}

/// Factory for [`NullTransport`]; connecting always succeeds
///
/// Every transport it opens shares one frame counter.
#[derive(Debug, Default, Clone)]
pub struct NullTransportFactory {
    transport: NullTransport,
}

impl NullTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames written through any transport this factory opened
    pub fn frames_sent(&self) -> u64 {
        self.transport.frames_sent()
    }
}

impl TransportFactory for NullTransportFactory {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Transport>>> {
        let transport: Box<dyn Transport> = Box::new(self.transport.clone());
        future::ready(Ok(transport)).boxed()
    }
}
