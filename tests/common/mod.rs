#![allow(dead_code)]

use dmxr::{ChannelMap, DisconnectSignal, DmxError, DmxUniverse, Result, Transport, TransportFactory};
use futures_util::future::{self, BoxFuture, FutureExt};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Test-side view of a [`MockTransport`]
#[derive(Clone, Default)]
pub struct TransportProbe {
    sends: Arc<Mutex<Vec<ChannelMap>>>,
    send_alls: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
    disconnect_tx: Arc<Mutex<Option<oneshot::Sender<DmxError>>>>,
}

impl TransportProbe {
    pub fn sends(&self) -> Vec<ChannelMap> {
        self.sends.lock().unwrap().clone()
    }

    pub fn send_alls(&self) -> Vec<u8> {
        self.send_alls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Simulate the USB device going away; false if nobody was listening
    pub fn disconnect(&self, reason: &str) -> bool {
        match self.disconnect_tx.lock().unwrap().take() {
            Some(tx) => tx.send(DmxError::Disconnected(reason.to_string())).is_ok(),
            None => false,
        }
    }
}

pub struct MockTransport {
    probe: TransportProbe,
    disconnect_rx: Option<DisconnectSignal>,
}

impl MockTransport {
    pub fn new() -> (Self, TransportProbe) {
        let (tx, rx) = oneshot::channel();
        let probe = TransportProbe::default();
        *probe.disconnect_tx.lock().unwrap() = Some(tx);
        let transport = Self {
            probe: probe.clone(),
            disconnect_rx: Some(rx),
        };
        (transport, probe)
    }

    /// A transport that cannot report disconnects
    pub fn without_hook() -> (Self, TransportProbe) {
        let probe = TransportProbe::default();
        let transport = Self {
            probe: probe.clone(),
            disconnect_rx: None,
        };
        (transport, probe)
    }
}

impl Transport for MockTransport {
    fn send(&self, channels: &ChannelMap) -> Result<()> {
        if self.probe.failing.load(Ordering::SeqCst) {
            return Err(DmxError::Transport("write failed: device not responding".to_string()));
        }
        self.probe.sends.lock().unwrap().push(channels.clone());
        Ok(())
    }

    fn send_all(&self, value: u8) -> Result<()> {
        if self.probe.failing.load(Ordering::SeqCst) {
            return Err(DmxError::Transport("write failed: device not responding".to_string()));
        }
        self.probe.send_alls.lock().unwrap().push(value);
        Ok(())
    }

    fn subscribe_disconnect(&mut self) -> Option<DisconnectSignal> {
        self.disconnect_rx.take()
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        self.probe.closed.store(true, Ordering::SeqCst);
        future::ready(Ok(())).boxed()
    }
}

/// Factory that hands out queued outcomes; an empty queue means "no device"
#[derive(Clone, Default)]
pub struct MockFactory {
    outcomes: Arc<Mutex<VecDeque<Result<MockTransport>>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl MockFactory {
    pub const NO_DEVICE: &'static str = "no DMX device";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self) -> TransportProbe {
        let (transport, probe) = MockTransport::new();
        self.outcomes.lock().unwrap().push_back(Ok(transport));
        probe
    }

    pub fn push_transport(&self, transport: MockTransport) {
        self.outcomes.lock().unwrap().push_back(Ok(transport));
    }

    pub fn push_err(&self, message: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(DmxError::Transport(message.to_string())));
    }

    /// When each connect attempt happened
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

impl TransportFactory for MockFactory {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Transport>>> {
        self.attempts.lock().unwrap().push(Instant::now());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DmxError::Transport(Self::NO_DEVICE.to_string())));
        let outcome = outcome.map(|transport| Box::new(transport) as Box<dyn Transport>);
        future::ready(outcome).boxed()
    }
}

/// Universe that records writes and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingUniverse {
    updates: Arc<Mutex<Vec<ChannelMap>>>,
    update_alls: Arc<Mutex<Vec<u8>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingUniverse {
    pub fn updates(&self) -> Vec<ChannelMap> {
        self.updates.lock().unwrap().clone()
    }

    pub fn update_alls(&self) -> Vec<u8> {
        self.update_alls.lock().unwrap().clone()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DmxUniverse for RecordingUniverse {
    fn update(&self, channels: &ChannelMap) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DmxError::Transport("serial write timed out".to_string()));
        }
        self.updates.lock().unwrap().push(channels.clone());
        Ok(())
    }

    fn update_all(&self, value: u8) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DmxError::Transport("serial write timed out".to_string()));
        }
        self.update_alls.lock().unwrap().push(value);
        Ok(())
    }
}

/// Collects formatted log output for the current thread
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn count(&self, needle: &str) -> usize {
        let buf = self.buf.lock().unwrap();
        String::from_utf8_lossy(&buf).matches(needle).count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Let spawned tasks run without moving the clock
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance paused time past `ms` and let the supervisor react
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    settle().await;
}
