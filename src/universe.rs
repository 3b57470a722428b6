use crate::error::DmxError;
use crate::transport::DmxUniverse;
use crate::types::{ChannelMap, MAX_CHANNEL, MAX_VALUE, MIN_CHANNEL};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Callback invoked when a write to the universe fails
pub type DmxErrorCallback = Arc<dyn Fn(&DmxError) + Send + Sync>;

/// Health of the most recent universe writes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmxSendStatus {
    pub last_send_time: Option<SystemTime>,
    pub last_send_error: Option<String>,
}

/// A key that may name a DMX channel
///
/// Keys that are not an integer in 1-512 are rejected.
pub trait ChannelKey {
    fn channel(&self) -> Option<u16>;
}

impl ChannelKey for u16 {
    fn channel(&self) -> Option<u16> {
        (MIN_CHANNEL..=MAX_CHANNEL).contains(self).then_some(*self)
    }
}

impl ChannelKey for u32 {
    fn channel(&self) -> Option<u16> {
        u16::try_from(*self).ok().and_then(|ch| ch.channel())
    }
}

impl ChannelKey for i32 {
    fn channel(&self) -> Option<u16> {
        u16::try_from(*self).ok().and_then(|ch| ch.channel())
    }
}

impl ChannelKey for i64 {
    fn channel(&self) -> Option<u16> {
        u16::try_from(*self).ok().and_then(|ch| ch.channel())
    }
}

impl ChannelKey for &str {
    fn channel(&self) -> Option<u16> {
        self.trim().parse::<u16>().ok().and_then(|ch| ch.channel())
    }
}

impl ChannelKey for String {
    fn channel(&self) -> Option<u16> {
        self.as_str().channel()
    }
}

/// Round half-up and clamp into the DMX value range
pub fn clamp_value(value: f64) -> u8 {
    (value + 0.5).floor().clamp(0.0, f64::from(MAX_VALUE)) as u8
}

/// Keep the entries with a valid channel and a finite value, rounded and clamped
fn build_dmx_update<I, K, V>(channels: I) -> ChannelMap
where
    I: IntoIterator<Item = (K, V)>,
    K: ChannelKey,
    V: Into<f64>,
{
    channels
        .into_iter()
        .filter_map(|(key, value)| {
            let channel = key.channel()?;
            let value = value.into();
            value.is_finite().then(|| (channel, clamp_value(value)))
        })
        .collect()
}

#[derive(Default)]
struct UniverseState {
    /// Non-zero channels only; absence means 0
    active: ChannelMap,
    override_active: bool,
    send_status: DmxSendStatus,
}

impl UniverseState {
    fn apply(&mut self, update: &ChannelMap) {
        for (&channel, &value) in update {
            if value > 0 {
                self.active.insert(channel, value);
            } else {
                self.active.remove(&channel);
            }
        }
    }
}

/// Canonical channel state of one 512-channel universe
///
/// Calls are serialized per instance. Channel state changes before the matching
/// write goes out, and never while a write is in flight, so a concurrent snapshot
/// sees either the state before a call or after it.
pub struct UniverseManager {
    universe: Box<dyn DmxUniverse>,
    state: Mutex<UniverseState>,
    calls: Mutex<()>,
    on_error: Option<DmxErrorCallback>,
}

impl UniverseManager {
    pub fn new(universe: impl DmxUniverse + 'static) -> Self {
        Self {
            universe: Box::new(universe),
            state: Mutex::new(UniverseState::default()),
            calls: Mutex::new(()),
            on_error: None,
        }
    }

    /// Report failed writes to `callback` in addition to logging them
    ///
    /// The callback runs after the failing call has finished, so it may call back
    /// into the manager.
    pub fn with_error_callback(mut self, callback: impl Fn(&DmxError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    fn state(&self) -> MutexGuard<'_, UniverseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn serialize_call(&self) -> MutexGuard<'_, ()> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write to the universe, recording the outcome instead of returning it
    ///
    /// Hands back the error so the caller can report it once its call guard is released.
    fn safe_send(
        &self,
        label: &str,
        send: impl FnOnce(&dyn DmxUniverse) -> crate::Result<()>,
    ) -> Option<DmxError> {
        let result = send(self.universe.as_ref());
        let mut state = self.state();
        match result {
            Ok(()) => {
                state.send_status.last_send_time = Some(SystemTime::now());
                state.send_status.last_send_error = None;
                None
            }
            Err(err) => {
                tracing::error!("DMX send failed ({}): {}", label, err);
                state.send_status.last_send_error = Some(err.to_string());
                Some(err)
            }
        }
    }

    /// Must be called without the call guard held
    fn report(&self, failure: Option<DmxError>) {
        if let (Some(err), Some(callback)) = (failure, &self.on_error) {
            callback(&err);
        }
    }

    /// Apply a fixture's channel values
    ///
    /// Entries with an invalid channel or a non-finite value are skipped one by one.
    /// While blackout or whiteout is active the whole update is ignored. Returns the
    /// number of channels applied.
    pub fn apply_fixture_update<I, K, V>(&self, fixture_id: &str, channels: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: ChannelKey,
        V: Into<f64>,
    {
        let call = self.serialize_call();

        let update = {
            let mut state = self.state();
            if state.override_active {
                tracing::debug!("DMX update for {} ignored: override active", fixture_id);
                return 0;
            }
            let update = build_dmx_update(channels);
            if update.is_empty() {
                return 0;
            }
            state.apply(&update);
            update
        };

        let count = update.len();
        let failure = self.safe_send(&format!("fixture-update {}ch", count), |universe| universe.update(&update));
        tracing::debug!("DMX update from {}: {} channels sent", fixture_id, count);
        drop(call);
        self.report(failure);

        count
    }

    /// Apply channel values even while an override is active
    ///
    /// Used for transient effects such as a fixture test flash.
    pub fn apply_raw_update<I, K, V>(&self, channels: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: ChannelKey,
        V: Into<f64>,
    {
        let call = self.serialize_call();

        let update = build_dmx_update(channels);
        if update.is_empty() {
            return 0;
        }
        self.state().apply(&update);

        let count = update.len();
        let failure = self.safe_send(&format!("raw-update {}ch", count), |universe| universe.update(&update));
        drop(call);
        self.report(failure);

        count
    }

    /// Force every channel to 0 and hold it there until [`resume_normal`](Self::resume_normal)
    pub fn blackout(&self) {
        let call = self.serialize_call();
        {
            let mut state = self.state();
            state.override_active = true;
            state.active.clear();
        }
        let failure = self.safe_send("blackout", |universe| universe.update_all(0));
        tracing::info!("DMX blackout: all 512 channels -> 0 (override active)");
        drop(call);
        self.report(failure);
    }

    /// Force every channel to full and hold it there until [`resume_normal`](Self::resume_normal)
    pub fn whiteout(&self) {
        let call = self.serialize_call();
        {
            let mut state = self.state();
            state.override_active = true;
            state.active = (MIN_CHANNEL..=MAX_CHANNEL).map(|ch| (ch, MAX_VALUE)).collect();
        }
        let failure = self.safe_send("whiteout", |universe| universe.update_all(MAX_VALUE));
        tracing::info!("DMX whiteout: all 512 channels -> 255 (override active)");
        drop(call);
        self.report(failure);
    }

    /// Clear a blackout/whiteout override
    ///
    /// Channel values are left as they are until the next update.
    pub fn resume_normal(&self) {
        let _call = self.serialize_call();
        self.state().override_active = false;
        tracing::info!("DMX override cleared: resuming normal updates");
    }

    pub fn is_override_active(&self) -> bool {
        self.state().override_active
    }

    /// Number of channels currently above 0
    pub fn active_channel_count(&self) -> usize {
        self.state().active.len()
    }

    /// All non-zero channels
    pub fn full_snapshot(&self) -> ChannelMap {
        self.state().active.clone()
    }

    /// Values of `count` channels starting at `start`, with inactive channels as 0
    pub fn channel_snapshot(&self, start: u16, count: u16) -> ChannelMap {
        let state = self.state();
        let end = u32::from(start) + u32::from(count);
        (u32::from(start)..end)
            .filter_map(|ch| u16::try_from(ch).ok())
            .map(|ch| (ch, state.active.get(&ch).copied().unwrap_or(0)))
            .collect()
    }

    pub fn dmx_send_status(&self) -> DmxSendStatus {
        self.state().send_status.clone()
    }
}
