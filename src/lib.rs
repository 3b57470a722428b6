//! Resilient DMX-512 output for RGB lighting controllers
//!
//! This library turns color intents (RGB + brightness, as produced by an RGB lighting
//! controller) into DMX channel values for real fixtures and keeps them flowing to a
//! USB/serial DMX interface that may come and go. It provides:
//!
//! - A reconnecting connection that absorbs transport failures and replays channel state
//! - A 512-channel universe with validated writes, blackout/whiteout and send health
//! - Fixture capability analysis and RGB to channel mapping for mixed fixture wiring
//! - Address range validation for patching fixtures
//!
//! # Quick Start
//!
//! ```no_run
//! use dmxr::{
//!     map_color, ChannelRole, ColorTag, ConnectionOptions, DmxOutput, Fixture, FixtureChannel,
//!     NullTransportFactory,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let output = DmxOutput::start(NullTransportFactory::new(), ConnectionOptions::new()).await;
//!
//!     let par = Fixture::new(
//!         "Front Par",
//!         1,
//!         vec![
//!             FixtureChannel::new(0, "Dimmer", ChannelRole::Intensity),
//!             FixtureChannel::color(1, "Red", ColorTag::Red),
//!             FixtureChannel::color(2, "Green", ColorTag::Green),
//!             FixtureChannel::color(3, "Blue", ColorTag::Blue),
//!         ],
//!     );
//!
//!     let channels = map_color(&par, 255.0, 128.0, 64.0, 0.5);
//!     let applied = output.manager().apply_fixture_update(&par.id, channels);
//!     println!("{} channels applied, link {}", applied, output.status().state);
//!
//!     output.close().await;
//! }
//! ```
//!
//! # Architecture
//!
//! - **Transport**: boundary traits for the DMX interface driver (framing lives there)
//! - **Connection**: reconnect state machine with exponential backoff
//! - **Universe**: canonical channel state, override handling and send health
//! - **Capabilities / Channel mapper**: pure fixture analysis and color mapping
//! - **Validator**: address range and channel list checks

mod capabilities;
mod channel_mapper;
mod config;
mod connection;
mod connection_state;
mod error;
mod output;
mod subscription;
mod transport;
mod types;
mod universe;
mod validator;

// Public exports
pub use capabilities::{
    analyze_fixture, apply_role_defaults, default_value_for_channel, ColorCapabilities,
    FixtureCapabilities, StrobeMode, MOVEMENT_CENTER,
};
pub use channel_mapper::{flash_values, map_color, whiteout_overlay};
pub use config::{ConnectionOptions, ReconnectPolicy, StateChangeCallback};
pub use connection::{ResilientConnection, ResilientUniverse};
pub use connection_state::{ConnectionState, ConnectionStatus};
pub use error::{AddressError, ChannelLayoutError, DmxError, Result};
pub use output::DmxOutput;
pub use subscription::StatusReceiver;
pub use transport::{
    ChannelSnapshot, DisconnectSignal, DmxUniverse, NullTransport, NullTransportFactory, Transport,
    TransportFactory,
};
pub use types::{
    ChannelMap, ChannelRole, ColorTag, Fixture, FixtureChannel, FixtureId, MAX_CHANNEL, MAX_VALUE,
    MIN_CHANNEL,
};
pub use universe::{clamp_value, ChannelKey, DmxErrorCallback, DmxSendStatus, UniverseManager};
pub use validator::{validate_fixture_address, validate_fixture_channels};
