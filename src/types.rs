use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Absolute DMX address (1-512) mapped to a channel value (0-255)
pub type ChannelMap = BTreeMap<u16, u8>;

/// Fixture identifier
pub type FixtureId = String;

/// First addressable DMX channel
pub const MIN_CHANNEL: u16 = 1;

/// Last addressable DMX channel
pub const MAX_CHANNEL: u16 = 512;

/// Highest value a DMX channel carries
pub const MAX_VALUE: u8 = 255;

/// Semantic role of a fixture channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelRole {
    ColorIntensity,
    Intensity,
    Strobe,
    ShutterStrobe,
    Pan,
    Tilt,
    Gobo,
    Focus,
    Zoom,
    Iris,
    Prism,
    ColorWheel,
    Generic,
    NoFunction,
    /// Any role name this crate does not know about
    #[serde(other)]
    Unknown,
}

impl ChannelRole {
    /// Whether the channel gates light output as a strobe/shutter
    pub fn is_strobe(self) -> bool {
        matches!(self, ChannelRole::Strobe | ChannelRole::ShutterStrobe)
    }

    /// Whether the channel drives mechanical movement
    pub fn is_movement(self) -> bool {
        matches!(self, ChannelRole::Pan | ChannelRole::Tilt)
    }
}

/// Emitter color of a `ColorIntensity` channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorTag {
    Red,
    Green,
    Blue,
    White,
    Amber,
    Cyan,
    Magenta,
    Yellow,
    #[serde(rename = "UV")]
    Uv,
    /// Unrecognized color name
    #[serde(other)]
    Other,
}

/// A single DMX channel within a fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureChannel {
    /// Zero-based offset from the fixture's start address
    pub offset: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub role: ChannelRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorTag>,
    #[serde(default)]
    pub default_value: u8,
}

impl FixtureChannel {
    /// Create a channel with no color tag and a default value of 0
    pub fn new(offset: u16, name: impl Into<String>, role: ChannelRole) -> Self {
        Self {
            offset,
            name: name.into(),
            role,
            color: None,
            default_value: 0,
        }
    }

    /// Create a `ColorIntensity` channel for the given emitter color
    pub fn color(offset: u16, name: impl Into<String>, color: ColorTag) -> Self {
        Self {
            color: Some(color),
            ..Self::new(offset, name, ChannelRole::ColorIntensity)
        }
    }

    /// Set the channel's default value
    pub fn with_default(mut self, value: u8) -> Self {
        self.default_value = value;
        self
    }
}

/// A physical fixture patched into the universe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub id: FixtureId,
    pub name: String,
    pub dmx_start_address: u16,
    pub channel_count: u16,
    pub channels: Vec<FixtureChannel>,
}

impl Fixture {
    /// Create a fixture with a freshly generated id
    ///
    /// The channel count is taken from the channel list.
    pub fn new(name: impl Into<String>, dmx_start_address: u16, channels: Vec<FixtureChannel>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            dmx_start_address,
            channel_count: u16::try_from(channels.len()).unwrap_or(u16::MAX),
            channels,
        }
    }

    /// Last DMX address this fixture occupies
    pub fn end_address(&self) -> i64 {
        i64::from(self.dmx_start_address) + i64::from(self.channel_count) - 1
    }

    /// Absolute DMX address of a channel
    pub fn address_of(&self, channel: &FixtureChannel) -> u16 {
        self.dmx_start_address.saturating_add(channel.offset)
    }
}
