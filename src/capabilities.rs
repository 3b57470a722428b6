//! Fixture capability analysis
//!
//! Everything here is a pure function of a fixture's channel list. Profiles are
//! derived on every call and never cached.

use crate::types::{ChannelRole, ColorTag, FixtureChannel, MAX_VALUE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mechanical center for pan/tilt coarse channels
pub const MOVEMENT_CENTER: u8 = 128;

/// How a fixture's strobe channel relates to its light output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrobeMode {
    /// No strobe channel
    None,
    /// Strobe decorates a separately dimmable fixture and idles closed
    Effect,
    /// Strobe is the only light gate and idles open
    Shutter,
}

/// Which emitter colors a fixture has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorCapabilities {
    pub has_red: bool,
    pub has_green: bool,
    pub has_blue: bool,
    pub has_white: bool,
    pub has_amber: bool,
    pub has_cyan: bool,
    pub has_magenta: bool,
    pub has_yellow: bool,
    pub has_uv: bool,
}

impl ColorCapabilities {
    fn mark(&mut self, color: ColorTag) {
        match color {
            ColorTag::Red => self.has_red = true,
            ColorTag::Green => self.has_green = true,
            ColorTag::Blue => self.has_blue = true,
            ColorTag::White => self.has_white = true,
            ColorTag::Amber => self.has_amber = true,
            ColorTag::Cyan => self.has_cyan = true,
            ColorTag::Magenta => self.has_magenta = true,
            ColorTag::Yellow => self.has_yellow = true,
            ColorTag::Uv => self.has_uv = true,
            ColorTag::Other => {}
        }
    }
}

/// Capability profile of a fixture's channel list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureCapabilities<'a> {
    pub has_dimmer: bool,
    pub colors: ColorCapabilities,
    pub strobe_mode: StrobeMode,
    pub has_pan: bool,
    pub has_tilt: bool,
    /// Channels grouped by role, in declaration order
    pub channels_by_type: BTreeMap<ChannelRole, Vec<&'a FixtureChannel>>,
}

/// Analyze a fixture's channels
pub fn analyze_fixture(channels: &[FixtureChannel]) -> FixtureCapabilities<'_> {
    let mut has_dimmer = false;
    let mut has_strobe = false;
    let mut has_pan = false;
    let mut has_tilt = false;
    let mut colors = ColorCapabilities::default();
    let mut channels_by_type: BTreeMap<ChannelRole, Vec<&FixtureChannel>> = BTreeMap::new();

    for channel in channels {
        channels_by_type.entry(channel.role).or_default().push(channel);

        match channel.role {
            ChannelRole::Intensity => has_dimmer = true,
            ChannelRole::Pan => has_pan = true,
            ChannelRole::Tilt => has_tilt = true,
            ChannelRole::ColorIntensity => {
                if let Some(color) = channel.color {
                    colors.mark(color);
                }
            }
            role if role.is_strobe() => has_strobe = true,
            _ => {}
        }
    }

    let strobe_mode = match (has_strobe, has_dimmer) {
        (false, _) => StrobeMode::None,
        (true, true) => StrobeMode::Effect,
        (true, false) => StrobeMode::Shutter,
    };

    FixtureCapabilities {
        has_dimmer,
        colors,
        strobe_mode,
        has_pan,
        has_tilt,
        channels_by_type,
    }
}

/// Whether a channel name marks the low byte of a 16-bit pair
fn is_fine_channel(name: &str) -> bool {
    name.to_ascii_lowercase().contains("fine")
}

/// Idle value for a channel of `role` on a fixture with the given strobe mode
///
/// Fine pan/tilt channels stay at 0 so the coarse+fine pair reads as coarse * 256.
pub fn default_value_for_channel(role: ChannelRole, strobe_mode: StrobeMode, name: Option<&str>) -> u8 {
    match role {
        role if role.is_strobe() => {
            if strobe_mode == StrobeMode::Shutter {
                MAX_VALUE
            } else {
                0
            }
        }
        role if role.is_movement() => {
            if name.is_some_and(is_fine_channel) {
                0
            } else {
                MOVEMENT_CENTER
            }
        }
        _ => 0,
    }
}

/// Fill in every channel's default value from its role
///
/// For channel lists imported without explicit defaults.
pub fn apply_role_defaults(channels: &mut [FixtureChannel]) {
    let strobe_mode = analyze_fixture(channels).strobe_mode;
    for channel in channels.iter_mut() {
        channel.default_value = default_value_for_channel(channel.role, strobe_mode, Some(&channel.name));
    }
}
