//! RGB + brightness to fixture channel values

use crate::capabilities::{analyze_fixture, StrobeMode, MOVEMENT_CENTER};
use crate::types::{ChannelMap, ChannelRole, ColorTag, Fixture, FixtureChannel, MAX_VALUE};
use crate::universe::clamp_value;

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Strobe value for normal output: closed in effect mode, otherwise open
fn strobe_value(channel: &FixtureChannel, strobe_mode: StrobeMode) -> u8 {
    if strobe_mode == StrobeMode::Effect {
        0
    } else if channel.default_value > 0 {
        channel.default_value
    } else {
        MAX_VALUE
    }
}

/// Map a color intent onto a fixture's channels
///
/// `r`, `g` and `b` are 0-255 and `brightness` is 0-1. Returns absolute DMX address to
/// value for every channel of the fixture.
///
/// Without a dimmer the color channels carry brightness. With one, the dimmer alone
/// does, so hue stays stable while fading. A white emitter takes the gray component
/// `min(r, g, b)` out of the primaries.
pub fn map_color(fixture: &Fixture, r: f64, g: f64, b: f64, brightness: f64) -> ChannelMap {
    let caps = analyze_fixture(&fixture.channels);

    let (mut red, mut green, mut blue) = if brightness <= 0.0 {
        (0.0, 0.0, 0.0)
    } else if caps.has_dimmer {
        (r, g, b)
    } else {
        (
            round_half_up(r * brightness),
            round_half_up(g * brightness),
            round_half_up(b * brightness),
        )
    };

    let mut white = 0.0;
    if caps.colors.has_white {
        white = red.min(green).min(blue);
        red -= white;
        green -= white;
        blue -= white;
    }

    // Subtractive mixing works from the clamped primaries
    let full = f64::from(MAX_VALUE);
    let (red_level, green_level, blue_level) = (
        f64::from(clamp_value(red)),
        f64::from(clamp_value(green)),
        f64::from(clamp_value(blue)),
    );

    let mut result = ChannelMap::new();
    for channel in &fixture.channels {
        let value = match channel.role {
            ChannelRole::ColorIntensity => match channel.color {
                Some(ColorTag::Red) => clamp_value(red),
                Some(ColorTag::Green) => clamp_value(green),
                Some(ColorTag::Blue) => clamp_value(blue),
                Some(ColorTag::White) => clamp_value(white),
                Some(ColorTag::Amber) => clamp_value(red * 0.8 + green * 0.2),
                Some(ColorTag::Cyan) => clamp_value(full - red_level),
                Some(ColorTag::Magenta) => clamp_value(full - green_level),
                Some(ColorTag::Yellow) => clamp_value(full - blue_level),
                Some(ColorTag::Uv) => 0,
                Some(ColorTag::Other) | None => channel.default_value,
            },
            ChannelRole::Intensity => clamp_value(brightness * full),
            role if role.is_strobe() => strobe_value(channel, caps.strobe_mode),
            role if role.is_movement() => {
                if channel.default_value > 0 {
                    channel.default_value
                } else {
                    MOVEMENT_CENTER
                }
            }
            _ => channel.default_value,
        };
        result.insert(fixture.address_of(channel), value);
    }

    result
}

/// Frame for a fixture test flash
///
/// Color and intensity channels go to full and the strobe opens (unless it is an
/// effect strobe). Everything else keeps its current value from `snapshot`, or the
/// channel default when the snapshot has none.
pub fn flash_values(fixture: &Fixture, snapshot: &ChannelMap) -> ChannelMap {
    let strobe_mode = analyze_fixture(&fixture.channels).strobe_mode;

    fixture
        .channels
        .iter()
        .map(|channel| {
            let address = fixture.address_of(channel);
            let value = match channel.role {
                ChannelRole::ColorIntensity | ChannelRole::Intensity => MAX_VALUE,
                role if role.is_strobe() => {
                    if strobe_mode == StrobeMode::Effect {
                        0
                    } else {
                        MAX_VALUE
                    }
                }
                _ => snapshot.get(&address).copied().unwrap_or(channel.default_value),
            };
            (address, value)
        })
        .collect()
}

/// Per-fixture values to lay over a universe-wide whiteout
///
/// Maps full white at full brightness onto every fixture, so that pan/tilt stay centered
/// and effect strobes stay closed instead of sitting at 255.
pub fn whiteout_overlay(fixtures: &[Fixture]) -> ChannelMap {
    fixtures
        .iter()
        .flat_map(|fixture| map_color(fixture, 255.0, 255.0, 255.0, 1.0))
        .collect()
}
