use crate::error::{AddressError, ChannelLayoutError};
use crate::types::{ChannelRole, Fixture, FixtureChannel, MAX_CHANNEL, MIN_CHANNEL};
use std::collections::BTreeSet;

/// Check that a fixture can occupy `count` channels starting at `start`
///
/// `exclude_id` skips the fixture being moved, so it does not collide with itself.
/// Ranges `[s1, e1]` and `[s2, e2]` overlap when `s1 <= e2 && e1 >= s2`.
pub fn validate_fixture_address(
    start: i64,
    count: i64,
    existing: &[Fixture],
    exclude_id: Option<&str>,
) -> Result<(), AddressError> {
    if start < i64::from(MIN_CHANNEL) {
        return Err(AddressError::InvalidStart);
    }

    let end = start.saturating_add(count).saturating_sub(1);
    if end > i64::from(MAX_CHANNEL) {
        return Err(AddressError::ExceedsUniverse { start, end });
    }

    if count < 1 {
        return Err(AddressError::EmptyFixture);
    }

    let collision = existing
        .iter()
        .filter(|fixture| exclude_id != Some(fixture.id.as_str()))
        .find(|fixture| start <= fixture.end_address() && end >= i64::from(fixture.dmx_start_address));

    match collision {
        Some(fixture) => Err(AddressError::Overlap {
            name: fixture.name.clone(),
            start: i64::from(fixture.dmx_start_address),
            end: fixture.end_address(),
        }),
        None => Ok(()),
    }
}

/// Check a fixture's channel list against its declared channel count
///
/// On success returns warnings for channels whose role was not recognized.
pub fn validate_fixture_channels(
    channels: &[FixtureChannel],
    expected_count: usize,
) -> Result<Vec<String>, ChannelLayoutError> {
    if channels.len() != expected_count {
        return Err(ChannelLayoutError::CountMismatch {
            expected: expected_count,
            actual: channels.len(),
        });
    }

    let mut seen = BTreeSet::new();
    for channel in channels {
        if usize::from(channel.offset) >= expected_count {
            return Err(ChannelLayoutError::OffsetOutOfRange {
                name: channel.name.clone(),
                offset: channel.offset,
                max: expected_count.saturating_sub(1),
            });
        }
        if !seen.insert(channel.offset) {
            return Err(ChannelLayoutError::DuplicateOffset {
                name: channel.name.clone(),
                offset: channel.offset,
            });
        }
    }

    let warnings = channels
        .iter()
        .filter(|channel| channel.role == ChannelRole::Unknown)
        .map(|channel| format!("Unknown channel type on channel \"{}\"", channel.name))
        .collect();

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColorTag;

    fn existing(start: u16, count: u16) -> Fixture {
        let channels = (0..count)
            .map(|offset| FixtureChannel::new(offset, format!("Ch {}", offset + 1), ChannelRole::Generic))
            .collect();
        Fixture::new("Existing Par", start, channels)
    }

    #[test]
    fn test_overlap_is_rejected() {
        let fixtures = vec![existing(1, 5)];

        let err = validate_fixture_address(3, 3, &fixtures, None).unwrap_err();
        assert_eq!(
            err,
            AddressError::Overlap {
                name: "Existing Par".to_string(),
                start: 1,
                end: 5
            }
        );
        assert_eq!(err.to_string(), "Overlaps with \"Existing Par\" (DMX 1-5)");
    }

    #[test]
    fn test_adjacent_range_is_valid() {
        let fixtures = vec![existing(1, 5)];
        assert_eq!(validate_fixture_address(6, 3, &fixtures, None), Ok(()));
        assert!(validate_fixture_address(5, 1, &fixtures, None).is_err());
    }

    #[test]
    fn test_universe_bounds() {
        let fixtures = vec![existing(1, 5)];

        assert_eq!(validate_fixture_address(512, 1, &fixtures, None), Ok(()));
        assert_eq!(
            validate_fixture_address(511, 3, &fixtures, None),
            Err(AddressError::ExceedsUniverse { start: 511, end: 513 })
        );
        assert_eq!(validate_fixture_address(0, 1, &[], None), Err(AddressError::InvalidStart));
        assert_eq!(validate_fixture_address(-4, 1, &[], None), Err(AddressError::InvalidStart));
        assert_eq!(validate_fixture_address(10, 0, &[], None), Err(AddressError::EmptyFixture));
    }

    #[test]
    fn test_huge_count_exceeds_universe() {
        let fixtures = vec![existing(1, 5)];

        assert!(matches!(
            validate_fixture_address(2, i64::MAX, &fixtures, None),
            Err(AddressError::ExceedsUniverse { start: 2, .. })
        ));
        assert!(matches!(
            validate_fixture_address(i64::MAX, i64::MAX, &[], None),
            Err(AddressError::ExceedsUniverse { .. })
        ));
        assert_eq!(validate_fixture_address(3, i64::MIN, &[], None), Err(AddressError::EmptyFixture));
    }

    #[test]
    fn test_exclude_id_allows_moving_in_place() {
        let fixture = existing(1, 5);
        let id = fixture.id.clone();
        let fixtures = vec![fixture, existing(20, 4)];

        assert_eq!(validate_fixture_address(2, 5, &fixtures, Some(&id)), Ok(()));
        assert!(validate_fixture_address(2, 5, &fixtures, Some("someone-else")).is_err());
        assert!(validate_fixture_address(18, 5, &fixtures, Some(&id)).is_err());
    }

    #[test]
    fn test_channel_count_must_match() {
        let channels = vec![FixtureChannel::color(0, "Red", ColorTag::Red)];
        assert_eq!(
            validate_fixture_channels(&channels, 3),
            Err(ChannelLayoutError::CountMismatch { expected: 3, actual: 1 })
        );
    }

    #[test]
    fn test_channel_offsets_must_fit_and_be_unique() {
        let channels = vec![
            FixtureChannel::color(0, "Red", ColorTag::Red),
            FixtureChannel::color(2, "Green", ColorTag::Green),
        ];
        assert!(matches!(
            validate_fixture_channels(&channels, 2),
            Err(ChannelLayoutError::OffsetOutOfRange { offset: 2, max: 1, .. })
        ));

        let channels = vec![
            FixtureChannel::color(0, "Red", ColorTag::Red),
            FixtureChannel::color(0, "Green", ColorTag::Green),
        ];
        assert!(matches!(
            validate_fixture_channels(&channels, 2),
            Err(ChannelLayoutError::DuplicateOffset { offset: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_roles_produce_warnings() {
        let channels = vec![
            FixtureChannel::color(0, "Red", ColorTag::Red),
            FixtureChannel::new(1, "Macro", ChannelRole::Unknown),
        ];

        let warnings = validate_fixture_channels(&channels, 2).unwrap();
        assert_eq!(warnings, vec!["Unknown channel type on channel \"Macro\"".to_string()]);

        assert!(validate_fixture_channels(&channels[..1], 1).unwrap().is_empty());
    }
}
