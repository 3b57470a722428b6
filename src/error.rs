use thiserror::Error;

/// Result type for DMX operations
pub type Result<T> = std::result::Result<T, DmxError>;

/// Errors raised by a DMX transport or the connection wrapping it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DmxError {
    /// The transport failed to connect, send or close
    #[error("{0}")]
    Transport(String),

    /// The transport reported that the device went away
    #[error("device disconnected: {0}")]
    Disconnected(String),

    /// The connection has been closed by its owner
    #[error("Connection closed")]
    ConnectionClosed,

    /// I/O error from a serial or USB device
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DmxError {
    fn from(err: std::io::Error) -> Self {
        DmxError::Io(err.to_string())
    }
}

/// Reasons a fixture cannot occupy a DMX address range
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Start address is below channel 1
    #[error("Start address must be >= 1")]
    InvalidStart,

    /// The fixture's last channel lies beyond channel 512
    #[error("Fixture extends beyond channel 512 (needs {start}-{end})")]
    ExceedsUniverse { start: i64, end: i64 },

    /// The fixture occupies no channels
    #[error("Channel count must be >= 1")]
    EmptyFixture,

    /// The range collides with an existing fixture
    #[error("Overlaps with \"{name}\" (DMX {start}-{end})")]
    Overlap { name: String, start: i64, end: i64 },
}

/// Reasons a fixture's channel list is unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelLayoutError {
    /// Declared channel count disagrees with the channel list
    #[error("channelCount ({expected}) does not match channels array length ({actual})")]
    CountMismatch { expected: usize, actual: usize },

    /// A channel offset points outside the fixture's footprint
    #[error("Channel \"{name}\" has offset {offset} outside 0-{max}")]
    OffsetOutOfRange { name: String, offset: u16, max: usize },

    /// Two channels claim the same offset
    #[error("Channel \"{name}\" reuses offset {offset}")]
    DuplicateOffset { name: String, offset: u16 },
}
