//! Error types for the pulse counter core

use thiserror_no_std::Error;

/// Failures returned by counter operations.
///
/// None of these are fatal: the operation that failed leaves all prior
/// state untouched and the caller decides whether to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    #[error("Channel count {channel_count} outside 1..=255")]
    InvalidArgument { channel_count: usize },
    #[error("Channel index {index} out of range (channel count {channel_count})")]
    IndexOutOfRange { index: usize, channel_count: usize },
    #[error("Calendar time field out of range")]
    InvalidTime,
    #[error("Corrupt store image: {0}")]
    CorruptImage(&'static str),
    #[error("Stored image has {found} channels, expected {expected}")]
    ChannelCountMismatch { expected: usize, found: usize },
    #[error("Storage backend error: {0}")]
    Storage(heapless::String<64>),
    #[error("Config decode failed: {0}")]
    Config(postcard::Error),
}
