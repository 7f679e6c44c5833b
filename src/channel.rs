//! # Channel and Retry Count Identifiers
//!
//! Validated newtypes for the two inputs the spectrum model accepts from the
//! surrounding radio stack.
//!
//! ## Channels and Buckets
//!
//! A [`Channel`] is one raw radio frequency slot in `0..=MAX_RF_CHANNEL`
//! (f = 2400 MHz + channel). The model does not track channels individually:
//! every two adjacent channels share one bucket, `bucket = channel >> 1`.
//!
//! ## Retry Counts
//!
//! A [`RetryCount`] is the number of hardware and software retransmissions a
//! packet needed before it was acknowledged. It is bounded by
//! `MAX_RETRIES = MAX_HARDWARE_RETRIES * DEFAULT_SOFTWARE_RETRIES`.
//!
//! Both types can only be built from in-range values, so the model operations
//! taking them never index outside the bucket table.

use core::fmt;

use crate::{MAX_RETRIES, MAX_RF_CHANNEL, NUM_BUCKETS, SpectrumError};

/// Number of low bits of a channel that select a channel inside its bucket
const BUCKET_SHIFT: u8 = 1;

/// A raw radio channel in `0..=MAX_RF_CHANNEL`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Lowest legal channel
    pub const MIN: Channel = Channel(0);

    /// Highest legal channel
    pub const MAX: Channel = Channel(MAX_RF_CHANNEL);

    /// Creates a channel, or `None` if `raw` is above `MAX_RF_CHANNEL`
    ///
    /// # Example
    /// ```rust
    /// use radio_spectrum_lib::{Channel, MAX_RF_CHANNEL};
    ///
    /// assert!(Channel::new(MAX_RF_CHANNEL).is_some());
    /// assert!(Channel::new(MAX_RF_CHANNEL + 1).is_none());
    /// ```
    pub const fn new(raw: u8) -> Option<Self> {
        if raw <= MAX_RF_CHANNEL { Some(Channel(raw)) } else { None }
    }

    /// Raw channel number
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Index of the bucket this channel belongs to
    pub const fn bucket(self) -> usize {
        (self.0 >> BUCKET_SHIFT) as usize
    }

    /// Converts a bucket back to one of its two channels
    ///
    /// `upper` selects the odd channel of the pair. If the top bucket only
    /// holds a single legal channel, the even one is returned instead.
    pub(crate) const fn from_bucket(bucket: usize, upper: bool) -> Self {
        debug_assert!(bucket < NUM_BUCKETS);
        let even = (bucket as u8) << BUCKET_SHIFT;
        if upper && even < MAX_RF_CHANNEL { Channel(even + 1) } else { Channel(even) }
    }

    /// Iterates over every legal channel in ascending order
    pub fn all() -> impl Iterator<Item = Channel> {
        (0..=MAX_RF_CHANNEL).map(Channel)
    }
}

impl TryFrom<u8> for Channel {
    type Error = SpectrumError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Channel::new(raw).ok_or(SpectrumError::ChannelOutOfRange(raw))
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> u8 {
        channel.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Observed retransmission count for one delivered packet, in `0..=MAX_RETRIES`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetryCount(u32);

impl RetryCount {
    /// Packet went through on the first attempt
    pub const ZERO: RetryCount = RetryCount(0);

    /// Every hardware and software retry was used up
    pub const MAX: RetryCount = RetryCount(MAX_RETRIES);

    /// Creates a retry count, or `None` if `raw` is above `MAX_RETRIES`
    pub const fn new(raw: u32) -> Option<Self> {
        if raw <= MAX_RETRIES { Some(RetryCount(raw)) } else { None }
    }

    /// Creates a retry count, clamping `raw` to `MAX_RETRIES`
    ///
    /// # Example
    /// ```rust
    /// use radio_spectrum_lib::{RetryCount, MAX_RETRIES};
    ///
    /// assert_eq!(RetryCount::saturating(u32::MAX).value(), MAX_RETRIES);
    /// assert_eq!(RetryCount::saturating(12).value(), 12);
    /// ```
    pub const fn saturating(raw: u32) -> Self {
        if raw <= MAX_RETRIES { RetryCount(raw) } else { RetryCount(MAX_RETRIES) }
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for RetryCount {
    type Error = SpectrumError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        RetryCount::new(raw).ok_or(SpectrumError::RetryCountOutOfRange(raw))
    }
}

impl From<RetryCount> for u32 {
    fn from(retry_count: RetryCount) -> u32 {
        retry_count.0
    }
}
