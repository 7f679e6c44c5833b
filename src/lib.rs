#![cfg_attr(not(feature = "std"), no_std)]

//! # Radio Spectrum Library
//!
//! Noise estimation and channel suggestion for nRF24-class base stations.
//!
//! The base station keeps one [`SpectrumModel`]: a table of smoothed retry-count
//! estimates, one per bucket of two adjacent radio channels. After every
//! transmission the radio stack reports how many retries the packet needed;
//! when a link has to hop (or a new link is set up) the radio ISR asks the
//! model for the channel least likely to be contested by Wi-Fi or other
//! wide-band interference.
//!
//! ## Modules
//!
//! - [`channel`]: validated `Channel` and `RetryCount` identifiers
//! - [`fixed_point`]: 16.16 filter coefficients and blending
//! - [`spectrum_model`]: the estimate table, update filter and channel scan
//! - [`entropy`]: the entropy source contract and its `WyRand` implementation
//! - [`spectrum_manager`]: queue, update task and critical-section sharing for firmware
//! - [`noise_simulator`]: synthetic interference profiles for tests and demos
//!
//! ## Features
//!
//! - `std` (default): host builds, embassy std drivers, tests
//! - `embedded`: static storage for the spectrum manager on firmware targets

#[cfg(all(feature = "std", feature = "embedded"))]
compile_error!("Features `std` and `embedded` are mutually exclusive");

#[cfg(all(not(test), not(any(feature = "std", feature = "embedded"))))]
compile_error!("At least one of the features `std` or `embedded` must be enabled");

pub mod channel;
pub mod entropy;
pub mod fixed_point;
pub mod noise_simulator;
pub mod spectrum_manager;
pub mod spectrum_model;

pub use channel::{Channel, RetryCount};
pub use entropy::{EntropySource, InterruptEntropy, WyRandEntropy};
pub use spectrum_manager::{RetryReport, SharedSpectrumModel, SpectrumManager, SpectrumManagerError};
pub use spectrum_model::SpectrumModel;

//Hardware dependent constants, supplied by the protocol and transmission layers

/// Highest legal nRF24 channel (f = 2400 MHz + channel)
pub const MAX_RF_CHANNEL: u8 = 125;

/// Auto-retransmit limit of the radio hardware
pub const MAX_HARDWARE_RETRIES: u32 = 15;

/// Software retry rounds the transmission layer runs on top of the hardware retries
pub const DEFAULT_SOFTWARE_RETRIES: u32 = 64;

/// Upper bound of any reported retry count
pub const MAX_RETRIES: u32 = MAX_HARDWARE_RETRIES * DEFAULT_SOFTWARE_RETRIES;

/// Raw channels presumed covered by one Wi-Fi-sized interferer
pub const WIFI_CH_WIDTH: u32 = 20;

//Derived constants

/// Number of raw channels
pub const CHANNEL_COUNT: usize = MAX_RF_CHANNEL as usize + 1;

/// Number of two-channel buckets in the spectrum model
pub const NUM_BUCKETS: usize = (MAX_RF_CHANNEL as usize >> 1) + 1;

const _: () = assert!(MAX_RETRIES <= u16::MAX as u32, "MAX_RETRIES must fit the 16-bit bucket storage");
const _: () = assert!(NUM_BUCKETS <= u8::MAX as usize, "bucket index must fit in a channel number");

//Constants that only affect efficiency, not compatibility

/// Retry reports buffered between the transmission path and the update task
const RETRY_REPORT_QUEUE_SIZE: usize = 16;

/// Errors raised when building identifiers from raw values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpectrumError {
    /// Channel number above `MAX_RF_CHANNEL`
    ChannelOutOfRange(u8),
    /// Retry count above `MAX_RETRIES`
    RetryCountOutOfRange(u32),
}

impl core::fmt::Display for SpectrumError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SpectrumError::ChannelOutOfRange(channel) => {
                write!(f, "channel {} out of range (max {})", channel, MAX_RF_CHANNEL)
            }
            SpectrumError::RetryCountOutOfRange(retry_count) => {
                write!(f, "retry count {} out of range (max {})", retry_count, MAX_RETRIES)
            }
        }
    }
}
