//! # Spectrum Model - Per-Bucket Noise Estimates and Channel Suggestion
//!
//! This module keeps a smoothed noise estimate for every bucket of two adjacent
//! radio channels and uses it to suggest the channel least likely to be
//! contested by external interference such as Wi-Fi.
//!
//! ## Estimates
//!
//! Each bucket holds a 16-bit estimate of the retry count a transmission on its
//! channels would currently need (`0..=MAX_RETRIES` in practice). A zeroed
//! table means "no known noise anywhere".
//!
//! ## Update Filter
//!
//! Every observation runs through the whole table in one pass:
//! - **Temporal smoothing**: at the sampled bucket the estimate moves toward
//!   the observed retry count with gain 0.7 (single-pole moving average).
//! - **Spatial smoothing**: neighbouring buckets are blended with a scale
//!   factor that falls off linearly with bucket distance, since one wide-band
//!   interferer covers several narrow channels.
//!
//! The cost is `O(NUM_BUCKETS)` for every update.
//!
//! ## Channel Suggestion
//!
//! A circular scan from a random starting bucket picks the quietest bucket.
//! Ties keep the first bucket seen, so the random start spreads base stations
//! across equally quiet channels. With an empty table the result is a
//! uniformly random channel.
//!
//! ## Execution Contexts
//!
//! `update` runs in task context after a transmission completes;
//! `suggest_channel` runs in interrupt context. Both take `&mut self`, and
//! the suggestion additionally requires the interrupt-reserved
//! [`InterruptEntropy`] handle. Neither blocks nor allocates.

use log::log;

use crate::NUM_BUCKETS;
use crate::channel::{Channel, RetryCount};
use crate::entropy::{EntropySource, InterruptEntropy};
use crate::fixed_point::{blend, scale_factor};

/// Smoothed noise estimates for every channel bucket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpectrumModel {
    buckets: [u16; NUM_BUCKETS],
}

impl Default for SpectrumModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumModel {
    /// Creates a model with no known noise on any channel
    pub const fn new() -> Self {
        Self { buckets: [0; NUM_BUCKETS] }
    }

    /// Discards all accumulated history
    pub fn init(&mut self) {
        self.buckets = [0; NUM_BUCKETS];
        log!(log::Level::Debug, "Spectrum model cleared");
    }

    /// Folds one observed retry count on `channel` into the estimates
    ///
    /// Every bucket is re-blended toward `retry_count`, weighted by its
    /// distance from the sampled bucket. Buckets beyond the interference
    /// radius get a zero weight and keep their value.
    ///
    /// # Example
    /// ```rust
    /// use radio_spectrum_lib::{Channel, RetryCount, SpectrumModel};
    ///
    /// let mut model = SpectrumModel::new();
    /// let channel = Channel::new(40).unwrap();
    /// model.update(channel, RetryCount::new(500).unwrap());
    /// assert!(model.energy(channel) > 0);
    /// ```
    pub fn update(&mut self, channel: Channel, retry_count: RetryCount) {
        let center = channel.bucket();
        debug_assert!(center < NUM_BUCKETS);

        for (index, estimate) in self.buckets.iter_mut().enumerate() {
            let sf = scale_factor(index.abs_diff(center) as u32);
            *estimate = blend(*estimate, retry_count.value(), sf);
        }

        log!(
            log::Level::Trace,
            "Spectrum update: {} retries: {} estimate: {}",
            channel,
            retry_count.value(),
            self.buckets[center]
        );
    }

    /// Current noise estimate of `channel`'s bucket
    pub fn energy(&self, channel: Channel) -> u32 {
        self.buckets[channel.bucket()] as u32
    }

    /// Suggests the channel least likely to be contested
    ///
    /// Scans every bucket exactly once starting at a random index and returns
    /// a channel from the first bucket with the lowest estimate. Which of the
    /// bucket's two channels is returned is decided by one random bit.
    ///
    /// Only for interrupt context: `entropy` must be the generator reserved for
    /// the radio ISR. Runs in `NUM_BUCKETS` steps and always yields a channel.
    pub fn suggest_channel<E: EntropySource>(&mut self, entropy: &mut InterruptEntropy<E>) -> Channel {
        let source = entropy.source();
        source.collect_timing_entropy();

        let start = source.value_bounded(NUM_BUCKETS as u32 - 1) as usize;
        let mut best_bucket = start;
        let mut best_estimate = self.buckets[start];

        for step in 1..NUM_BUCKETS {
            let bucket = (start + step) % NUM_BUCKETS;
            if self.buckets[bucket] < best_estimate {
                best_estimate = self.buckets[bucket];
                best_bucket = bucket;
            }
        }

        let channel = Channel::from_bucket(best_bucket, source.value() & 1 == 1);
        debug_assert!(channel.value() <= crate::MAX_RF_CHANNEL);

        log!(
            log::Level::Trace,
            "Suggested {} (bucket {} estimate {}, scan started at {})",
            channel,
            best_bucket,
            best_estimate,
            start
        );
        channel
    }
}
