//! # Entropy Source - Random Numbers for Channel Selection
//!
//! The spectrum model never owns a random number generator. It consumes the
//! [`EntropySource`] capability instead, which keeps the PRNG (and any timing
//! entropy collection) an external collaborator.
//!
//! ## Interrupt Context
//!
//! Channel suggestion runs in interrupt context and uses a generator reserved
//! for that context. [`InterruptEntropy`] marks such a generator at the type
//! level: it is not `Clone`, and `SpectrumModel::suggest_channel` accepts only
//! this wrapper.
//!
//! ## Default Implementation
//!
//! [`WyRandEntropy`] is backed by `WyRand`. Timing entropy is gathered from the
//! embassy-time tick counter, whose low bits jitter with interrupt latency.

use embassy_time::Instant;
use log::log;
use rand_core::{RngCore, SeedableRng};
use rand_wyrand::WyRand;

/// Source of randomness consumed by the spectrum model
pub trait EntropySource {
    /// Mixes fresh hardware timing jitter into the generator state
    fn collect_timing_entropy(&mut self);

    /// Returns a uniformly distributed value in `0..=max`
    fn value_bounded(&mut self, max: u32) -> u32;

    /// Returns a raw random word; the low bit is usable for binary choices
    fn value(&mut self) -> u32;
}

/// `WyRand`-backed entropy source with tick-counter jitter mixing
pub struct WyRandEntropy {
    rng: WyRand,
}

impl WyRandEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: WyRand::seed_from_u64(seed),
        }
    }

    fn mix_ticks(&mut self, ticks: u64) {
        let mixed = self.rng.next_u64() ^ ticks.rotate_left(32) ^ ticks;
        self.rng = WyRand::seed_from_u64(mixed);
    }
}

/// `WyRandEntropy` fed from a counter instead of the tick clock
///
/// The seed fixes the whole stream, timing entropy included.
#[cfg(all(test, feature = "std"))]
pub(crate) struct CountingEntropy {
    inner: WyRandEntropy,
    ticks: u64,
}

#[cfg(all(test, feature = "std"))]
impl CountingEntropy {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            inner: WyRandEntropy::new(seed),
            ticks: 0,
        }
    }
}

#[cfg(all(test, feature = "std"))]
impl EntropySource for CountingEntropy {
    fn collect_timing_entropy(&mut self) {
        // Odd step so consecutive mixes never repeat a tick value
        self.ticks = self.ticks.wrapping_add(0x9E37_79B9);
        self.inner.mix_ticks(self.ticks);
    }

    fn value_bounded(&mut self, max: u32) -> u32 {
        self.inner.value_bounded(max)
    }

    fn value(&mut self) -> u32 {
        self.inner.value()
    }
}

impl EntropySource for WyRandEntropy {
    fn collect_timing_entropy(&mut self) {
        let ticks = Instant::now().as_ticks();
        self.mix_ticks(ticks);
        log!(log::Level::Trace, "Timing entropy collected at tick {}", ticks);
    }

    fn value_bounded(&mut self, max: u32) -> u32 {
        bounded(self.rng.next_u32(), max)
    }

    fn value(&mut self) -> u32 {
        self.rng.next_u32()
    }
}

/// Maps a raw word onto `0..=max` with one multiply and one shift
///
/// No rejection loop, so the cost is constant; the bias is at most
/// `(max + 1) / 2^32`.
pub(crate) const fn bounded(raw: u32, max: u32) -> u32 {
    if max == u32::MAX {
        return raw;
    }
    (((raw as u64) * (max as u64 + 1)) >> 32) as u32
}

/// Entropy source reserved for interrupt context
///
/// Wraps the generator instance that only the radio ISR may use. Not `Clone`:
/// exactly one handle exists per generator.
pub struct InterruptEntropy<E: EntropySource> {
    source: E,
}

impl<E: EntropySource> InterruptEntropy<E> {
    pub const fn new(source: E) -> Self {
        Self { source }
    }

    /// Gives the wrapped generator back
    pub fn into_inner(self) -> E {
        self.source
    }

    pub(crate) fn source(&mut self) -> &mut E {
        &mut self.source
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn bounded_covers_both_ends() {
        assert_eq!(bounded(0, 62), 0);
        assert_eq!(bounded(u32::MAX, 62), 62);
        assert_eq!(bounded(u32::MAX, 0), 0);
        assert_eq!(bounded(12345, u32::MAX), 12345);
    }

    #[test]
    fn value_bounded_stays_in_range() {
        let mut entropy = WyRandEntropy::new(42);
        for max in [0u32, 1, 2, 62, 125, 1000] {
            for _ in 0..1000 {
                assert!(entropy.value_bounded(max) <= max);
            }
        }
    }

    #[test]
    fn value_bounded_hits_every_value() {
        let mut entropy = WyRandEntropy::new(7);
        let mut seen = [false; 63];
        for _ in 0..10_000 {
            seen[entropy.value_bounded(62) as usize] = true;
        }
        assert!(seen.iter().all(|&hit| hit), "some values never drawn: {:?}", seen);
    }

    #[test]
    fn same_seed_gives_same_stream_without_timing_entropy() {
        let mut a = WyRandEntropy::new(99);
        let mut b = WyRandEntropy::new(99);
        for _ in 0..16 {
            assert_eq!(a.value(), b.value());
        }
    }

    #[test]
    fn timing_entropy_changes_the_stream() {
        let mut a = WyRandEntropy::new(99);
        let mut b = WyRandEntropy::new(99);
        b.collect_timing_entropy();
        let diverged = (0..16).any(|_| a.value() != b.value());
        assert!(diverged);
    }

    #[test]
    fn counting_entropy_is_reproducible_across_timing_collection() {
        let mut a = CountingEntropy::new(17);
        let mut b = CountingEntropy::new(17);
        for _ in 0..32 {
            a.collect_timing_entropy();
            b.collect_timing_entropy();
            assert_eq!(a.value_bounded(62), b.value_bounded(62));
            assert_eq!(a.value(), b.value());
        }
    }

    #[test]
    fn counting_entropy_mixing_changes_the_stream() {
        let mut plain = WyRandEntropy::new(17);
        let mut mixed = CountingEntropy::new(17);
        mixed.collect_timing_entropy();
        let diverged = (0..16).any(|_| plain.value() != mixed.value());
        assert!(diverged);
    }

    #[test]
    fn low_bit_is_balanced() {
        let mut entropy = WyRandEntropy::new(3);
        let ones = (0..10_000).filter(|_| entropy.value() & 1 == 1).count();
        assert!((4_500..=5_500).contains(&ones), "ones: {}", ones);
    }

    #[test]
    fn interrupt_entropy_wraps_and_returns_the_source() {
        let mut isr = InterruptEntropy::new(WyRandEntropy::new(5));
        let first = isr.source().value();
        let mut reference = WyRandEntropy::new(5);
        assert_eq!(first, reference.value());
        let mut inner = isr.into_inner();
        assert_eq!(inner.value(), reference.value());
    }
}
