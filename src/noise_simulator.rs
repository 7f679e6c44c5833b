//! # Noise Simulator - Synthetic Interference for Testing
//!
//! Generates retry counts from a known per-channel noise profile, so the
//! spectrum model can be exercised without radio hardware. Used by the
//! convergence tests and the std demo.
//!
//! ## Noise Profile
//!
//! A [`NoiseProfile`] stores the true mean retry count of every raw channel.
//! Typical profiles are a quiet floor with one or more bands of Wi-Fi-like
//! interference raised on top of it.
//!
//! ## Sampling
//!
//! Each observation is `mean ± jitter`, drawn uniformly and clamped to
//! `0..=MAX_RETRIES`. All arithmetic is integer, so runs are reproducible
//! from the seed alone.

use log::log;
use rand_core::{RngCore, SeedableRng};
use rand_wyrand::WyRand;

use crate::channel::{Channel, RetryCount};
use crate::entropy::bounded;
use crate::spectrum_model::SpectrumModel;
use crate::{CHANNEL_COUNT, MAX_RETRIES, MAX_RF_CHANNEL};

/// True mean retry count for every raw channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoiseProfile {
    mean_retries: [u16; CHANNEL_COUNT],
}

impl NoiseProfile {
    /// Every channel has the same mean retry count (clamped to `MAX_RETRIES`)
    pub const fn uniform(mean: u16) -> Self {
        Self {
            mean_retries: [clamp_mean(mean); CHANNEL_COUNT],
        }
    }

    /// Raises the inclusive channel range `first..=last` to `mean`
    ///
    /// # Example
    /// ```rust
    /// use radio_spectrum_lib::Channel;
    /// use radio_spectrum_lib::noise_simulator::NoiseProfile;
    ///
    /// let wifi = NoiseProfile::uniform(100).with_band(Channel::new(4).unwrap(), Channel::new(7).unwrap(), 900);
    /// assert_eq!(wifi.mean(Channel::new(5).unwrap()), 900);
    /// assert_eq!(wifi.mean(Channel::new(8).unwrap()), 100);
    /// ```
    pub fn with_band(mut self, first: Channel, last: Channel, mean: u16) -> Self {
        let (low, high) = if first <= last { (first, last) } else { (last, first) };
        for slot in &mut self.mean_retries[low.value() as usize..=high.value() as usize] {
            *slot = clamp_mean(mean);
        }
        self
    }

    /// True mean retry count of `channel`
    pub fn mean(&self, channel: Channel) -> u32 {
        self.mean_retries[channel.value() as usize] as u32
    }
}

const fn clamp_mean(mean: u16) -> u16 {
    if mean as u32 > MAX_RETRIES { MAX_RETRIES as u16 } else { mean }
}

/// Draws jittered retry counts from a [`NoiseProfile`]
pub struct NoiseSimulator {
    profile: NoiseProfile,
    jitter: u16,
    rng: WyRand,
}

impl NoiseSimulator {
    /// Creates a simulator
    ///
    /// # Arguments
    /// * `profile` - True per-channel mean retry counts
    /// * `jitter` - Maximum deviation of one observation from the mean
    /// * `rng_seed` - Seed for observation noise and channel choice
    pub fn new(profile: NoiseProfile, jitter: u16, rng_seed: u64) -> Self {
        Self {
            profile,
            jitter,
            rng: WyRand::seed_from_u64(rng_seed),
        }
    }

    pub fn profile(&self) -> &NoiseProfile {
        &self.profile
    }

    /// One noisy observation on `channel`
    pub fn sample(&mut self, channel: Channel) -> RetryCount {
        let mean = self.profile.mean(channel) as i64;
        let jitter = self.jitter as i64;
        let offset = bounded(self.rng.next_u32(), 2 * self.jitter as u32) as i64 - jitter;
        let observed = (mean + offset).clamp(0, MAX_RETRIES as i64);
        RetryCount::saturating(observed as u32)
    }

    /// A uniformly random legal channel
    pub fn random_channel(&mut self) -> Channel {
        Channel::new(bounded(self.rng.next_u32(), MAX_RF_CHANNEL as u32) as u8).unwrap_or(Channel::MAX)
    }

    /// Picks a random channel and feeds `observations` samples of it into `model`
    ///
    /// Returns the channel that was sampled.
    pub fn feed(&mut self, model: &mut SpectrumModel, observations: usize) -> Channel {
        let channel = self.random_channel();
        for _ in 0..observations {
            let retry_count = self.sample(channel);
            model.update(channel, retry_count);
        }
        log!(
            log::Level::Trace,
            "Simulated {} observations on {} (true mean {})",
            observations,
            channel,
            self.profile.mean(channel)
        );
        channel
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    fn ch(raw: u8) -> Channel {
        Channel::new(raw).unwrap()
    }

    #[test]
    fn uniform_profile_clamps_to_max_retries() {
        let profile = NoiseProfile::uniform(u16::MAX);
        assert!(Channel::all().all(|c| profile.mean(c) == MAX_RETRIES));
    }

    #[test]
    fn band_accepts_reversed_bounds() {
        let a = NoiseProfile::uniform(0).with_band(ch(10), ch(20), 300);
        let b = NoiseProfile::uniform(0).with_band(ch(20), ch(10), 300);
        assert_eq!(a, b);
        assert_eq!(a.mean(ch(9)), 0);
        assert_eq!(a.mean(ch(10)), 300);
        assert_eq!(a.mean(ch(20)), 300);
        assert_eq!(a.mean(ch(21)), 0);
    }

    #[test]
    fn samples_stay_within_jitter_of_mean() {
        let profile = NoiseProfile::uniform(100).with_band(ch(4), ch(7), 900);
        let mut simulator = NoiseSimulator::new(profile, 50, 1);
        for _ in 0..1_000 {
            let quiet = simulator.sample(ch(30)).value();
            assert!((50..=150).contains(&quiet), "quiet sample {}", quiet);
            let peak = simulator.sample(ch(5)).value();
            assert!((850..=950).contains(&peak), "peak sample {}", peak);
        }
    }

    #[test]
    fn samples_clamp_at_zero_and_max() {
        let low = NoiseProfile::uniform(10);
        let mut simulator = NoiseSimulator::new(low, 50, 2);
        let mut saw_zero = false;
        for _ in 0..1_000 {
            let sample = simulator.sample(ch(0)).value();
            assert!(sample <= 60);
            saw_zero |= sample == 0;
        }
        assert!(saw_zero);

        let high = NoiseProfile::uniform(MAX_RETRIES as u16);
        let mut simulator = NoiseSimulator::new(high, 50, 3);
        for _ in 0..1_000 {
            let sample = simulator.sample(ch(0)).value();
            assert!(sample >= MAX_RETRIES - 50 && sample <= MAX_RETRIES);
        }
    }

    #[test]
    fn zero_jitter_returns_the_mean() {
        let mut simulator = NoiseSimulator::new(NoiseProfile::uniform(321), 0, 4);
        assert!((0..100).all(|_| simulator.sample(ch(60)).value() == 321));
    }

    #[test]
    fn simulator_keeps_the_profile_it_was_built_with() {
        let profile = NoiseProfile::uniform(80).with_band(ch(20), ch(39), 600);
        let simulator = NoiseSimulator::new(profile.clone(), 10, 9);
        assert!(Channel::all().all(|c| simulator.profile().mean(c) == profile.mean(c)));
        assert_eq!(simulator.profile().mean(ch(19)), 80);
        assert_eq!(simulator.profile().mean(ch(30)), 600);
    }

    #[test]
    fn feed_updates_the_sampled_channel() {
        let mut simulator = NoiseSimulator::new(NoiseProfile::uniform(500), 0, 5);
        let mut model = SpectrumModel::new();
        let channel = simulator.feed(&mut model, 5);
        assert!(model.energy(channel) > 400);
    }

    #[test]
    fn random_channel_is_always_legal() {
        let mut simulator = NoiseSimulator::new(NoiseProfile::uniform(0), 0, 6);
        assert!((0..10_000).all(|_| simulator.random_channel().value() <= MAX_RF_CHANNEL));
    }
}
