//! 16.16 fixed-point helpers for the spectrum filter
//!
//! All filter coefficients live in 16.16 fixed point (`ONE = 1 << 16`). Stored
//! bucket estimates are plain integers: every blend is shifted back down by
//! `FRACTIONAL_BITS` before it is written to the table.

use crate::{MAX_RETRIES, WIFI_CH_WIDTH};

/// Number of fractional bits in the filter coefficients
pub const FRACTIONAL_BITS: u32 = 16;

/// 1.0 in 16.16 fixed point
pub const ONE: u32 = 1 << FRACTIONAL_BITS;

/// Filter gain at the sampled bucket (0.7)
///
/// Weight given to a fresh observation against the previous estimate.
pub const GAIN: u32 = ONE * 7 / 10;

/// Linear scale factor falloff per bucket of distance from the sample
///
/// `MAX_RETRIES / WIFI_CH_WIDTH` in 16.16. This is a tuning constant; it mixes
/// a retry-count unit with a channel-count unit.
pub const DECAY_PER_BUCKET: u32 = MAX_RETRIES * ONE / WIFI_CH_WIDTH;

/// First bucket distance at which the scale factor reaches zero
pub const INTERFERENCE_RADIUS: u32 = GAIN.div_ceil(DECAY_PER_BUCKET);

const _: () = assert!(GAIN < ONE, "GAIN must stay below 1.0");
const _: () = assert!(DECAY_PER_BUCKET > 0, "DECAY_PER_BUCKET must be positive");
const _: () = assert!(
    (MAX_RETRIES as u64) * (ONE as u64) <= u32::MAX as u64,
    "MAX_RETRIES * ONE must fit in u32"
);

/// Scale factor for a bucket `distance` buckets away from the sampled one
///
/// `max(GAIN - distance * DECAY_PER_BUCKET, 0)`, so `scale_factor(0) == GAIN`.
pub const fn scale_factor(distance: u32) -> u32 {
    let falloff = distance.saturating_mul(DECAY_PER_BUCKET);
    if falloff >= GAIN { 0 } else { GAIN - falloff }
}

/// Blends `sample` into `old` with weight `sf` (16.16)
///
/// Computes `(old * (ONE - sf) + sample * sf) >> 16` with a 64-bit
/// intermediate. The result lies between `old` and `sample`, so it always
/// fits back into 16-bit storage while `sample <= u16::MAX`.
pub const fn blend(old: u16, sample: u32, sf: u32) -> u16 {
    debug_assert!(sf <= ONE);
    let mixed = (old as u64) * ((ONE - sf) as u64) + (sample as u64) * (sf as u64);
    (mixed >> FRACTIONAL_BITS) as u16
}
