//! Seconds-per-band to percentages that always total exactly 100.00.
//!
//! Shares are computed in integer hundredths of a percent so rounding is
//! exact and reproducible: every nonzero band is rounded *up* (so it never
//! shows as 0.00%), and the surplus this creates is taken off the largest
//! band afterwards.

use super::bands::BAND_COUNT;

/// 100.00% expressed in hundredths.
pub const FULL_HUNDREDTHS: u32 = 10_000;

/// Normalize band totals into hundredths of a percent.
///
/// Returns all zeros when no time was allocated at all.
pub fn normalize_hundredths(seconds_per_band: &[u64; BAND_COUNT]) -> [u32; BAND_COUNT] {
    let total: u128 = seconds_per_band.iter().map(|&s| s as u128).sum();
    let mut out = [0u32; BAND_COUNT];
    if total == 0 {
        return out;
    }

    // ceil(10000 * s / total); any nonzero share is at least one hundredth
    for (slot, &seconds) in out.iter_mut().zip(seconds_per_band.iter()) {
        if seconds == 0 {
            continue;
        }
        let scaled = seconds as u128 * FULL_HUNDREDTHS as u128;
        let rounded_up = (scaled + total - 1) / total;
        *slot = rounded_up.clamp(1, FULL_HUNDREDTHS as u128) as u32;
    }

    let rounded_sum: i64 = out.iter().map(|&h| h as i64).sum();
    let diff = FULL_HUNDREDTHS as i64 - rounded_sum;
    if diff != 0 {
        let dominant = dominant_band(&out);
        let corrected = (out[dominant] as i64 + diff).clamp(0, FULL_HUNDREDTHS as i64);
        out[dominant] = corrected as u32;
    }

    out
}

/// Normalize band totals into percentages with two decimals.
pub fn normalize(seconds_per_band: &[u64; BAND_COUNT]) -> [f64; BAND_COUNT] {
    to_percent(&normalize_hundredths(seconds_per_band))
}

pub fn to_percent(hundredths: &[u32; BAND_COUNT]) -> [f64; BAND_COUNT] {
    let mut out = [0.0; BAND_COUNT];
    for (slot, &h) in out.iter_mut().zip(hundredths.iter()) {
        *slot = h as f64 / 100.0;
    }
    out
}

/// First band holding the largest share.
fn dominant_band(hundredths: &[u32; BAND_COUNT]) -> usize {
    let mut best = 0;
    for (i, &h) in hundredths.iter().enumerate().skip(1) {
        if h > hundredths[best] {
            best = i;
        }
    }
    best
}
