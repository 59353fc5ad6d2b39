//! Property-based tests for band edges, allocation and normalization.
//!
//! Uses proptest to check the invariants hold across many random inputs.

use chrono::{Duration, FixedOffset, TimeZone, Utc};
use powerband::analysis::{
    allocate, normalize, normalize_hundredths, BandEdges, LogSample, MonthWindow, BAND_COUNT,
    FULL_HUNDREDTHS,
};
use proptest::prelude::*;

fn january() -> MonthWindow {
    MonthWindow::for_month(2024, 1, FixedOffset::east_opt(0).unwrap()).unwrap()
}

/// Samples as (offset from Jan 1 in seconds, duration, value), sorted by time.
fn samples_strategy() -> impl Strategy<Value = Vec<LogSample>> {
    prop::collection::vec(
        (-86_400i64..32 * 86_400, 0i64..200_000, 0.0..1000.0f64),
        0..50,
    )
    .prop_map(|raw| {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut samples: Vec<LogSample> = raw
            .into_iter()
            .map(|(offset, duration, value)| {
                LogSample::new(base + Duration::seconds(offset), duration, value)
            })
            .collect();
        samples.sort_by_key(|s| s.timestamp);
        samples
    })
}

// ============================================================================
// Band edges
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Edges ascend and the top edge is exactly the maximum.
    #[test]
    fn edges_ascend_to_max(max in 0.001..1_000_000.0f64) {
        let edges = BandEdges::from_max(max);
        let slice = edges.as_slice();
        prop_assert_eq!(slice.len(), BAND_COUNT);
        for pair in slice.windows(2) {
            prop_assert!(pair[0] <= pair[1], "edges not ascending: {:?}", slice);
        }
        prop_assert_eq!(slice[BAND_COUNT - 1], max);
    }

    /// A larger value never lands in a lower band.
    #[test]
    fn band_of_is_monotone(max in 0.001..100_000.0f64, a in -10.0..200_000.0f64, b in -10.0..200_000.0f64) {
        let edges = BandEdges::from_max(max);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(edges.band_of(lo) <= edges.band_of(hi));
    }

    /// A value within (0, max] falls between its band's bounds.
    #[test]
    fn band_contains_value(max in 0.001..100_000.0f64, fraction in 0.0001..=1.0f64) {
        let edges = BandEdges::from_max(max);
        let value = (max * fraction).min(max);
        let band = edges.band_of(value);
        prop_assert!(value <= edges.upper(band));
        prop_assert!(value > edges.lower(band) || band == 0);
    }
}

// ============================================================================
// Allocation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Allocated time never exceeds the window length, even with overlaps.
    #[test]
    fn allocation_bounded_by_window(samples in samples_strategy()) {
        let window = january();
        let allocation = allocate(&samples, &window, &BandEdges::from_max(1000.0));
        prop_assert!(allocation.total_seconds() <= window.len_seconds() as u64);
    }

    /// The reported maximum sits in the band its value maps to, and exists
    /// exactly when some time was allocated.
    #[test]
    fn allocation_max_band_matches(samples in samples_strategy()) {
        let edges = BandEdges::from_max(1000.0);
        let allocation = allocate(&samples, &january(), &edges);
        if let Some((value, band)) = allocation.max {
            prop_assert_eq!(edges.band_of(value), band);
            prop_assert!(allocation.total_seconds() > 0);
        } else {
            prop_assert_eq!(allocation.total_seconds(), 0);
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Hundredths total exactly 100.00% whenever any time was allocated.
    #[test]
    fn hundredths_sum_to_full(seconds in prop::array::uniform10(0u64..1_000_000_000)) {
        let hundredths = normalize_hundredths(&seconds);
        let sum: u32 = hundredths.iter().sum();
        if seconds.iter().any(|&s| s > 0) {
            prop_assert_eq!(sum, FULL_HUNDREDTHS);
        } else {
            prop_assert_eq!(sum, 0);
        }
    }

    /// Bands without time stay at zero; bands with time never show zero.
    #[test]
    fn nonzero_bands_stay_visible(seconds in prop::array::uniform10(0u64..1_000_000)) {
        let hundredths = normalize_hundredths(&seconds);
        for (s, h) in seconds.iter().zip(hundredths.iter()) {
            if *s == 0 {
                prop_assert_eq!(*h, 0);
            } else {
                prop_assert!(*h >= 1);
            }
        }
    }

    /// Percentages carry at most two decimals.
    #[test]
    fn percent_has_two_decimals(seconds in prop::array::uniform10(0u64..1_000_000)) {
        for p in normalize(&seconds) {
            let scaled = p * 100.0;
            prop_assert!((scaled - scaled.round()).abs() < 1e-6);
            prop_assert!((0.0..=100.0).contains(&p));
        }
    }
}
