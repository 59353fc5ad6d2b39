use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::bands::{BandEdges, BAND_COUNT};
use super::window::MonthWindow;
use crate::storage::SampleRow;

/// A constant value held over `[timestamp, timestamp + duration_seconds)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogSample {
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: i64,
    pub value: f64,
}

impl LogSample {
    pub fn new(timestamp: DateTime<Utc>, duration_seconds: i64, value: f64) -> Self {
        Self {
            timestamp,
            duration_seconds,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedSample {
    #[error("missing duration")]
    MissingDuration,
    #[error("negative duration")]
    NegativeDuration,
    #[error("missing value")]
    MissingValue,
    #[error("non-finite value")]
    NonFiniteValue,
}

impl TryFrom<&SampleRow> for LogSample {
    type Error = MalformedSample;

    fn try_from(row: &SampleRow) -> Result<Self, Self::Error> {
        let duration_seconds = row.duration_seconds.ok_or(MalformedSample::MissingDuration)?;
        if duration_seconds < 0 {
            return Err(MalformedSample::NegativeDuration);
        }
        let value = row.value.ok_or(MalformedSample::MissingValue)?;
        if !value.is_finite() {
            return Err(MalformedSample::NonFiniteValue);
        }
        Ok(LogSample::new(row.timestamp, duration_seconds, value))
    }
}

/// Convert archive rows into samples, dropping malformed rows one by one.
///
/// The result is ordered by timestamp (stable, so equal timestamps keep
/// their archive order).
pub fn well_formed(rows: &[SampleRow]) -> Vec<LogSample> {
    let mut skipped = 0usize;
    let mut samples: Vec<LogSample> = rows
        .iter()
        .filter_map(|row| match LogSample::try_from(row) {
            Ok(sample) => Some(sample),
            Err(reason) => {
                skipped += 1;
                debug!(timestamp = %row.timestamp, %reason, "Skipping malformed sample");
                None
            }
        })
        .collect();

    if skipped > 0 {
        warn!(skipped, total = rows.len(), "Skipped malformed samples");
    }

    samples.sort_by_key(|sample| sample.timestamp);
    samples
}

/// Per-window output of [`allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Allocation {
    pub seconds_per_band: [u64; BAND_COUNT],
    /// Highest value among samples that covered part of the window, with its band.
    pub max: Option<(f64, usize)>,
}

impl Allocation {
    pub fn total_seconds(&self) -> u64 {
        self.seconds_per_band.iter().sum()
    }
}

/// Assign each sample's covered time inside `window` wholesale to the band
/// of its value.
///
/// Covered time is the part of `[timestamp, timestamp + duration)` that lies
/// in `[window.start, window.end + 1)`. Seconds already claimed by an earlier
/// sample are not counted again, but a sample hidden entirely under an
/// earlier one still competes for the month maximum. Samples must be ordered
/// by timestamp.
pub fn allocate(samples: &[LogSample], window: &MonthWindow, edges: &BandEdges) -> Allocation {
    let window_start = window.start.timestamp();
    let window_end_exclusive = window.end.timestamp() + 1;

    let mut seconds_per_band = [0u64; BAND_COUNT];
    let mut max: Option<(f64, usize)> = None;
    // End of the last counted interval; overlapping rows never count twice
    let mut cursor = window_start;

    for sample in samples {
        let begin = sample.timestamp.timestamp();
        let finish = begin.saturating_add(sample.duration_seconds);

        let from = begin.max(window_start);
        let to = finish.min(window_end_exclusive);
        if to <= from {
            continue;
        }

        let band = edges.band_of(sample.value);
        if max.map_or(true, |(current, _)| sample.value > current) {
            max = Some((sample.value, band));
        }

        let counted_from = from.max(cursor);
        if to > counted_from {
            seconds_per_band[band] += (to - counted_from) as u64;
            cursor = to;
        }
    }

    Allocation {
        seconds_per_band,
        max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn january() -> MonthWindow {
        MonthWindow::for_month(2024, 1, FixedOffset::east_opt(0).unwrap()).unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_single_sample_top_band() {
        let edges = BandEdges::from_max(1000.0);
        let samples = vec![LogSample::new(at(10, 0, 0), 3600, 950.0)];

        let alloc = allocate(&samples, &january(), &edges);

        let mut expected = [0u64; BAND_COUNT];
        expected[9] = 3600;
        assert_eq!(alloc.seconds_per_band, expected);
        assert_eq!(alloc.max, Some((950.0, 9)));
    }

    #[test]
    fn test_two_bands() {
        let edges = BandEdges::from_max(1000.0);
        let samples = vec![
            LogSample::new(at(1, 0, 0), 1800, 50.0),
            LogSample::new(at(1, 0, 30), 1800, 150.0),
        ];

        let alloc = allocate(&samples, &january(), &edges);
        assert_eq!(alloc.seconds_per_band[0], 1800);
        assert_eq!(alloc.seconds_per_band[1], 1800);
        assert_eq!(alloc.total_seconds(), 3600);
        assert_eq!(alloc.max, Some((150.0, 1)));
    }

    #[test]
    fn test_clipped_to_window() {
        let edges = BandEdges::from_max(100.0);
        let window = january();
        let samples = vec![
            // Starts an hour before the window
            LogSample::new(window.start - chrono::Duration::hours(1), 7200, 10.0),
            // Runs an hour past the window
            LogSample::new(window.end - chrono::Duration::seconds(3599), 7200, 95.0),
        ];

        let alloc = allocate(&samples, &window, &edges);
        assert_eq!(alloc.seconds_per_band[0], 3600);
        assert_eq!(alloc.seconds_per_band[9], 3600);
    }

    #[test]
    fn test_outside_and_zero_length_skipped() {
        let edges = BandEdges::from_max(100.0);
        let window = january();
        let samples = vec![
            LogSample::new(window.start - chrono::Duration::hours(2), 3600, 99.0),
            LogSample::new(at(5, 0, 0), 0, 99.0),
            LogSample::new(window.end + chrono::Duration::seconds(1), 60, 99.0),
        ];

        let alloc = allocate(&samples, &window, &edges);
        assert_eq!(alloc.total_seconds(), 0);
        // Samples with no coverage do not count toward the maximum
        assert_eq!(alloc.max, None);
    }

    #[test]
    fn test_sample_ending_at_window_start_covers_nothing() {
        let edges = BandEdges::from_max(100.0);
        let window = january();
        let samples = vec![
            LogSample::new(window.start - chrono::Duration::hours(1), 3600, 99.0),
            LogSample::new(at(10, 0, 0), 60, 20.0),
        ];

        let alloc = allocate(&samples, &window, &edges);
        assert_eq!(alloc.total_seconds(), 60);
        assert_eq!(alloc.max, Some((20.0, 1)));
    }

    #[test]
    fn test_last_second_of_window_counts() {
        let edges = BandEdges::from_max(100.0);
        let window = january();
        let samples = vec![LogSample::new(window.end, 3600, 50.0)];

        let alloc = allocate(&samples, &window, &edges);
        assert_eq!(alloc.total_seconds(), 1);
    }

    #[test]
    fn test_contained_sample_still_sets_maximum() {
        let edges = BandEdges::from_max(100.0);
        let samples = vec![
            LogSample::new(at(1, 0, 0), 3600, 10.0),
            // Lies entirely inside the first sample's interval
            LogSample::new(at(1, 0, 10), 60, 90.0),
            LogSample::new(at(1, 2, 0), 60, 30.0),
        ];

        let alloc = allocate(&samples, &january(), &edges);
        assert_eq!(alloc.seconds_per_band[0], 3600);
        assert_eq!(alloc.seconds_per_band[8], 0);
        assert_eq!(alloc.seconds_per_band[2], 60);
        assert_eq!(alloc.max, Some((90.0, 8)));
    }

    #[test]
    fn test_duration_not_split_across_bands() {
        let edges = BandEdges::from_max(100.0);
        let samples = vec![LogSample::new(at(2, 0, 0), 86_400, 35.0)];

        let alloc = allocate(&samples, &january(), &edges);
        assert_eq!(alloc.seconds_per_band[3], 86_400);
        assert_eq!(alloc.total_seconds(), 86_400);
    }

    #[test]
    fn test_overlap_not_double_counted() {
        let edges = BandEdges::from_max(100.0);
        let window = january();
        let samples = vec![
            LogSample::new(at(1, 0, 0), 3600, 10.0),
            // Starts halfway through the first sample
            LogSample::new(at(1, 0, 30), 3600, 90.0),
        ];

        let alloc = allocate(&samples, &window, &edges);
        assert_eq!(alloc.seconds_per_band[0], 3600);
        assert_eq!(alloc.seconds_per_band[8], 1800);
        assert_eq!(alloc.total_seconds(), 5400);
    }

    #[test]
    fn test_whole_window_bound() {
        let edges = BandEdges::from_max(10.0);
        let window = january();
        // A single row covering far more than the month
        let samples = vec![LogSample::new(
            window.start - chrono::Duration::days(40),
            200 * 86_400,
            5.0,
        )];

        let alloc = allocate(&samples, &window, &edges);
        assert_eq!(alloc.total_seconds() as i64, window.len_seconds());
    }

    #[test]
    fn test_first_maximum_wins() {
        let edges = BandEdges::from_max(100.0);
        let samples = vec![
            LogSample::new(at(1, 0, 0), 60, 80.0),
            LogSample::new(at(2, 0, 0), 60, 80.0),
        ];
        let alloc = allocate(&samples, &january(), &edges);
        assert_eq!(alloc.max, Some((80.0, 7)));
    }

    #[test]
    fn test_well_formed_skips_bad_rows() {
        let rows = vec![
            SampleRow::new(at(3, 0, 0), 60, 1.0),
            SampleRow {
                timestamp: at(1, 0, 0),
                duration_seconds: None,
                value: Some(1.0),
            },
            SampleRow {
                timestamp: at(1, 0, 0),
                duration_seconds: Some(60),
                value: None,
            },
            SampleRow::new(at(1, 0, 0), -5, 1.0),
            SampleRow::new(at(1, 0, 0), 60, f64::NAN),
            SampleRow::new(at(2, 0, 0), 60, 2.0),
        ];

        let samples = well_formed(&rows);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 2.0);
        assert_eq!(samples[1].value, 1.0);
    }

    #[test]
    fn test_malformed_reasons() {
        let row = SampleRow {
            timestamp: at(1, 0, 0),
            duration_seconds: Some(10),
            value: Some(f64::INFINITY),
        };
        assert_eq!(LogSample::try_from(&row), Err(MalformedSample::NonFiniteValue));
    }
}
