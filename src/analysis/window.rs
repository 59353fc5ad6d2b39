use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use super::AnalysisError;

/// One calendar month, as inclusive second boundaries.
///
/// `start` is the first second of the month and `end` the last one, both in
/// the offset the window was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    /// Window for the given calendar month in `offset`.
    pub fn for_month(year: i32, month: u32, offset: FixedOffset) -> Result<Self, AnalysisError> {
        let start = local_midnight(NaiveDate::from_ymd_opt(year, month, 1), offset)?;
        let (next_year, next_month) = next_month(year, month);
        let next_start = local_midnight(NaiveDate::from_ymd_opt(next_year, next_month, 1), offset)?;

        Ok(Self {
            year,
            month,
            start,
            end: next_start - chrono::Duration::seconds(1),
        })
    }

    /// Window of the month that contains `instant` in `offset`.
    pub fn containing(instant: DateTime<Utc>, offset: FixedOffset) -> Result<Self, AnalysisError> {
        let local = instant.with_timezone(&offset);
        Self::for_month(local.year(), local.month(), offset)
    }

    /// The month immediately before this one.
    pub fn previous(&self, offset: FixedOffset) -> Result<Self, AnalysisError> {
        let (year, month) = if self.month == 1 {
            (self.year - 1, 12)
        } else {
            (self.year, self.month - 1)
        };
        Self::for_month(year, month, offset)
    }

    /// Number of seconds covered, counting both boundaries.
    pub fn len_seconds(&self) -> i64 {
        self.end.timestamp() - self.start.timestamp() + 1
    }

    /// `YYYY-MM` label.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn local_midnight(date: Option<NaiveDate>, offset: FixedOffset) -> Result<DateTime<Utc>, AnalysisError> {
    date.and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| naive.and_local_timezone(offset).single())
        .map(|local| local.with_timezone(&Utc))
        .ok_or(AnalysisError::WindowOutOfRange)
}

/// Longest history a single run may cover (100 years).
pub const MAX_MONTHS: u32 = 1200;

/// `month_count` consecutive windows, oldest first, ending with the month
/// that contains `now`. The current month is included even though it has
/// not finished yet. Counts above [`MAX_MONTHS`] are rejected.
pub fn build_month_windows(
    month_count: u32,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Vec<MonthWindow>, AnalysisError> {
    if month_count > MAX_MONTHS {
        return Err(AnalysisError::WindowOutOfRange);
    }
    let count = month_count.max(1) as usize;
    let mut windows = Vec::new();

    let mut current = MonthWindow::containing(now, offset)?;
    windows.push(current);
    while windows.len() < count {
        current = current.previous(offset)?;
        windows.push(current);
    }

    windows.reverse();
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_month_bounds_utc() {
        let w = MonthWindow::for_month(2024, 1, utc()).unwrap();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap());
        assert_eq!(w.len_seconds(), 31 * 86_400);
        assert_eq!(w.label(), "2024-01");
    }

    #[test]
    fn test_leap_february() {
        let w = MonthWindow::for_month(2024, 2, utc()).unwrap();
        assert_eq!(w.len_seconds(), 29 * 86_400);
        let w = MonthWindow::for_month(2023, 2, utc()).unwrap();
        assert_eq!(w.len_seconds(), 28 * 86_400);
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let w = MonthWindow::for_month(2023, 12, utc()).unwrap();
        assert_eq!(w.end, Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_offset_shifts_boundaries() {
        let cet = FixedOffset::east_opt(3600).unwrap();
        let w = MonthWindow::for_month(2024, 3, cet).unwrap();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 3, 31, 22, 59, 59).unwrap());
    }

    #[test]
    fn test_containing_uses_local_calendar() {
        // 23:30 UTC on Jan 31 is already February at +01:00
        let cet = FixedOffset::east_opt(3600).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        let w = MonthWindow::containing(now, cet).unwrap();
        assert_eq!((w.year, w.month), (2024, 2));
    }

    #[test]
    fn test_build_windows_walks_backward() {
        let now = Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap();
        let windows = build_month_windows(4, now, utc()).unwrap();

        let labels: Vec<String> = windows.iter().map(|w| w.label()).collect();
        assert_eq!(labels, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);

        // Consecutive, no gaps
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end + chrono::Duration::seconds(1), pair[1].start);
        }
    }

    #[test]
    fn test_build_windows_at_least_one() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let windows = build_month_windows(0, now, utc()).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].label(), "2024-06");
    }

    #[test]
    fn test_build_windows_rejects_excessive_count() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(build_month_windows(MAX_MONTHS, now, utc()).unwrap().len(), 1200);
        assert!(matches!(
            build_month_windows(MAX_MONTHS + 1, now, utc()),
            Err(AnalysisError::WindowOutOfRange)
        ));
        assert!(matches!(
            build_month_windows(u32::MAX, now, utc()),
            Err(AnalysisError::WindowOutOfRange)
        ));
    }
}
