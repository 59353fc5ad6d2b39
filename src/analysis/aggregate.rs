use chrono::{DateTime, FixedOffset, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::allocate::{allocate, well_formed};
use super::bands::{BandEdges, BAND_COUNT};
use super::normalize::{normalize_hundredths, to_percent};
use super::scan::scan_max;
use super::stats::{describe, DescriptiveStats};
use super::window::{build_month_windows, MonthWindow};
use super::AnalysisError;
use crate::storage::SampleSource;

/// What to analyze. Built from the loaded configuration or by embedding code.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub series_id: String,
    pub month_count: u32,
    pub utc_offset: FixedOffset,
}

/// Band allocation of one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthResult {
    pub seconds_per_band: [u64; BAND_COUNT],
    pub hundredths_per_band: [u32; BAND_COUNT],
    pub percent_per_band: [f64; BAND_COUNT],
    pub max_value: f64,
    pub max_band: usize,
}

impl MonthResult {
    pub fn zeroed() -> Self {
        Self {
            seconds_per_band: [0; BAND_COUNT],
            hundredths_per_band: [0; BAND_COUNT],
            percent_per_band: [0.0; BAND_COUNT],
            max_value: 0.0,
            max_band: 0,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.seconds_per_band.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The sample read for this month failed.
    FetchFailed,
    /// The month had no well-formed samples.
    NoSamples,
    /// Samples existed but none covered any second of the month.
    NoCoverage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MonthOutcome {
    Empty { reason: EmptyReason },
    Computed(MonthResult),
}

impl MonthOutcome {
    /// The allocation, or an all-zero one for an empty month.
    pub fn result(&self) -> MonthResult {
        match self {
            MonthOutcome::Empty { .. } => MonthResult::zeroed(),
            MonthOutcome::Computed(result) => result.clone(),
        }
    }

    pub fn computed(&self) -> Option<&MonthResult> {
        match self {
            MonthOutcome::Computed(result) => Some(result),
            MonthOutcome::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MonthOutcome::Empty { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthReport {
    pub window: MonthWindow,
    pub outcome: MonthOutcome,
    pub descriptive: DescriptiveStats,
}

/// Location of the single highest covered sample across all months.
///
/// `value` can be below the reference maximum: the scan also sees rows that
/// cover no second of any month (zero-length rows), which never reach a
/// month's allocation. `band_index` may hold no counted time when the sample
/// lay entirely under an earlier, overlapping one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalMaxPointer {
    pub month_index: usize,
    pub band_index: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeResult {
    pub series_id: String,
    pub global_max: f64,
    pub edges: BandEdges,
    /// Oldest month first.
    pub months: Vec<MonthReport>,
    pub global_max_pointer: Option<GlobalMaxPointer>,
}

impl ComputeResult {
    pub fn latest(&self) -> Option<&MonthReport> {
        self.months.last()
    }
}

/// Recompute the monthly band distribution of a series.
///
/// Fails only when the series does not resolve; per-month read failures
/// degrade that month to [`MonthOutcome::Empty`].
pub async fn compute(
    source: &dyn SampleSource,
    request: &AnalysisRequest,
    now: DateTime<Utc>,
) -> Result<ComputeResult, AnalysisError> {
    let series_id = request.series_id.as_str();
    if series_id.trim().is_empty() || !source.series_exists(series_id).await? {
        return Err(AnalysisError::InvalidSeriesReference(series_id.to_string()));
    }

    let windows = build_month_windows(request.month_count, now, request.utc_offset)?;
    info!(
        series_id,
        months = windows.len(),
        first = %windows[0].label(),
        "Computing band distribution"
    );

    // The reference maximum is settled before any band assignment happens
    let global_max = scan_max(source, series_id, &windows).await;
    let edges = BandEdges::from_max(global_max);
    debug!(global_max, "Band edges derived");

    let months = join_all(
        windows
            .iter()
            .map(|window| compute_month(source, series_id, window, &edges, request.utc_offset)),
    )
    .await;

    let global_max_pointer = locate_global_max(&months);

    info!(
        series_id,
        global_max,
        empty_months = months.iter().filter(|m| m.outcome.is_empty()).count(),
        "Band distribution computed"
    );

    Ok(ComputeResult {
        series_id: series_id.to_string(),
        global_max,
        edges,
        months,
        global_max_pointer,
    })
}

async fn compute_month(
    source: &dyn SampleSource,
    series_id: &str,
    window: &MonthWindow,
    edges: &BandEdges,
    offset: FixedOffset,
) -> MonthReport {
    let (samples, hourly) = futures::join!(
        source.read_log_samples(series_id, window.start, window.end),
        source.read_hourly_aggregates(series_id, window.start, window.end),
    );

    let outcome = match samples {
        Ok(rows) => allocate_month(&rows, window, edges),
        Err(e) => {
            warn!(month = %window.label(), error = %e, "Sample read failed, month left empty");
            MonthOutcome::Empty {
                reason: EmptyReason::FetchFailed,
            }
        }
    };

    let descriptive = match hourly {
        Ok(aggregates) => describe(&aggregates, offset),
        Err(e) => {
            warn!(month = %window.label(), error = %e, "Hourly aggregate read failed");
            DescriptiveStats::default()
        }
    };

    debug!(month = %window.label(), empty = outcome.is_empty(), "Month computed");

    MonthReport {
        window: *window,
        outcome,
        descriptive,
    }
}

fn allocate_month(
    rows: &[crate::storage::SampleRow],
    window: &MonthWindow,
    edges: &BandEdges,
) -> MonthOutcome {
    let samples = well_formed(rows);
    if samples.is_empty() {
        return MonthOutcome::Empty {
            reason: EmptyReason::NoSamples,
        };
    }

    let allocation = allocate(&samples, window, edges);
    let Some((max_value, max_band)) = allocation.max else {
        return MonthOutcome::Empty {
            reason: EmptyReason::NoCoverage,
        };
    };

    let hundredths = normalize_hundredths(&allocation.seconds_per_band);
    MonthOutcome::Computed(MonthResult {
        seconds_per_band: allocation.seconds_per_band,
        hundredths_per_band: hundredths,
        percent_per_band: to_percent(&hundredths),
        max_value,
        max_band,
    })
}

/// Highest per-month maximum; the earliest month wins a tie.
fn locate_global_max(months: &[MonthReport]) -> Option<GlobalMaxPointer> {
    let mut best: Option<GlobalMaxPointer> = None;
    for (month_index, report) in months.iter().enumerate() {
        let Some(result) = report.outcome.computed() else {
            continue;
        };
        if best.map_or(true, |b| result.max_value > b.value) {
            best = Some(GlobalMaxPointer {
                month_index,
                band_index: result.max_band,
                value: result.max_value,
            });
        }
    }
    best
}
