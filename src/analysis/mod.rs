//! Duration-weighted power band analysis.
//!
//! Pipeline per run: scan the reference maximum over the whole range, derive
//! ten band edges from it, then for each month allocate covered seconds to
//! bands and normalize them into percentages.

pub mod aggregate;
pub mod allocate;
pub mod bands;
pub mod normalize;
pub mod scan;
pub mod stats;
pub mod window;

pub use aggregate::{
    compute, AnalysisRequest, ComputeResult, EmptyReason, GlobalMaxPointer, MonthOutcome,
    MonthReport, MonthResult,
};
pub use allocate::{allocate, well_formed, Allocation, LogSample, MalformedSample};
pub use bands::{BandEdges, BAND_COUNT};
pub use normalize::{normalize, normalize_hundredths, FULL_HUNDREDTHS};
pub use scan::{scan_max, FALLBACK_MAX};
pub use stats::{describe, DailyStats, DescriptiveStats};
pub use window::{build_month_windows, MonthWindow, MAX_MONTHS};

use crate::storage::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid series reference: '{0}'")]
    InvalidSeriesReference(String),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("month range too long or out of representable dates")]
    WindowOutOfRange,
}
