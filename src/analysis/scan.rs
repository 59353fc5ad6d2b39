use futures::future::join_all;
use tracing::{debug, warn};

use super::allocate::well_formed;
use super::window::MonthWindow;
use crate::storage::SampleSource;

/// Reference maximum used when nothing positive was logged, so the bands
/// never collapse to zero width.
pub const FALLBACK_MAX: f64 = 1.0;

/// Largest raw sample value across all `windows`.
///
/// Durations are ignored: any well-formed row returned for a window counts,
/// including one logged before the window that is still held inside it.
/// Months whose fetch fails contribute nothing. Falls back to
/// [`FALLBACK_MAX`] when no positive value exists.
pub async fn scan_max(source: &dyn SampleSource, series_id: &str, windows: &[MonthWindow]) -> f64 {
    let fetches = windows.iter().map(|window| async move {
        match source.read_log_samples(series_id, window.start, window.end).await {
            Ok(rows) => well_formed(&rows)
                .into_iter()
                .map(|sample| sample.value)
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v)))),
            Err(e) => {
                warn!(month = %window.label(), error = %e, "Max scan skipped month");
                None
            }
        }
    });

    let observed = join_all(fetches)
        .await
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));

    debug!(?observed, "Max scan complete");

    match observed {
        Some(max) if max > 0.0 => max,
        _ => FALLBACK_MAX,
    }
}
