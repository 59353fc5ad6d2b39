use super::traits::{HourlyAggregate, SampleRow, SampleSource, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default)]
pub struct SeriesData {
    pub samples: Vec<SampleRow>,
    pub hourly: Vec<HourlyAggregate>,
}

/// In-process sample source.
///
/// Rows are kept sorted by timestamp on insert so reads can be served
/// without re-sorting.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    series: Arc<RwLock<HashMap<String, SeriesData>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty series so that it resolves even without data.
    pub fn add_series(&self, series_id: &str) {
        self.write_guard()
            .entry(series_id.to_string())
            .or_default();
    }

    pub fn push_samples(&self, series_id: &str, rows: impl IntoIterator<Item = SampleRow>) {
        let mut guard = self.write_guard();
        let data = guard.entry(series_id.to_string()).or_default();
        data.samples.extend(rows);
        data.samples.sort_by_key(|row| row.timestamp);
    }

    pub fn push_hourly(&self, series_id: &str, rows: impl IntoIterator<Item = HourlyAggregate>) {
        let mut guard = self.write_guard();
        let data = guard.entry(series_id.to_string()).or_default();
        data.hourly.extend(rows);
        data.hourly.sort_by_key(|row| row.hour_start);
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SeriesData>> {
        // A poisoned lock only means a writer panicked mid-insert; the map is still usable.
        self.series.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_series<T>(
        &self,
        series_id: &str,
        f: impl FnOnce(&SeriesData) -> T,
    ) -> Result<T, SourceError> {
        let guard = self.series.read().unwrap_or_else(|e| e.into_inner());
        guard
            .get(series_id)
            .map(f)
            .ok_or_else(|| SourceError::Unavailable(format!("unknown series '{}'", series_id)))
    }
}

#[async_trait]
impl SampleSource for MemorySource {
    async fn series_exists(&self, series_id: &str) -> Result<bool, SourceError> {
        let guard = self.series.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.contains_key(series_id))
    }

    async fn read_log_samples(
        &self,
        series_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SampleRow>, SourceError> {
        let start_secs = start.timestamp();
        let end_secs = end.timestamp();

        self.read_series(series_id, |data| {
            data.samples
                .iter()
                .filter(|row| {
                    let ts = row.timestamp.timestamp();
                    let held_until = ts.saturating_add(row.duration_seconds.unwrap_or(0).max(0));
                    // Held over [ts, held_until); a row ending at `start` covers nothing
                    ts <= end_secs && (ts >= start_secs || held_until > start_secs)
                })
                .cloned()
                .collect()
        })
    }

    async fn read_hourly_aggregates(
        &self,
        series_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HourlyAggregate>, SourceError> {
        self.read_series(series_id, |data| {
            data.hourly
                .iter()
                .filter(|row| row.hour_start >= start && row.hour_start <= end)
                .cloned()
                .collect()
        })
    }
}
