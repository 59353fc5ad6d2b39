use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single logged row as it comes out of the archive.
///
/// Duration and value are optional so that incomplete rows can be handed to
/// the analysis layer, which skips them individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: Option<i64>,
    pub value: Option<f64>,
}

impl SampleRow {
    pub fn new(timestamp: DateTime<Utc>, duration_seconds: i64, value: f64) -> Self {
        Self {
            timestamp,
            duration_seconds: Some(duration_seconds),
            value: Some(value),
        }
    }
}

/// Coarse per-hour statistics kept alongside the raw log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyAggregate {
    pub hour_start: DateTime<Utc>,
    pub avg: Option<f64>,
    pub max: Option<f64>,
}

impl HourlyAggregate {
    pub fn new(hour_start: DateTime<Utc>, avg: f64, max: f64) -> Self {
        Self {
            hour_start,
            avg: Some(avg),
            max: Some(max),
        }
    }
}

/// Read-only access to a power series archive.
///
/// Every read is bounded by an inclusive `[start, end]` window.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Whether `series_id` resolves to a logged series.
    async fn series_exists(&self, series_id: &str) -> Result<bool, SourceError>;

    /// Rows whose held interval overlaps `[start, end]`, ascending by timestamp.
    ///
    /// A row logged before `start` is included only while its held interval
    /// `[timestamp, timestamp + duration)` reaches past `start`; one that ends
    /// exactly at `start` covers nothing and is left out.
    async fn read_log_samples(
        &self,
        series_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SampleRow>, SourceError>;

    /// Hour buckets whose start lies in `[start, end]`.
    async fn read_hourly_aggregates(
        &self,
        series_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HourlyAggregate>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("database error: {0}")]
    Database(String),

    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("task join error: {0}")]
    TaskJoin(String),
}

impl From<duckdb::Error> for SourceError {
    fn from(err: duckdb::Error) -> Self {
        SourceError::Database(err.to_string())
    }
}
