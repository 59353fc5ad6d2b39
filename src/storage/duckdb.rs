use super::traits::{HourlyAggregate, SampleRow, SampleSource, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Check if a process with the given PID is still running
fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use std::process::Command;
        Command::new("ps")
            .arg("-p")
            .arg(pid.to_string())
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        // On non-Unix systems, assume process is running to be safe
        true
    }
}

/// Extract PID from DuckDB lock error message
fn extract_pid_from_lock_error(error_msg: &str) -> Option<u32> {
    // Error format: "... (PID 12345) ..."
    let start = error_msg.find("(PID ")? + 5;
    let end = error_msg[start..].find(')')?;
    error_msg[start..start + end].parse().ok()
}

/// Remove the WAL and lock files left behind by a dead writer
fn remove_lock_files(db_path: &Path) -> std::io::Result<()> {
    for suffix in ["wal", "lock"] {
        let path = PathBuf::from(format!("{}.{}", db_path.display(), suffix));
        if path.exists() {
            std::fs::remove_file(&path)?;
            tracing::info!(path = %path.display(), "Removed stale archive file");
        }
    }
    Ok(())
}

fn micros_to_datetime(column: usize, micros: i64) -> duckdb::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        duckdb::Error::FromSqlConversionFailure(
            column,
            duckdb::types::Type::BigInt,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "invalid timestamp",
            )),
        )
    })
}

/// Power archive stored in an embedded DuckDB database.
///
/// Holds three tables: `series` (known series ids), `log_samples` (raw
/// duration-tagged rows) and `hourly_aggregates`.
pub struct DuckDbArchive {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbArchive {
    /// Open (or create) an archive file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();

        let err = match Connection::open(path) {
            Ok(conn) => return Ok(Self::from_connection(conn)),
            Err(e) => e,
        };

        let error_msg = err.to_string();
        if !error_msg.contains("Could not set lock") {
            return Err(err.into());
        }

        tracing::warn!("Archive lock detected: {}", error_msg);
        let Some(pid) = extract_pid_from_lock_error(&error_msg) else {
            return Err(err.into());
        };

        if is_process_running(pid) {
            tracing::error!(pid, "Archive lock is held by a running process");
            return Err(err.into());
        }

        tracing::warn!(pid, "Lock holder is gone, removing stale lock files");
        if let Err(io_err) = remove_lock_files(path) {
            tracing::error!("Failed to remove lock files: {}", io_err);
            return Err(err.into());
        }

        tracing::info!("Retrying archive open after removing stale locks");
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    /// Create an in-memory archive (for testing)
    pub fn in_memory() -> Result<Self, SourceError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, SourceError>
    where
        F: FnOnce(&Connection) -> Result<T, SourceError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| SourceError::Database("archive connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| SourceError::TaskJoin(e.to_string()))?
    }

    pub async fn init_schema(&self) -> Result<(), SourceError> {
        self.with_conn(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS series (
                    series_id VARCHAR PRIMARY KEY,
                    name VARCHAR
                )",
                [],
            )?;

            // duration_seconds and value stay nullable: incomplete rows are kept
            // and skipped at analysis time
            conn.execute(
                "CREATE TABLE IF NOT EXISTS log_samples (
                    series_id VARCHAR NOT NULL,
                    timestamp TIMESTAMPTZ NOT NULL,
                    duration_seconds BIGINT,
                    value DOUBLE
                )",
                [],
            )?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_log_samples_series_ts ON log_samples(series_id, timestamp)",
                [],
            )?;

            conn.execute(
                "CREATE TABLE IF NOT EXISTS hourly_aggregates (
                    series_id VARCHAR NOT NULL,
                    hour_start TIMESTAMPTZ NOT NULL,
                    avg_value DOUBLE,
                    max_value DOUBLE
                )",
                [],
            )?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_hourly_series_hour ON hourly_aggregates(series_id, hour_start)",
                [],
            )?;

            Ok(())
        })
        .await
    }

    pub async fn register_series(&self, series_id: &str, name: Option<&str>) -> Result<(), SourceError> {
        let series_id = series_id.to_string();
        let name = name.map(str::to_string);

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO series (series_id, name) VALUES (?, ?)",
                duckdb::params![series_id, name],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn write_samples(&self, series_id: &str, rows: &[SampleRow]) -> Result<(), SourceError> {
        if rows.is_empty() {
            return Ok(());
        }

        let series_id = series_id.to_string();
        let rows = rows.to_vec();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO log_samples (series_id, timestamp, duration_seconds, value)
                 VALUES (?, to_timestamp(? / 1000000.0), ?, ?)",
            )?;

            for row in rows {
                stmt.execute(duckdb::params![
                    series_id,
                    row.timestamp.timestamp_micros(),
                    row.duration_seconds,
                    row.value,
                ])?;
            }

            Ok(())
        })
        .await
    }

    pub async fn write_hourly_aggregates(
        &self,
        series_id: &str,
        rows: &[HourlyAggregate],
    ) -> Result<(), SourceError> {
        if rows.is_empty() {
            return Ok(());
        }

        let series_id = series_id.to_string();
        let rows = rows.to_vec();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO hourly_aggregates (series_id, hour_start, avg_value, max_value)
                 VALUES (?, to_timestamp(? / 1000000.0), ?, ?)",
            )?;

            for row in rows {
                stmt.execute(duckdb::params![
                    series_id,
                    row.hour_start.timestamp_micros(),
                    row.avg,
                    row.max,
                ])?;
            }

            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SampleSource for DuckDbArchive {
    async fn series_exists(&self, series_id: &str) -> Result<bool, SourceError> {
        let series_id = series_id.to_string();

        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM series WHERE series_id = ?",
                duckdb::params![series_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    async fn read_log_samples(
        &self,
        series_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SampleRow>, SourceError> {
        let series_id = series_id.to_string();
        let start_micros = start.timestamp_micros();
        let end_micros = end.timestamp_micros();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT epoch_us(timestamp), duration_seconds, value
                 FROM log_samples
                 WHERE series_id = ?
                   AND timestamp <= to_timestamp(? / 1000000.0)
                   AND (epoch_us(timestamp) >= ?
                        OR CAST(duration_seconds AS DOUBLE) > (? - epoch_us(timestamp)) / 1000000.0)
                 ORDER BY timestamp",
            )?;

            let rows = stmt.query_map(
                duckdb::params![series_id, end_micros, start_micros, start_micros],
                |row| {
                    Ok(SampleRow {
                        timestamp: micros_to_datetime(0, row.get::<_, i64>(0)?)?,
                        duration_seconds: row.get(1)?,
                        value: row.get(2)?,
                    })
                },
            )?;

            let mut samples = Vec::new();
            for row in rows {
                samples.push(row?);
            }
            Ok(samples)
        })
        .await
    }

    async fn read_hourly_aggregates(
        &self,
        series_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HourlyAggregate>, SourceError> {
        let series_id = series_id.to_string();
        let start_micros = start.timestamp_micros();
        let end_micros = end.timestamp_micros();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT epoch_us(hour_start), avg_value, max_value
                 FROM hourly_aggregates
                 WHERE series_id = ?
                   AND hour_start >= to_timestamp(? / 1000000.0)
                   AND hour_start <= to_timestamp(? / 1000000.0)
                 ORDER BY hour_start",
            )?;

            let rows = stmt.query_map(
                duckdb::params![series_id, start_micros, end_micros],
                |row| {
                    Ok(HourlyAggregate {
                        hour_start: micros_to_datetime(0, row.get::<_, i64>(0)?)?,
                        avg: row.get(1)?,
                        max: row.get(2)?,
                    })
                },
            )?;

            let mut aggregates = Vec::new();
            for row in rows {
                aggregates.push(row?);
            }
            Ok(aggregates)
        })
        .await
    }
}
