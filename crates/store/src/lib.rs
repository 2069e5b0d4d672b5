//! SQLite-backed sample store.
//!
//! Samples live in one append-only table; hourly and daily aggregation is
//! pushed into SQL with `GROUP BY` on the date and hour derived from the
//! stored wall-clock seconds.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use cpumon_core::sample::{
    from_epoch_seconds, to_epoch_seconds, to_epoch_seconds_ceil, truncate_to_second,
};
use cpumon_core::{day_bounds, BucketKey, BucketSummary, MonitorError, Result, Sample, SampleStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

pub mod migrations;

fn storage(e: sqlx::Error) -> MonitorError {
    MonitorError::StorageUnavailable(e.to_string())
}

/// Persistent [`SampleStore`] on a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a private in-memory database (for tests and `--in-memory` runs).
    pub async fn new_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(storage)?;
        // one long-lived connection: every new connection would see a fresh database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(storage)?;
        Self::with_pool(pool).await
    }

    /// Open (creating if needed) the database at `db_path`.
    #[instrument(skip(db_path))]
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        info!("Opening sample store at {:?}", db_path);

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MonitorError::Config(format!("failed to create directory {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(storage)?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        migrations::run(&pool).await?;
        Ok(Self { pool })
    }

    /// Get a reference to the underlying SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn grouped(
        &self,
        sql: &str,
        lo: NaiveDateTime,
        hi: NaiveDateTime,
        hourly: bool,
    ) -> Result<Vec<BucketSummary>> {
        let rows = sqlx::query(sql)
            .bind(to_epoch_seconds_ceil(lo))
            .bind(to_epoch_seconds(hi))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.iter().map(|row| bucket_from_row(row, hourly)).collect()
    }
}

fn sample_from_row(row: &SqliteRow) -> Result<Sample> {
    let secs: i64 = row.try_get("timestamp").map_err(storage)?;
    let timestamp = from_epoch_seconds(secs).ok_or_else(|| {
        MonitorError::StorageUnavailable(format!("stored timestamp {secs} out of range"))
    })?;
    Ok(Sample {
        id:    row.try_get("id").map_err(storage)?,
        timestamp,
        value: row.try_get("value").map_err(storage)?,
    })
}

fn bucket_from_row(row: &SqliteRow, hourly: bool) -> Result<BucketSummary> {
    let day: String = row.try_get("day").map_err(storage)?;
    let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
        .map_err(|e| MonitorError::StorageUnavailable(format!("bad bucket date '{day}': {e}")))?;

    let key = if hourly {
        let hour: i64 = row.try_get("hour").map_err(storage)?;
        let hour = u32::try_from(hour)
            .map_err(|e| MonitorError::StorageUnavailable(format!("bad bucket hour {hour}: {e}")))?;
        BucketKey::Hour { date, hour }
    } else {
        BucketKey::Day(date)
    };

    Ok(BucketSummary::new(
        key,
        row.try_get("min_value").map_err(storage)?,
        row.try_get("max_value").map_err(storage)?,
        row.try_get("avg_value").map_err(storage)?,
    ))
}

const HOURLY_SQL: &str = r#"
    SELECT date(timestamp, 'unixepoch') AS day,
           CAST(strftime('%H', timestamp, 'unixepoch') AS INTEGER) AS hour,
           MIN(value) AS min_value,
           MAX(value) AS max_value,
           AVG(value) AS avg_value
    FROM cpu_samples
    WHERE timestamp >= ? AND timestamp <= ?
    GROUP BY day, hour
    ORDER BY day, hour
"#;

const DAILY_SQL: &str = r#"
    SELECT date(timestamp, 'unixepoch') AS day,
           MIN(value) AS min_value,
           MAX(value) AS max_value,
           AVG(value) AS avg_value
    FROM cpu_samples
    WHERE timestamp >= ? AND timestamp <= ?
    GROUP BY day
    ORDER BY day
"#;

#[async_trait]
impl SampleStore for SqliteStore {
    #[instrument(skip(self))]
    async fn append(&self, timestamp: NaiveDateTime, value: f64) -> Result<Sample> {
        let timestamp = truncate_to_second(timestamp);
        let result = sqlx::query("INSERT INTO cpu_samples (timestamp, value) VALUES (?, ?)")
            .bind(to_epoch_seconds(timestamp))
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(Sample { id: result.last_insert_rowid(), timestamp, value })
    }

    #[instrument(skip(self))]
    async fn range(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Sample>> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, value
            FROM cpu_samples
            WHERE timestamp >= ? AND timestamp <= ?
            ORDER BY timestamp, id
            "#,
        )
        .bind(to_epoch_seconds_ceil(start))
        .bind(to_epoch_seconds(end))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(sample_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn hourly_aggregate(&self, date: NaiveDate) -> Result<Vec<BucketSummary>> {
        let (lo, hi) = day_bounds(date, date)?;
        self.grouped(HOURLY_SQL, lo, hi, true).await
    }

    #[instrument(skip(self))]
    async fn daily_aggregate(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<BucketSummary>> {
        let (lo, hi) = day_bounds(start, end)?;
        self.grouped(DAILY_SQL, lo, hi, false).await
    }
}
