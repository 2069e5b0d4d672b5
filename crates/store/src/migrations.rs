//! Database migrations.

use cpumon_core::{MonitorError, Result};
use sqlx::SqlitePool;
use tracing::{info, instrument};

const SCHEMA_VERSION: i64 = 1;

fn migration_failed(e: sqlx::Error) -> MonitorError {
    MonitorError::StorageUnavailable(format!("migration failed: {e}"))
}

#[instrument(skip(pool))]
pub async fn run(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(migration_failed)?;

    let current_version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(pool)
            .await
            .map_err(migration_failed)?;

    let current_version = current_version.unwrap_or(0);

    if current_version >= SCHEMA_VERSION {
        info!("Database schema is up to date (version {})", current_version);
        return Ok(());
    }

    info!("Migrating database from version {} to {}", current_version, SCHEMA_VERSION);

    if current_version < 1 {
        migrate_to_v1(pool).await?;
    }

    Ok(())
}

/// Append-only sample table. `timestamp` holds local wall-clock seconds
/// since 1970-01-01T00:00:00.
#[instrument(skip(pool))]
async fn migrate_to_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration to schema version 1");

    let mut tx = pool.begin().await.map_err(migration_failed)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cpu_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            value REAL NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await
    .map_err(migration_failed)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cpu_samples_timestamp ON cpu_samples(timestamp)")
        .execute(&mut *tx)
        .await
        .map_err(migration_failed)?;

    sqlx::query("INSERT INTO schema_version (version) VALUES (1)")
        .execute(&mut *tx)
        .await
        .map_err(migration_failed)?;

    tx.commit().await.map_err(migration_failed)?;
    Ok(())
}
