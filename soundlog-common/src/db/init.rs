//! Database initialization
//!
//! Creates the event store schema when it does not exist yet. The
//! classifier pipeline calls this once on startup; tests use it to build
//! throwaway stores. Everything here is idempotent.

use crate::error::Result;
use crate::model::AudioEvent;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets the query service read while the pipeline appends
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Set busy timeout
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create tables and indexes (idempotent, safe to call repeatedly).
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_audio_logs_table(pool).await?;
    create_class_map_table(pool).await?;
    Ok(())
}

async fn create_audio_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audio_logs (
            id INTEGER PRIMARY KEY,
            ts REAL NOT NULL,
            raw_ts TEXT,
            db REAL,
            c1_idx INTEGER NOT NULL,
            c1_cf REAL NOT NULL,
            c2_idx INTEGER,
            c2_cf REAL,
            c3_idx INTEGER,
            c3_cf REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (c1_cf >= 0.0),
            CHECK (c2_cf IS NULL OR c2_cf >= 0.0),
            CHECK (c3_cf IS NULL OR c3_cf >= 0.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Every windowed read filters on ts
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audio_logs_ts ON audio_logs(ts)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_class_map_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS class_map (
            idx INTEGER PRIMARY KEY,
            mid TEXT,
            display_name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Append one classification event, returning its row id.
///
/// This is the write seam of the external pipeline's contract;
/// `event.id` is ignored (the store assigns row ids).
pub async fn append_event(pool: &SqlitePool, event: &AudioEvent) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO audio_logs (ts, raw_ts, db, c1_idx, c1_cf, c2_idx, c2_cf, c3_idx, c3_cf)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.ts)
    .bind(&event.raw_ts)
    .bind(event.db)
    .bind(event.c1_idx)
    .bind(event.c1_cf)
    .bind(event.c2_idx)
    .bind(event.c2_cf)
    .bind(event.c3_idx)
    .bind(event.c3_cf)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Insert or refresh one row of the YAMNet class-name lookup table.
pub async fn upsert_class_row(
    pool: &SqlitePool,
    idx: i64,
    mid: Option<&str>,
    display_name: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO class_map (idx, mid, display_name)
        VALUES (?, ?, ?)
        ON CONFLICT(idx) DO UPDATE SET mid = excluded.mid, display_name = excluded.display_name
        "#,
    )
    .bind(idx)
    .bind(mid)
    .bind(display_name)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // In-memory pools must stay at one connection: each pooled
    // connection would otherwise open its own empty memory database.
    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    fn event(ts: f64, class: i64, cf: f64) -> AudioEvent {
        AudioEvent {
            id: None,
            ts,
            raw_ts: Some("2024-01-01 00:00:00".to_string()),
            db: Some(-42.5),
            c1_idx: class,
            c1_cf: cf,
            c2_idx: None,
            c2_cf: None,
            c3_idx: None,
            c3_cf: None,
        }
    }

    #[tokio::test]
    async fn test_append_event_assigns_increasing_ids() {
        let pool = memory_pool().await;

        let first = append_event(&pool, &event(100.0, 1, 90.0)).await.unwrap();
        let second = append_event(&pool, &event(101.0, 2, 80.0)).await.unwrap();
        assert!(second > first);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audio_logs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_append_event_round_trips_columns() {
        let pool = memory_pool().await;
        let mut ev = event(123.456, 7, 88.5);
        ev.c2_idx = Some(9);
        ev.c2_cf = Some(55.0);

        let id = append_event(&pool, &ev).await.unwrap();
        let stored: AudioEvent =
            sqlx::query_as("SELECT id, ts, raw_ts, db, c1_idx, c1_cf, c2_idx, c2_cf, c3_idx, c3_cf FROM audio_logs WHERE id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();

        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.ts, 123.456);
        assert_eq!(stored.c1_idx, 7);
        assert_eq!(stored.c2_idx, Some(9));
        assert_eq!(stored.c3_idx, None);
    }

    #[tokio::test]
    async fn test_upsert_class_row_replaces_existing_name() {
        let pool = memory_pool().await;

        upsert_class_row(&pool, 0, Some("/m/09x0r"), "Speech").await.unwrap();
        upsert_class_row(&pool, 0, Some("/m/09x0r"), "Speech (human)").await.unwrap();

        let (count, name): (i64, String) = sqlx::query_as(
            "SELECT COUNT(*), MAX(display_name) FROM class_map WHERE idx = 0",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
        assert_eq!(name, "Speech (human)");
    }

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = memory_pool().await;
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
    }
}
