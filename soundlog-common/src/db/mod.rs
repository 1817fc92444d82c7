//! Database access layer
//!
//! The event store is a single SQLite file written by the external
//! classifier pipeline. Readers (the query service) connect with
//! [`connect_readonly`]; [`init::init_database`] owns schema bootstrap
//! and the append seam the pipeline uses.

use crate::error::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;

mod init;
pub use init::{append_event, create_schema, init_database, upsert_class_row};

/// Connect to the event database in read-only mode.
///
/// The store stays live while we read (the classifier keeps appending),
/// so the URL carries `mode=ro` but not `immutable=1`: SQLite must
/// keep honoring WAL index updates from the writer.
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::Config(format!(
            "database not found: {} (the classifier pipeline creates it; check the root folder)",
            db_path.display()
        )));
    }

    let db_url = format!("sqlite://{}?mode=ro", db_path.display());
    let pool = SqlitePool::connect(&db_url).await?;

    // Verify read-only by attempting a write (should fail)
    #[cfg(debug_assertions)]
    {
        let write_test = sqlx::query("CREATE TABLE _test_write (id INTEGER)")
            .execute(&pool)
            .await;
        if write_test.is_ok() {
            panic!("SAFETY VIOLATION: database connection is not read-only!");
        }
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readonly_connection_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("soundlog.db");
        init_database(&db_path).await.unwrap();

        let pool = connect_readonly(&db_path).await.unwrap();
        let result = sqlx::query("INSERT INTO class_map (idx, display_name) VALUES (1, 'Speech')")
            .execute(&pool)
            .await;
        assert!(result.is_err(), "write must fail on a read-only connection");
    }

    #[tokio::test]
    async fn test_missing_database_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("absent.db");

        let err = connect_readonly(&db_path).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
