//! Read-only queries against the event store
//!
//! Raw mode pushes ordering and paging into SQL; binned mode streams the
//! window through the winner fold and returns the full winner sequence
//! (paging over winners is the handler's concern so truncation can be
//! reported, not hidden).

use futures::TryStreamExt;
use soundlog_common::api::CountResponse;
use soundlog_common::model::{ClassMapEntry, YAMNET_CLASS_COUNT};
use soundlog_common::{AudioEvent, Error, Result, WindowBounds};
use sqlx::SqlitePool;

use crate::binning::WinnerFold;

const EVENT_COLUMNS: &str =
    "id, ts, raw_ts, db, c1_idx, c1_cf, c2_idx, c2_cf, c3_idx, c3_cf";

/// Raw range scan: every event in `[start, end)`, newest first.
pub async fn fetch_raw(
    db: &SqlitePool,
    window: &WindowBounds,
    limit: i64,
    offset: i64,
) -> Result<Vec<AudioEvent>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM audio_logs \
         WHERE ts >= ? AND ts < ? \
         ORDER BY ts DESC, id DESC \
         LIMIT ? OFFSET ?"
    );

    let events = sqlx::query_as::<_, AudioEvent>(&sql)
        .bind(window.start)
        .bind(window.end)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

    Ok(events)
}

/// Binned scan: one winner per `(class, bin)` key over the window,
/// emitted class-ascending then bin-ascending.
///
/// Rows stream through the fold one at a time, so memory is bounded by
/// the bucket count rather than the raw event volume.
pub async fn fetch_binned(
    db: &SqlitePool,
    window: &WindowBounds,
    bin_seconds: i64,
) -> Result<Vec<AudioEvent>> {
    if bin_seconds <= 0 {
        return Err(Error::InvalidRange(format!(
            "binSeconds must be positive, got {bin_seconds}"
        )));
    }

    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM audio_logs WHERE ts >= ? AND ts < ?"
    );

    let mut fold = WinnerFold::new(bin_seconds);
    let mut rows = sqlx::query_as::<_, AudioEvent>(&sql)
        .bind(window.start)
        .bind(window.end)
        .fetch(db);

    while let Some(event) = rows.try_next().await? {
        fold.push(event);
    }

    Ok(fold.into_winners())
}

/// Cheap whole-table row estimate.
///
/// The table is append-only and rows are never deleted, so `MAX(id)`
/// equals the row count without a full scan. Operational signal only;
/// exact counts come from [`summary`].
pub async fn estimate_total(db: &SqlitePool) -> Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM audio_logs")
        .fetch_one(db)
        .await?;
    Ok(total)
}

/// Exact table-wide summary: row count plus earliest/latest timestamps.
pub async fn summary(db: &SqlitePool) -> Result<CountResponse> {
    let (total, earliest, latest): (i64, Option<f64>, Option<f64>) =
        sqlx::query_as("SELECT COUNT(*), MIN(ts), MAX(ts) FROM audio_logs")
            .fetch_one(db)
            .await?;

    Ok(CountResponse {
        total,
        earliest,
        latest,
    })
}

/// Full class-name lookup table, index ascending.
pub async fn fetch_class_map(db: &SqlitePool) -> Result<Vec<ClassMapEntry>> {
    let entries = sqlx::query_as::<_, ClassMapEntry>(
        "SELECT idx, display_name FROM class_map ORDER BY idx",
    )
    .fetch_all(db)
    .await?;

    Ok(entries)
}

/// Number of known classes, for sizing default binned limits.
///
/// Falls back to the YAMNet taxonomy size while the lookup table is
/// still unpopulated.
pub async fn class_count(db: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM class_map")
        .fetch_one(db)
        .await?;

    Ok(if count > 0 { count } else { YAMNET_CLASS_COUNT })
}
