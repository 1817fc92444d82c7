//! Windowed event retrieval endpoint
//!
//! `GET /api/audio_logs` resolves the requested window, runs either a
//! raw range scan or the binned winner selection, and wraps the rows in
//! the `{windowStart, windowEnd, total, data}` envelope.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use soundlog_common::api::WindowResponse;
use soundlog_common::time::now_epoch;
use soundlog_common::{AudioEvent, Error, WindowSpec};
use tracing::{debug, warn};

use crate::{binning, store, AppState};

/// Raw-mode row cap when the request names none.
pub const DEFAULT_RAW_LIMIT: i64 = 1000;

/// Query parameters for `/api/audio_logs`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    /// Window start, epoch seconds (paired with `end`)
    pub start: Option<f64>,
    /// Window end, epoch seconds (paired with `start`)
    pub end: Option<f64>,
    /// Hours back from now, used only when start/end absent (default 24)
    pub hours: Option<f64>,
    /// Shift the whole window into the past by this many hours
    pub offset_hours: Option<f64>,
    /// Bucket granularity in seconds; presence enables binned mode
    pub bin_seconds: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/audio_logs
pub async fn get_audio_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<WindowResponse>, LogsError> {
    let spec = WindowSpec {
        start: query.start,
        end: query.end,
        hours: query.hours,
        offset_hours: query.offset_hours,
    };
    let window = spec.resolve(now_epoch())?;

    let offset = query.offset.unwrap_or(0).max(0);

    let data = match query.bin_seconds {
        Some(bin_seconds) => {
            if bin_seconds <= 0 {
                return Err(LogsError::InvalidWindow(format!(
                    "binSeconds must be positive, got {bin_seconds}"
                )));
            }

            let winners = store::fetch_binned(&state.db, &window, bin_seconds).await?;

            // Default limit holds the worst case, so only an explicit
            // limit can truncate; either way truncation gets flagged.
            let limit = match query.limit {
                Some(limit) => limit.max(0),
                None => {
                    let classes = store::class_count(&state.db).await?;
                    binning::worst_case_bucket_count(
                        classes,
                        window.duration_seconds(),
                        bin_seconds,
                    )
                }
            };

            let total_winners = winners.len();
            let page = page_winners(winners, offset, limit);
            let dropped = total_winners
                .saturating_sub(offset as usize)
                .saturating_sub(page.len());
            if dropped > 0 {
                warn!(
                    "binned response truncated: {} of {} winners dropped \
                     (limit {}, offset {}); raise the limit or widen binSeconds",
                    dropped, total_winners, limit, offset
                );
            }
            page
        }
        None => {
            let limit = query.limit.unwrap_or(DEFAULT_RAW_LIMIT).max(0);
            store::fetch_raw(&state.db, &window, limit, offset).await?
        }
    };

    let total = store::estimate_total(&state.db).await?;

    debug!(
        "window [{:.3}, {:.3}) -> {} events (binSeconds={:?})",
        window.start,
        window.end,
        data.len(),
        query.bin_seconds
    );

    Ok(Json(WindowResponse {
        window_start: window.start,
        window_end: window.end,
        total,
        data,
    }))
}

fn page_winners(winners: Vec<AudioEvent>, offset: i64, limit: i64) -> Vec<AudioEvent> {
    winners
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

/// Endpoint errors
#[derive(Debug)]
pub enum LogsError {
    InvalidWindow(String),
    Store(String),
}

impl From<Error> for LogsError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidRange(msg) => LogsError::InvalidWindow(msg),
            other => LogsError::Store(other.to_string()),
        }
    }
}

impl IntoResponse for LogsError {
    fn into_response(self) -> Response {
        match self {
            LogsError::InvalidWindow(msg) => {
                let body = Json(json!({ "error": msg }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            LogsError::Store(details) => {
                let body = Json(json!({
                    "error": "Internal server error",
                    "details": details,
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_winners_applies_offset_then_limit() {
        let winners: Vec<AudioEvent> = (0..5)
            .map(|i| AudioEvent {
                id: Some(i),
                ts: i as f64,
                raw_ts: None,
                db: None,
                c1_idx: 1,
                c1_cf: 50.0,
                c2_idx: None,
                c2_cf: None,
                c3_idx: None,
                c3_cf: None,
            })
            .collect();

        let page = page_winners(winners, 1, 2);
        let ids: Vec<Option<i64>> = page.iter().map(|ev| ev.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }
}
