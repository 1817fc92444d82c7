//! Table-wide summary endpoint
//!
//! `GET /api/audio_logs/count` returns an exact, unwindowed
//! `{total, earliest, latest}`: a diagnostic, not part of the
//! windowing contract.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use soundlog_common::api::CountResponse;

use crate::{store, AppState};

/// GET /api/audio_logs/count
pub async fn get_count(State(state): State<AppState>) -> Result<Json<CountResponse>, CountError> {
    let summary = store::summary(&state.db)
        .await
        .map_err(|e| CountError::Store(e.to_string()))?;
    Ok(Json(summary))
}

#[derive(Debug)]
pub enum CountError {
    Store(String),
}

impl IntoResponse for CountError {
    fn into_response(self) -> Response {
        let CountError::Store(details) = self;
        let body = Json(json!({
            "error": "Internal server error",
            "details": details,
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
