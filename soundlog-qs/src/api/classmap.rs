//! Class-name lookup endpoint
//!
//! `GET /api/yamnet_class_map` serves the YAMNet taxonomy as an array of
//! `{index, display_name}`, consumed once per dashboard session to
//! translate class indices into human labels.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use soundlog_common::model::ClassMapEntry;

use crate::{store, AppState};

/// GET /api/yamnet_class_map
pub async fn get_class_map(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassMapEntry>>, ClassMapError> {
    let entries = store::fetch_class_map(&state.db)
        .await
        .map_err(|e| ClassMapError::Store(e.to_string()))?;
    Ok(Json(entries))
}

#[derive(Debug)]
pub enum ClassMapError {
    Store(String),
}

impl IntoResponse for ClassMapError {
    fn into_response(self) -> Response {
        let ClassMapError::Store(details) = self;
        let body = Json(json!({
            "error": "Internal server error",
            "details": details,
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
