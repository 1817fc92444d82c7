//! Wire types shared between the query service and its clients
//!
//! Field names serialize in camelCase to preserve the contract the
//! polar-clock dashboard already speaks.

use serde::{Deserialize, Serialize};

use crate::model::AudioEvent;

/// Envelope returned by `GET /api/audio_logs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowResponse {
    /// Resolved window start, inclusive (epoch seconds)
    pub window_start: f64,
    /// Resolved window end, exclusive (epoch seconds)
    pub window_end: f64,
    /// Estimated total rows in the store (not the window)
    pub total: i64,
    /// Events oldest-relevant ordering per query mode
    pub data: Vec<AudioEvent>,
}

/// Envelope returned by `GET /api/audio_logs/count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub total: i64,
    /// Earliest event timestamp, absent when the table is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest: Option<f64>,
    /// Latest event timestamp, absent when the table is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<f64>,
}

/// Envelope returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}
