//! Event model shared by the store, the query service, and the client
//!
//! Column and field names follow the `audio_logs` table written by the
//! classification pipeline; the serialized form is the wire contract of
//! `GET /api/audio_logs`.

use serde::{Deserialize, Serialize};

/// One acoustic-classification event.
///
/// Append-only: rows are written once by the external classifier pipeline
/// and never mutated or deleted. `id` is the monotonically increasing row
/// id used as the final tie-break wherever a total order over events is
/// needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AudioEvent {
    /// Row id; absent only in payloads from stores that do not expose it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Event time as fractional epoch seconds (UTC)
    pub ts: f64,

    /// Wall-clock string as reported by the classifier device, passthrough
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_ts: Option<String>,

    /// Loudness in decibels, passthrough (not used by windowing logic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<f64>,

    /// Top-1 class index (YAMNet taxonomy)
    pub c1_idx: i64,

    /// Top-1 confidence, 0-100
    pub c1_cf: f64,

    /// Optional 2nd-ranked class/confidence pair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c2_idx: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c2_cf: Option<f64>,

    /// Optional 3rd-ranked class/confidence pair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c3_idx: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c3_cf: Option<f64>,
}

impl AudioEvent {
    /// Total order used for bucket-winner selection: highest confidence
    /// first, then latest timestamp, then highest row id. Deterministic
    /// for any pair of events, including non-finite confidence values.
    pub fn winner_cmp(&self, other: &AudioEvent) -> std::cmp::Ordering {
        self.c1_cf
            .total_cmp(&other.c1_cf)
            .then(self.ts.total_cmp(&other.ts))
            .then(self.id.unwrap_or(i64::MIN).cmp(&other.id.unwrap_or(i64::MIN)))
    }
}

/// One row of the YAMNet class-name lookup table.
///
/// Served verbatim by `GET /api/yamnet_class_map`; the wire key for the
/// class index is `index`, the name the dashboard consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClassMapEntry {
    #[serde(rename = "index")]
    pub idx: i64,
    pub display_name: String,
}

/// Number of classes in the YAMNet audio event taxonomy.
///
/// Fallback when the `class_map` table has not been populated yet.
pub const YAMNET_CLASS_COUNT: i64 = 521;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn event(id: i64, ts: f64, cf: f64) -> AudioEvent {
        AudioEvent {
            id: Some(id),
            ts,
            raw_ts: None,
            db: None,
            c1_idx: 7,
            c1_cf: cf,
            c2_idx: None,
            c2_cf: None,
            c3_idx: None,
            c3_cf: None,
        }
    }

    #[test]
    fn test_winner_cmp_confidence_first() {
        let low = event(99, 200.0, 40.0);
        let high = event(1, 100.0, 90.0);
        assert_eq!(high.winner_cmp(&low), Ordering::Greater);
    }

    #[test]
    fn test_winner_cmp_timestamp_breaks_confidence_tie() {
        let early = event(99, 100.0, 75.0);
        let late = event(1, 200.0, 75.0);
        assert_eq!(late.winner_cmp(&early), Ordering::Greater);
    }

    #[test]
    fn test_winner_cmp_id_breaks_full_tie() {
        let a = event(1, 100.0, 75.0);
        let b = event(2, 100.0, 75.0);
        assert_eq!(b.winner_cmp(&a), Ordering::Greater);
        assert_eq!(a.winner_cmp(&b), Ordering::Less);
    }

    #[test]
    fn test_winner_cmp_equal_events() {
        let a = event(3, 100.0, 75.0);
        assert_eq!(a.winner_cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_serialization_omits_absent_optionals() {
        let ev = event(5, 123.5, 80.0);
        let json = serde_json::to_value(&ev).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.get("ts").unwrap().as_f64(), Some(123.5));
        assert_eq!(obj.get("c1_idx").unwrap().as_i64(), Some(7));
        assert!(!obj.contains_key("raw_ts"));
        assert!(!obj.contains_key("c2_idx"));
    }

    #[test]
    fn test_deserialization_accepts_minimal_event() {
        let ev: AudioEvent =
            serde_json::from_str(r#"{"ts": 100.0, "c1_idx": 3, "c1_cf": 55.0}"#).unwrap();
        assert_eq!(ev.id, None);
        assert_eq!(ev.c1_idx, 3);
        assert_eq!(ev.c1_cf, 55.0);
    }
}
