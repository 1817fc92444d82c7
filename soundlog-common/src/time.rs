//! Timestamp utilities
//!
//! All event timestamps in soundlog are fractional seconds since the Unix
//! epoch, UTC. Wall-clock conversions for display happen elsewhere.

use chrono::Utc;

/// Current time as fractional epoch seconds (UTC)
pub fn now_epoch() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Convert whole hours to seconds
pub fn hours_to_seconds(hours: f64) -> f64 {
    hours * 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_epoch_is_reasonable() {
        let now = now_epoch();
        // After 2020-01-01, before 2100-01-01
        assert!(now > 1_577_836_800.0);
        assert!(now < 4_102_444_800.0);
    }

    #[tokio::test]
    async fn test_now_epoch_advances() {
        let t1 = now_epoch();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let t2 = now_epoch();
        assert!(t2 > t1);
    }

    #[test]
    fn test_hours_to_seconds() {
        assert_eq!(hours_to_seconds(24.0), 86_400.0);
        assert_eq!(hours_to_seconds(0.5), 1800.0);
        assert_eq!(hours_to_seconds(0.0), 0.0);
    }
}
