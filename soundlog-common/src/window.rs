//! Window resolution
//!
//! Turns request parameters into an absolute half-open interval
//! `[start, end)` in epoch seconds. Pure: callers inject `now`
//! (see [`crate::time::now_epoch`]) so resolution is reproducible
//! in tests.

use crate::error::{Error, Result};
use crate::time::hours_to_seconds;

/// Window span used when the request names neither bounds nor hours.
pub const DEFAULT_WINDOW_HOURS: f64 = 24.0;

/// Raw window parameters as they arrive from a request.
///
/// `start`/`end` take precedence when both are present; otherwise the
/// window is `hours` back from `now`. `offset_hours` shifts the whole
/// window into the past (replay/simulation of a different wall-clock
/// alignment) in either mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowSpec {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub hours: Option<f64>,
    pub offset_hours: Option<f64>,
}

/// A resolved half-open interval `[start, end)`, epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowBounds {
    pub start: f64,
    pub end: f64,
}

impl WindowBounds {
    pub fn duration_seconds(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open membership: `start <= ts < end`.
    pub fn contains(&self, ts: f64) -> bool {
        ts >= self.start && ts < self.end
    }
}

impl WindowSpec {
    /// Resolve to absolute bounds against the given `now`.
    ///
    /// Fails with [`Error::InvalidRange`] when the resolved window is
    /// empty, inverted, or non-finite; degenerate windows are rejected
    /// here so no query ever runs against one.
    pub fn resolve(&self, now: f64) -> Result<WindowBounds> {
        let offset_seconds = hours_to_seconds(self.offset_hours.unwrap_or(0.0));

        let (start, end) = match (self.start, self.end) {
            (Some(start), Some(end)) => (start - offset_seconds, end - offset_seconds),
            _ => {
                let end = now - offset_seconds;
                let span = hours_to_seconds(self.hours.unwrap_or(DEFAULT_WINDOW_HOURS));
                (end - span, end)
            }
        };

        if !start.is_finite() || !end.is_finite() {
            return Err(Error::InvalidRange(format!(
                "window bounds must be finite (start={start}, end={end})"
            )));
        }
        if end <= start {
            return Err(Error::InvalidRange(format!(
                "window end ({end}) must be after start ({start})"
            )));
        }

        Ok(WindowBounds { start, end })
    }
}
