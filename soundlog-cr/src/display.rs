//! Polar clock geometry
//!
//! Pure helpers mapping events onto the 24-hour dial: timestamps to
//! angles, confidences and recency to opacities, class indices to
//! legend labels. Screen convention throughout: y grows downward, so
//! angles increase clockwise and midnight sits at the top (`-PI/2`).

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Angle of `ts` within `bounds`: the window start maps to the top of
/// the dial, the end to one full clockwise revolution later.
///
/// `bounds` comes from a resolved window, so the span is positive.
pub fn window_angle(ts: f64, bounds: &soundlog_common::WindowBounds) -> f64 {
    let fraction = (ts - bounds.start) / (bounds.end - bounds.start);
    -FRAC_PI_2 + fraction * TAU
}

/// Angle of `ts` by wall-clock time of day, shifted by `offset_hours`
/// (a display timezone knob). Midnight at the top, 06:00 at the right,
/// noon at the bottom, 18:00 at the left.
pub fn time_of_day_angle(ts: f64, offset_hours: f64) -> f64 {
    let local = ts + offset_hours * 3600.0;
    let fraction = local.rem_euclid(SECONDS_PER_DAY) / SECONDS_PER_DAY;
    -FRAC_PI_2 + fraction * TAU
}

/// Opacity for a confidence percentage: linear from 0.1 at 0% to 1.0
/// at 100%, clamped for out-of-range inputs.
pub fn confidence_opacity(confidence: f64) -> f64 {
    (0.1 + confidence / 100.0 * 0.9).clamp(0.1, 1.0)
}

/// Minimum recency opacity, reached a full revolution behind the
/// dateline; older events stay legible instead of vanishing.
const MIN_RECENCY_OPACITY: f64 = 0.33;

/// Opacity for an event angle relative to the dateline (the angle of
/// "now"). Events just behind the dateline are fully opaque and fade
/// linearly with angular distance behind it, down to
/// [`MIN_RECENCY_OPACITY`] at the oldest edge of the window.
pub fn recency_opacity(event_angle: f64, dateline_angle: f64) -> f64 {
    let behind = (dateline_angle - event_angle).rem_euclid(TAU);
    1.0 - (1.0 - MIN_RECENCY_OPACITY) * (behind / TAU)
}

/// Legend label for a class index, falling back to a placeholder when
/// the class map has no entry yet.
pub fn class_label(names: &HashMap<i64, String>, class: i64) -> String {
    match names.get(&class) {
        Some(name) => name.clone(),
        None => format!("Unknown ({class})"),
    }
}
