//! Class frequency ranking
//!
//! Orders the classes present in the cache by how often they occur and
//! discards the rarest fraction, so the legend only shows classes with
//! enough weight to mean something over the window.

use std::collections::BTreeMap;

use soundlog_common::AudioEvent;

/// Fraction of ranked classes discarded from the bottom by default.
pub const DEFAULT_CUTOFF_FRACTION: f64 = 2.0 / 3.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedClass {
    pub class: i64,
    pub count: usize,
}

/// Rank classes by occurrence count, ascending, dropping the bottom
/// `cutoff_fraction` of them.
///
/// Rarest classes come first in the result so a caller painting legend
/// rows back-to-front draws the most frequent class last (on top). Ties
/// on count order by class index. The drop count is `floor(n * fraction)`
/// of the distinct classes, with the fraction clamped to `[0, 1]`.
pub fn rank_classes(events: &[AudioEvent], cutoff_fraction: f64) -> Vec<RankedClass> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for ev in events {
        *counts.entry(ev.c1_idx).or_insert(0) += 1;
    }

    let mut ranked: Vec<RankedClass> = counts
        .into_iter()
        .map(|(class, count)| RankedClass { class, count })
        .collect();
    ranked.sort_by(|a, b| a.count.cmp(&b.count).then_with(|| a.class.cmp(&b.class)));

    // Nudge before flooring so fractions like 2/3 that decimal-round to
    // a whole count do not land one short of it
    let fraction = cutoff_fraction.clamp(0.0, 1.0);
    let dropped = ((ranked.len() as f64) * fraction + 1e-9).floor() as usize;
    ranked.split_off(dropped.min(ranked.len()))
}
