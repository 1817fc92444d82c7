//! Per-(class, bin) winner selection
//!
//! Binned mode bounds payload size: the window is sliced into fixed
//! `bin_seconds` buckets and only one representative event survives per
//! `(class, bin)` key. The survivor is the maximum under
//! [`AudioEvent::winner_cmp`] (confidence, then timestamp, then row id),
//! so repeated identical queries return identical rows and a polling
//! dashboard converges instead of flickering.

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use soundlog_common::AudioEvent;

/// Bucket index of a timestamp: `floor(ts / bin_seconds)`.
///
/// Anchored at epoch 0, not at the window start, so bucket boundaries
/// are stable across successive live-updating windows.
pub fn bin_index(ts: f64, bin_seconds: i64) -> i64 {
    (ts / bin_seconds as f64).floor() as i64
}

/// Upper bound on winners a window can produce: one per class per bin.
///
/// Used to size the default row limit so it can never silently drop
/// classes or time ranges.
pub fn worst_case_bucket_count(class_count: i64, window_seconds: f64, bin_seconds: i64) -> i64 {
    let bins = (window_seconds / bin_seconds as f64).ceil() as i64;
    class_count.saturating_mul(bins.max(1))
}

/// Streaming fold selecting one winner per `(class, bin)` key.
///
/// Events are pushed in store order; the map keeps at most one event per
/// key, replaced whenever a strictly greater one arrives. Emission order
/// falls out of the `BTreeMap` key order: class ascending, bin ascending.
pub struct WinnerFold {
    bin_seconds: i64,
    winners: BTreeMap<(i64, i64), AudioEvent>,
}

impl WinnerFold {
    /// `bin_seconds` must be positive; callers validate before folding.
    pub fn new(bin_seconds: i64) -> Self {
        Self {
            bin_seconds,
            winners: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, event: AudioEvent) {
        let key = (event.c1_idx, bin_index(event.ts, self.bin_seconds));
        match self.winners.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(event);
            }
            Entry::Occupied(mut slot) => {
                if event.winner_cmp(slot.get()) == Ordering::Greater {
                    slot.insert(event);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    /// Winners in `(class asc, bin asc)` order.
    pub fn into_winners(self) -> Vec<AudioEvent> {
        self.winners.into_values().collect()
    }
}
