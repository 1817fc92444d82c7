//! Rolling event cache
//!
//! Holds every event currently "in view", ascending by timestamp.
//! Grows by merging fetched batches, shrinks by pruning entries older
//! than the visible window. Merging is idempotent: an event delivered
//! twice (overlapping delta fetches, retried polls) collapses onto its
//! `(class, timestamp, id)` identity. Ids must agree for a collapse:
//! both equal, or both absent. A present id never matches an absent
//! one, which keeps the relation transitive and the adjacent dedup
//! independent of batch order.

use soundlog_common::AudioEvent;

#[derive(Debug, Default, Clone)]
pub struct RollingCache {
    events: Vec<AudioEvent>,
}

impl RollingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Cached events, ascending by timestamp.
    pub fn events(&self) -> &[AudioEvent] {
        &self.events
    }

    /// Timestamp of the newest cached event; delta fetches resume here.
    pub fn newest_ts(&self) -> Option<f64> {
        self.events.last().map(|ev| ev.ts)
    }

    /// Merge a fetched batch into the cache.
    ///
    /// Concatenate, stable-sort ascending by `(ts, class, id)`, then
    /// drop adjacent duplicates. The secondary sort keys make every
    /// duplicate pair adjacent, so the adjacent dedup is complete.
    pub fn merge(&mut self, batch: Vec<AudioEvent>) {
        self.events.extend(batch);
        self.events.sort_by(|a, b| {
            a.ts.total_cmp(&b.ts)
                .then_with(|| a.c1_idx.cmp(&b.c1_idx))
                .then_with(|| a.id.unwrap_or(i64::MIN).cmp(&b.id.unwrap_or(i64::MIN)))
        });
        self.events.dedup_by(|a, b| same_event(a, b));
    }

    /// Drop every entry older than `now - window_hours*3600`.
    ///
    /// Runs after every merge so the cache never outgrows the visible
    /// window; an entry exactly on the cutoff stays.
    pub fn prune(&mut self, now: f64, window_hours: f64) {
        let cutoff = now - window_hours * 3600.0;
        self.events.retain(|ev| ev.ts >= cutoff);
    }
}

fn same_event(a: &AudioEvent, b: &AudioEvent) -> bool {
    if a.c1_idx != b.c1_idx || a.ts != b.ts {
        return false;
    }
    // Ids must agree, present-vs-absent included: letting an id-less
    // event match any id would make the relation non-transitive and
    // one id-less row could swallow several distinct id-bearing ones
    match (a.id, b.id) {
        (Some(left), Some(right)) => left == right,
        (None, None) => true,
        _ => false,
    }
}
