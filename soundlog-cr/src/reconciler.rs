//! Polling reconciler
//!
//! Owns the fetch/merge/prune/rank cycle: a cold start pulls the whole
//! visible window, every following poll pulls only the delta since the
//! newest cached event, and each successful tick publishes an immutable
//! [`Snapshot`] over a watch channel. A failed poll keeps the previous
//! cache intact and is retried on the next tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use soundlog_common::time::now_epoch;
use soundlog_common::AudioEvent;

use crate::cache::RollingCache;
use crate::client::{FetchError, LogClient, WindowRequest};
use crate::ranking::{rank_classes, RankedClass, DEFAULT_CUTOFF_FRACTION};

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Base URL of the query service.
    pub base_url: String,
    /// Width of the rolling window in hours.
    pub window_hours: f64,
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Ask the server to bin the cold-start fetch to one winner per
    /// bucket of this many seconds.
    pub bin_seconds: Option<i64>,
    /// Fraction of ranked classes dropped from the bottom.
    pub cutoff_fraction: f64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5750".to_string(),
            window_hours: 24.0,
            poll_interval: Duration::from_secs(15),
            bin_seconds: None,
            cutoff_fraction: DEFAULT_CUTOFF_FRACTION,
        }
    }
}

/// One consistent view of the cache, published after every successful
/// tick. Cheap to clone apart from the event list.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub window_start: f64,
    pub window_end: f64,
    /// Cached events, ascending by timestamp.
    pub events: Vec<AudioEvent>,
    /// Ranked classes, rarest first.
    pub classes: Vec<RankedClass>,
    /// Class index to display name; empty until the class map loads.
    pub class_names: Arc<HashMap<i64, String>>,
    /// Highest row id the store has ever assigned.
    pub store_total: i64,
    /// Events delivered by this tick's fetch.
    pub fetched: usize,
    pub tick: u64,
}

pub struct Reconciler {
    config: ReconcilerConfig,
    client: LogClient,
    cache: RollingCache,
    class_names: Option<Arc<HashMap<i64, String>>>,
    store_total: i64,
    tick: u64,
    cold: bool,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Result<Self, FetchError> {
        let client = LogClient::new(&config.base_url)?;
        Ok(Self {
            config,
            client,
            cache: RollingCache::new(),
            class_names: None,
            store_total: 0,
            tick: 0,
            cold: true,
        })
    }

    /// Spawn the reconciler onto the current runtime and hand back a
    /// handle for observing snapshots and shutting it down.
    pub fn spawn(config: ReconcilerConfig) -> Result<ReconcilerHandle, FetchError> {
        let reconciler = Reconciler::new(config)?;
        let (tx, rx) = watch::channel(None);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(reconciler.run(shutdown.clone(), tx));
        Ok(ReconcilerHandle {
            task,
            shutdown,
            snapshots: rx,
        })
    }

    /// Decide what the next poll should fetch, if anything.
    ///
    /// Cold (or emptied) cache: the full window, binned if configured.
    /// Warm cache: the raw delta from the newest cached event to `now`.
    /// Delta fetches are never binned: winners elected over a partial
    /// bucket would not match those elected over the whole one. The
    /// inclusive overlap at `newest` re-delivers one event; the merge
    /// dedup absorbs it.
    fn next_request(&self, now: f64) -> Option<WindowRequest> {
        if self.cold {
            return Some(self.full_window_request());
        }
        match self.cache.newest_ts() {
            Some(newest) if now > newest => Some(WindowRequest::range(newest, now)),
            Some(_) => None,
            None => Some(self.full_window_request()),
        }
    }

    fn full_window_request(&self) -> WindowRequest {
        let mut request = WindowRequest::hours_back(self.config.window_hours);
        if let Some(bin_seconds) = self.config.bin_seconds {
            request = request.binned(bin_seconds);
        }
        request
    }

    /// Run one poll cycle and build the resulting snapshot.
    async fn try_tick(&mut self) -> Result<Snapshot, FetchError> {
        // The class map is static per model, so one successful fetch
        // lasts the process lifetime; until then labels degrade to
        // "Unknown (idx)" and we retry next tick
        if self.class_names.is_none() {
            match self.client.fetch_class_map().await {
                Ok(entries) => {
                    let names: HashMap<i64, String> = entries
                        .into_iter()
                        .map(|entry| (entry.idx, entry.display_name))
                        .collect();
                    self.class_names = Some(Arc::new(names));
                }
                Err(err) => warn!("class map unavailable, labels fall back to indices: {err}"),
            }
        }

        let now = now_epoch();
        let mut fetched = 0;
        if let Some(request) = self.next_request(now) {
            let response = self.client.fetch_window(&request).await?;
            fetched = response.data.len();
            self.store_total = response.total;
            self.cache.merge(response.data);
            self.cold = false;
        }
        self.cache.prune(now, self.config.window_hours);

        let classes = rank_classes(self.cache.events(), self.config.cutoff_fraction);
        self.tick += 1;

        Ok(Snapshot {
            window_start: now - self.config.window_hours * 3600.0,
            window_end: now,
            events: self.cache.events().to_vec(),
            classes,
            class_names: self.class_names.clone().unwrap_or_default(),
            store_total: self.store_total,
            fetched,
            tick: self.tick,
        })
    }

    /// Poll until cancelled, publishing a snapshot after every
    /// successful tick. The tick body is awaited inline, so a slow
    /// fetch delays the next poll instead of stacking requests.
    pub async fn run(
        mut self,
        shutdown: CancellationToken,
        snapshots: watch::Sender<Option<Snapshot>>,
    ) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Reconciler stopping after {} ticks", self.tick);
                    break;
                }
                _ = ticker.tick() => {
                    match self.try_tick().await {
                        Ok(snapshot) => {
                            debug!(
                                "tick {}: {} fetched, {} cached, {} classes ranked",
                                snapshot.tick,
                                snapshot.fetched,
                                snapshot.events.len(),
                                snapshot.classes.len()
                            );
                            let _ = snapshots.send(Some(snapshot));
                        }
                        Err(err) => {
                            warn!(
                                "poll tick failed, keeping {} cached events: {err}",
                                self.cache.len()
                            );
                        }
                    }
                }
            }
        }
    }
}

pub struct ReconcilerHandle {
    task: JoinHandle<()>,
    shutdown: CancellationToken,
    snapshots: watch::Receiver<Option<Snapshot>>,
}

impl ReconcilerHandle {
    /// A fresh receiver; `None` until the first successful tick.
    pub fn snapshots(&self) -> watch::Receiver<Option<Snapshot>> {
        self.snapshots.clone()
    }

    /// Cancel the poll loop and wait for the task to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(err) = self.task.await {
            error!("Reconciler task failed to join: {err}");
        }
    }
}
