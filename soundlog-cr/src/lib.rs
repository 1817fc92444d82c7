//! soundlog-cr library - polling clock reconciler
//!
//! Maintains the rolling event cache behind the 24-hour polar clock:
//! a timer-driven loop fetches windowed batches from the query service,
//! merges them into a deduplicated, timestamp-ordered cache, prunes what
//! has scrolled out of view, and re-ranks classes by frequency. Render
//! layers consume the published [`reconciler::Snapshot`]s; no drawing
//! happens here.

pub mod cache;
pub mod client;
pub mod display;
pub mod ranking;
pub mod reconciler;

pub use cache::RollingCache;
pub use client::{FetchError, LogClient, WindowRequest};
pub use ranking::{rank_classes, RankedClass};
pub use reconciler::{Reconciler, ReconcilerConfig, ReconcilerHandle, Snapshot};
