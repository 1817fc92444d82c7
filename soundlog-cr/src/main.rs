//! SoundLog Client Reconciler binary
//!
//! Headless monitor: runs the polling reconciler against a query
//! service and logs one line per snapshot, including the dial geometry
//! a renderer would use for the newest event.

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soundlog_common::WindowBounds;
use soundlog_cr::display;
use soundlog_cr::{Reconciler, ReconcilerConfig, Snapshot};

#[derive(Parser)]
#[command(name = "soundlog-cr", version, about = "SoundLog client reconciler")]
struct Args {
    /// Base URL of the query service
    #[arg(long, default_value = "http://127.0.0.1:5750", env = "SOUNDLOG_QS_URL")]
    base_url: String,

    /// Width of the rolling window in hours
    #[arg(long, default_value_t = 24.0)]
    window_hours: f64,

    /// Seconds between polls
    #[arg(long, default_value_t = 15)]
    interval_secs: u64,

    /// Bin the cold-start fetch to one winner per bucket of this many seconds
    #[arg(long)]
    bin_seconds: Option<i64>,

    /// Fraction of ranked classes dropped from the bottom
    #[arg(long, default_value_t = 2.0 / 3.0)]
    cutoff_fraction: f64,

    /// Hours added to timestamps when reporting time-of-day angles
    #[arg(long, default_value_t = 0.0)]
    display_offset_hours: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soundlog_cr=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting SoundLog Client Reconciler v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        "Polling {} every {}s over a {}h window",
        args.base_url, args.interval_secs, args.window_hours
    );

    let config = ReconcilerConfig {
        base_url: args.base_url.clone(),
        window_hours: args.window_hours,
        poll_interval: std::time::Duration::from_secs(args.interval_secs),
        bin_seconds: args.bin_seconds,
        cutoff_fraction: args.cutoff_fraction,
    };
    let handle = Reconciler::spawn(config).context("Failed to start reconciler")?;
    let mut snapshots = handle.snapshots();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("Reconciler stopped publishing snapshots");
                    break;
                }
                let snapshot = match snapshots.borrow_and_update().clone() {
                    Some(snapshot) => snapshot,
                    None => continue,
                };
                report(&snapshot, args.display_offset_hours);
            }
        }
    }

    handle.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Log one line per snapshot, plus the dial geometry of the newest
/// event at debug level.
fn report(snapshot: &Snapshot, display_offset_hours: f64) {
    let top: Vec<String> = snapshot
        .classes
        .iter()
        .rev()
        .take(3)
        .map(|ranked| {
            format!(
                "{} x{}",
                display::class_label(&snapshot.class_names, ranked.class),
                ranked.count
            )
        })
        .collect();
    info!(
        "tick {}: {} events cached, {} classes ranked, store total {}; top: {}",
        snapshot.tick,
        snapshot.events.len(),
        snapshot.classes.len(),
        snapshot.store_total,
        if top.is_empty() {
            "none".to_string()
        } else {
            top.join(", ")
        }
    );

    let bounds = WindowBounds {
        start: snapshot.window_start,
        end: snapshot.window_end,
    };
    let dateline = display::time_of_day_angle(snapshot.window_end, display_offset_hours);
    if let Some(newest) = snapshot.events.last() {
        let angle = display::time_of_day_angle(newest.ts, display_offset_hours);
        debug!(
            "newest event: class {} at {:.3} rad on the dial ({:.3} in the window), opacity {:.2}*{:.2}",
            newest.c1_idx,
            angle,
            display::window_angle(newest.ts, &bounds),
            display::confidence_opacity(newest.c1_cf),
            display::recency_opacity(angle, dateline)
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
