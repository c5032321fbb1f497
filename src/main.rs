use std::sync::Arc;

use anyhow::Result;
use candlewatch_core::{
    BbwMonitor, Clock, Config, DashboardBroadcaster, FiveMinuteAggregator, IngestionCoordinator,
    InstrumentProfile, SystemClock,
};
use candlewatch_data::Database;
use tracing::info;

const AGGREGATION_INTERVAL_SECS: i64 = 300;

/// Wires C1-C8 together and drives the five-minute aggregation cycle from
/// the session clock. Bar ingestion itself (the broker/feed adapter) is out
/// of scope for this crate (spec §1 Non-goals); this binary exists only to
/// exercise the core end-to-end against whatever bars `IngestionCoordinator`
/// is fed, matching the teacher's `src/main.rs` role as a thin wiring shell.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    info!("starting candlewatch");

    let config = Config::load()?;
    info!(timezone = %config.timezone, min_context = config.min_context, "configuration loaded");

    let db_path = std::env::var("CANDLEWATCH_DB_PATH").ok();
    let store = Arc::new(match &db_path {
        Some(path) => {
            info!(path, "opening sqlite store");
            Database::open_file(std::path::Path::new(path))?
        }
        None => {
            info!("no CANDLEWATCH_DB_PATH set; opening in-memory sqlite store");
            Database::open_memory()?
        }
    });

    let coordinator = Arc::new(IngestionCoordinator::new(store.clone()));
    let aggregator = Arc::new(FiveMinuteAggregator::new(store.clone()));
    let monitor = Arc::new(BbwMonitor::new());
    let broadcaster = Arc::new(DashboardBroadcaster::new());

    let instruments = configured_instruments();
    for profile in &instruments {
        monitor.register_profile(profile.clone());
    }
    // Retained so the coordinator isn't dropped before the feed adapter that
    // would normally call `ingest` is wired in.
    let _coordinator = coordinator;

    let clock = Arc::new(SystemClock::new(
        config.timezone,
        config.session_start,
        config.session_end,
    ));
    let mut ticks = clock.clone().tick_stream(AGGREGATION_INTERVAL_SECS);

    info!(count = instruments.len(), "entering aggregation loop");
    while let Some(tick) = ticks.recv().await {
        let window_end = tick.timestamp();
        let window_start = window_end - AGGREGATION_INTERVAL_SECS;

        for profile in &instruments {
            match aggregator.run_cycle(&profile.instrument_key, window_start, window_end) {
                Ok(Some(event)) => {
                    let in_session = clock.in_session(tick);
                    let alert = monitor.on_close_event(&event);
                    let evaluation = monitor.evaluation(&profile.instrument_key);
                    let contracting_count = evaluation.map(|e| e.contracting_count).unwrap_or(0);
                    let trend = evaluation.map(|e| e.trend).unwrap_or(candlewatch_core::Trend::Stable);
                    let pattern_strength = evaluation.and_then(|e| e.strength);
                    broadcaster
                        .on_close_event(
                            &event,
                            contracting_count,
                            trend,
                            alert.as_ref().map(|a| a.kind),
                            pattern_strength,
                            Some(profile.hist_min_bbw),
                            tick,
                            in_session,
                        )
                        .await;
                    if let Some(alert) = alert {
                        info!(instrument = %profile.instrument_key, kind = ?alert.kind, message = %alert.message, "alert");
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(instrument = %profile.instrument_key, error = %err, "aggregation cycle failed");
                }
            }
        }
    }

    Ok(())
}

fn configured_instruments() -> Vec<InstrumentProfile> {
    std::env::var("CANDLEWATCH_INSTRUMENTS")
        .ok()
        .map(|raw| {
            raw.split(',')
                .filter(|s| !s.is_empty())
                .map(|key| InstrumentProfile {
                    instrument_key: key.to_string(),
                    symbol: key.to_string(),
                    exchange_token: String::new(),
                    hist_min_bbw: 0.0,
                })
                .collect()
        })
        .unwrap_or_default()
}
