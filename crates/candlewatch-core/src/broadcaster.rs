use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::events::FiveMinCloseEvent;
use crate::monitor::{AlertKind, PatternStrength, Trend};

const SUBSCRIBER_BUFFER: usize = 32;
const BBW_HISTORY_CAP: usize = 20;

/// Per-instrument view emitted by the broadcaster (C7), per spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub instrument_key: String,
    pub bbw: f64,
    pub hist_min_bbw: Option<f64>,
    pub distance_from_min_pct: Option<f64>,
    pub contracting_count: usize,
    pub trend: Trend,
    pub alert_flag: bool,
    pub alert_kind: Option<AlertKind>,
    pub pattern_strength: Option<PatternStrength>,
    pub bar_timestamp: i64,
    pub last_update: DateTime<Utc>,
    pub alert_trigger_timestamp: Option<i64>,
    /// Minutes since `last_update`, computed fresh on every read (spec §7's
    /// "explicit staleness indicator").
    pub staleness_minutes: f64,
    /// Bounded BBW history for this instrument, most recent last. Sourced
    /// read-only from the monitor's own history — no new persistence.
    pub bbw_history: Vec<f64>,
}

struct SnapshotInput {
    bbw: f64,
    hist_min_bbw: Option<f64>,
    contracting_count: usize,
    trend: Trend,
    alert_kind: Option<AlertKind>,
    pattern_strength: Option<PatternStrength>,
    bar_timestamp: i64,
    bbw_history: VecDeque<f64>,
}

struct CachedSnapshot {
    input: SnapshotInput,
    last_update: DateTime<Utc>,
    alert_trigger_timestamp: Option<i64>,
}

type SubscriberId = u64;

/// The dashboard broadcaster (C7). Owns the snapshot cache and subscriber
/// set (spec §3 "Ownership"); pushes on every five-minute close during
/// market hours, serves cached snapshots via `snapshot`/`snapshots` outside
/// them.
pub struct DashboardBroadcaster {
    cache: DashMap<String, CachedSnapshot>,
    subscribers: DashMap<SubscriberId, mpsc::Sender<DashboardSnapshot>>,
    next_subscriber_id: std::sync::atomic::AtomicU64,
}

impl DashboardBroadcaster {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
            subscribers: DashMap::new(),
            next_subscriber_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// `StreamDashboard`: registers a new subscriber with a bounded
    /// outbound buffer. On overflow the subscriber is disconnected (its
    /// sender is dropped and removed on the next send attempt).
    pub fn subscribe(&self) -> mpsc::Receiver<DashboardSnapshot> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self
            .next_subscriber_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.subscribers.insert(id, tx);
        rx
    }

    /// Updates the snapshot for `event.instrument_key` and, during market
    /// hours, pushes it to every connected subscriber. `in_session` is
    /// supplied by the caller (C8) rather than queried internally, keeping
    /// this component a pure consumer with respect to the clock.
    pub async fn on_close_event(
        &self,
        event: &FiveMinCloseEvent,
        contracting_count: usize,
        trend: Trend,
        alert_kind: Option<AlertKind>,
        pattern_strength: Option<PatternStrength>,
        hist_min_bbw: Option<f64>,
        now: DateTime<Utc>,
        in_session: bool,
    ) {
        let bbw = event.bar.bb_width_norm.unwrap_or(0.0);

        let mut history = self
            .cache
            .get(&event.instrument_key)
            .map(|c| c.input.bbw_history.clone())
            .unwrap_or_default();
        history.push_back(bbw);
        while history.len() > BBW_HISTORY_CAP {
            history.pop_front();
        }

        let snapshot = CachedSnapshot {
            input: SnapshotInput {
                bbw,
                hist_min_bbw,
                contracting_count,
                trend,
                alert_kind,
                pattern_strength,
                bar_timestamp: event.bar.timestamp,
                bbw_history: history,
            },
            last_update: now,
            alert_trigger_timestamp: alert_kind.map(|_| event.bar.timestamp),
        };

        self.cache.insert(event.instrument_key.clone(), snapshot);

        if !in_session {
            return;
        }

        let rendered = self.render(&event.instrument_key, now).expect("just inserted");
        self.push_to_subscribers(rendered).await;
    }

    async fn push_to_subscribers(&self, snapshot: DashboardSnapshot) {
        let mut disconnected = Vec::new();
        for entry in self.subscribers.iter() {
            match entry.value().try_send(snapshot.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = entry.key(), "outbound buffer full; disconnecting");
                    disconnected.push(*entry.key());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    disconnected.push(*entry.key());
                }
            }
        }
        for id in disconnected {
            self.subscribers.remove(&id);
        }
    }

    fn render(&self, instrument_key: &str, now: DateTime<Utc>) -> Option<DashboardSnapshot> {
        let cached = self.cache.get(instrument_key)?;
        let staleness_minutes = (now - cached.last_update).num_seconds() as f64 / 60.0;
        let distance_from_min_pct = cached.input.hist_min_bbw.map(|hist_min| {
            if hist_min == 0.0 {
                0.0
            } else {
                (cached.input.bbw - hist_min) / hist_min * 100.0
            }
        });

        Some(DashboardSnapshot {
            instrument_key: instrument_key.to_string(),
            bbw: cached.input.bbw,
            hist_min_bbw: cached.input.hist_min_bbw,
            distance_from_min_pct,
            contracting_count: cached.input.contracting_count,
            trend: cached.input.trend,
            alert_flag: cached.input.alert_kind.is_some(),
            alert_kind: cached.input.alert_kind,
            pattern_strength: cached.input.pattern_strength,
            bar_timestamp: cached.input.bar_timestamp,
            last_update: cached.last_update,
            alert_trigger_timestamp: cached.alert_trigger_timestamp,
            staleness_minutes: staleness_minutes.max(0.0),
            bbw_history: cached.input.bbw_history.iter().copied().collect(),
        })
    }

    /// `GetDashboardSnapshot`: query by instrument key.
    pub fn snapshot(&self, instrument_key: &str, now: DateTime<Utc>) -> Option<DashboardSnapshot> {
        self.render(instrument_key, now)
    }

    /// `GetDashboardSnapshot` with `instrument = "all"`.
    pub fn all_snapshots(&self, now: DateTime<Utc>) -> Vec<DashboardSnapshot> {
        self.cache
            .iter()
            .filter_map(|entry| self.render(entry.key(), now))
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for DashboardBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
