use std::collections::VecDeque;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{MonitorConfig, MonitorConfigUpdate};
use crate::error::ConfigError;
use crate::events::FiveMinCloseEvent;

/// Per-instrument static/slow-changing profile (spec §3). Sourced from an
/// external configuration out of scope for this crate; `hist_min_bbw`
/// defines the instrument's "optimal range".
#[derive(Debug, Clone)]
pub struct InstrumentProfile {
    pub instrument_key: String,
    pub symbol: String,
    pub exchange_token: String,
    pub hist_min_bbw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Contracting,
    Expanding,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternStrength {
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Threshold,
    Pattern,
    Squeeze,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub instrument_key: String,
    pub timestamp: i64,
    pub kind: AlertKind,
    pub bbw: f64,
    pub hist_min: f64,
    pub pattern_length: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct BbwSample {
    timestamp: i64,
    value: f64,
}

const ALERT_HISTORY_CAP: usize = 100;

struct InstrumentMonitorState {
    history: VecDeque<BbwSample>,
    last_alert_at: DashMap<AlertKindKey, Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AlertKindKey {
    Threshold,
    Pattern,
    Squeeze,
}

impl From<AlertKind> for AlertKindKey {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Threshold => AlertKindKey::Threshold,
            AlertKind::Pattern => AlertKindKey::Pattern,
            AlertKind::Squeeze => AlertKindKey::Squeeze,
        }
    }
}

impl InstrumentMonitorState {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            last_alert_at: DashMap::new(),
        }
    }
}

/// Result of evaluating one close event against the BBW history, before
/// cooldown gating. Exposed for tests / dashboard consumption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorEvaluation {
    pub contracting_count: usize,
    pub trend: Trend,
    pub strength: Option<PatternStrength>,
}

/// The BBW pattern monitor (C6). Keyed by instrument in a `DashMap` so no
/// cross-instrument lock is ever taken (spec §5); owns BBW history and
/// alert history (spec §3 "Ownership").
pub struct BbwMonitor {
    config: ArcSwap<MonitorConfig>,
    profiles: DashMap<String, InstrumentProfile>,
    state: DashMap<String, InstrumentMonitorState>,
    alert_history: DashMap<String, VecDeque<AlertRecord>>,
}

impl BbwMonitor {
    pub fn new() -> Self {
        Self {
            config: ArcSwap::from_pointee(MonitorConfig::default()),
            profiles: DashMap::new(),
            state: DashMap::new(),
            alert_history: DashMap::new(),
        }
    }

    pub fn register_profile(&self, profile: InstrumentProfile) {
        self.profiles.insert(profile.instrument_key.clone(), profile);
    }

    pub fn config(&self) -> MonitorConfig {
        (**self.config.load()).clone()
    }

    /// `ConfigureMonitor` (spec §6): validates then atomically publishes.
    pub fn configure(&self, update: MonitorConfigUpdate) -> Result<(), ConfigError> {
        let current = self.config.load();
        let next = current.with_update(update)?;
        self.config.store(std::sync::Arc::new(next));
        Ok(())
    }

    /// On close event: appends to history, classifies trend/strength,
    /// detects a regime in priority order (SQUEEZE, THRESHOLD, PATTERN),
    /// applies cooldown, and dispatches at most one alert. Implements
    /// spec §4.6 steps 1-8.
    #[instrument(skip(self, event), fields(instrument = %event.instrument_key))]
    pub fn on_close_event(&self, event: &FiveMinCloseEvent) -> Option<AlertRecord> {
        let bbw = match event.bar.bb_width_norm {
            Some(v) if v > 0.0 => v,
            _ => return None,
        };

        let cfg = self.config();
        if !cfg.enable_alerts {
            return None;
        }

        let mut state = self
            .state
            .entry(event.instrument_key.clone())
            .or_insert_with(InstrumentMonitorState::new);

        state.history.push_back(BbwSample {
            timestamp: event.bar.timestamp,
            value: bbw,
        });
        while state.history.len() > cfg.contracting_lookback {
            state.history.pop_front();
        }

        if state.history.len() < cfg.contracting_lookback {
            return None;
        }

        let evaluation = evaluate(&state.history, cfg.contracting_lookback);

        let profile = self.profiles.get(&event.instrument_key);
        let profile = match profile {
            Some(p) => p,
            None => {
                // hist_min_bbw unavailable: no alerts for this instrument,
                // not an error (spec §9 open question #2).
                debug!(instrument = %event.instrument_key, "no instrument profile; skipping alert evaluation");
                return None;
            }
        };

        let candidate = detect_regime(bbw, profile.hist_min_bbw, &evaluation, &cfg);
        let candidate_kind = candidate?;

        if self.is_in_cooldown(&state, candidate_kind, cfg.cooldown) {
            return None;
        }

        let record = AlertRecord {
            instrument_key: event.instrument_key.clone(),
            timestamp: event.bar.timestamp,
            kind: candidate_kind,
            bbw,
            hist_min: profile.hist_min_bbw,
            pattern_length: evaluation.contracting_count,
            message: describe_alert(candidate_kind, bbw, profile.hist_min_bbw),
        };

        state
            .last_alert_at
            .insert(candidate_kind.into(), Instant::now());
        drop(state);
        self.append_alert(record.clone());

        Some(record)
    }

    /// Current trend/strength classification for an instrument, independent
    /// of whether the last close event also produced an alert. The
    /// dashboard (C7) needs this on every cycle, not only alerting ones.
    pub fn evaluation(&self, instrument_key: &str) -> Option<MonitorEvaluation> {
        let cfg = self.config();
        let state = self.state.get(instrument_key)?;
        if state.history.len() < cfg.contracting_lookback {
            return None;
        }
        Some(evaluate(&state.history, cfg.contracting_lookback))
    }

    fn is_in_cooldown(
        &self,
        state: &InstrumentMonitorState,
        kind: AlertKind,
        cooldown: Duration,
    ) -> bool {
        state
            .last_alert_at
            .get(&kind.into())
            .map(|last| last.elapsed() < cooldown)
            .unwrap_or(false)
    }

    fn append_alert(&self, record: AlertRecord) {
        let mut history = self
            .alert_history
            .entry(record.instrument_key.clone())
            .or_default();
        history.push_back(record);
        while history.len() > ALERT_HISTORY_CAP {
            history.pop_front();
        }
    }

    /// `GetAlertHistory` (spec §6): optional filters, reverse chronological,
    /// `limit` defaulting to 50 and capped at 500.
    pub fn alert_history(
        &self,
        instrument_key: Option<&str>,
        kind: Option<AlertKind>,
        limit: Option<usize>,
    ) -> Vec<AlertRecord> {
        let limit = limit.unwrap_or(50).min(500);
        let mut all: Vec<AlertRecord> = match instrument_key {
            Some(key) => self
                .alert_history
                .get(key)
                .map(|h| h.iter().cloned().collect())
                .unwrap_or_default(),
            None => self
                .alert_history
                .iter()
                .flat_map(|entry| entry.value().iter().cloned().collect::<Vec<_>>())
                .collect(),
        };

        if let Some(kind) = kind {
            all.retain(|r| r.kind == kind);
        }

        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(limit);
        all
    }

    /// `ClearAlertHistory` (spec §6).
    pub fn clear_alert_history(&self) {
        self.alert_history.clear();
    }
}

impl Default for BbwMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluate(history: &VecDeque<BbwSample>, k: usize) -> MonitorEvaluation {
    let values: Vec<f64> = history.iter().map(|s| s.value).collect();

    let contracting_count = longest_decreasing_suffix(&values);
    let expanding_count = longest_increasing_suffix(&values);

    let threshold = k.div_ceil(2);
    let trend = if contracting_count >= threshold {
        Trend::Contracting
    } else if expanding_count >= threshold {
        Trend::Expanding
    } else {
        Trend::Stable
    };

    let strength = if trend == Trend::Contracting && contracting_count >= 2 {
        let start = values[values.len() - contracting_count];
        let end = *values.last().unwrap();
        let delta = (start - end) / start;
        Some(if delta < 0.10 {
            PatternStrength::Weak
        } else if delta < 0.25 {
            PatternStrength::Moderate
        } else {
            PatternStrength::Strong
        })
    } else {
        None
    };

    MonitorEvaluation {
        contracting_count,
        trend,
        strength,
    }
}

fn longest_decreasing_suffix(values: &[f64]) -> usize {
    if values.is_empty() {
        return 0;
    }
    let mut count = 1;
    for w in values.windows(2).rev() {
        if w[1] < w[0] {
            count += 1;
        } else {
            break;
        }
    }
    count
}

fn longest_increasing_suffix(values: &[f64]) -> usize {
    if values.is_empty() {
        return 0;
    }
    let mut count = 1;
    for w in values.windows(2).rev() {
        if w[1] > w[0] {
            count += 1;
        } else {
            break;
        }
    }
    count
}

fn detect_regime(
    bbw_end: f64,
    hist_min_bbw: f64,
    evaluation: &MonitorEvaluation,
    cfg: &MonitorConfig,
) -> Option<AlertKind> {
    if hist_min_bbw <= 0.0 {
        return None;
    }

    if bbw_end <= cfg.squeeze_ratio * hist_min_bbw {
        return Some(AlertKind::Squeeze);
    }

    let relative_distance = (bbw_end - hist_min_bbw).abs() / hist_min_bbw;
    if relative_distance <= cfg.alert_threshold_pct / 100.0 && evaluation.trend == Trend::Contracting
    {
        return Some(AlertKind::Threshold);
    }

    if evaluation.trend == Trend::Contracting
        && evaluation.strength == Some(PatternStrength::Strong)
        && evaluation.contracting_count == cfg.contracting_lookback
    {
        return Some(AlertKind::Pattern);
    }

    None
}

fn describe_alert(kind: AlertKind, bbw: f64, hist_min: f64) -> String {
    match kind {
        AlertKind::Squeeze => format!("BBW squeeze: {bbw:.4} vs historical min {hist_min:.4}"),
        AlertKind::Threshold => {
            format!("BBW within threshold of historical min: {bbw:.4} ~ {hist_min:.4}")
        }
        AlertKind::Pattern => format!("Strong contracting BBW pattern, now at {bbw:.4}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlewatch_data::{Bar, Interval};

    fn bar_with_width(ts: i64, bb_width_norm: f64) -> Bar {
        let mut bar = Bar::new(
            "NSE:AXISBANK".to_string(),
            Interval::M5,
            ts,
            1000.0,
            1001.0,
            999.0,
            1000.5,
            1000,
            0,
        );
        bar.bb_width_norm = Some(bb_width_norm);
        bar
    }

    fn setup(hist_min_bbw: f64) -> BbwMonitor {
        let monitor = BbwMonitor::new();
        monitor.register_profile(InstrumentProfile {
            instrument_key: "NSE:AXISBANK".to_string(),
            symbol: "AXISBANK".to_string(),
            exchange_token: "5900".to_string(),
            hist_min_bbw,
        });
        monitor
    }

    #[test]
    fn s4_threshold_alert_then_cooldown_suppresses_repeat() {
        let monitor = setup(1.0);
        // The default squeeze_ratio (1.05) would otherwise classify a value
        // 0.05% away from hist_min_bbw as a SQUEEZE before THRESHOLD is even
        // considered, since SQUEEZE is evaluated first in priority order.
        // Narrow it so this scenario actually exercises THRESHOLD.
        monitor
            .configure(MonitorConfigUpdate {
                squeeze_ratio: Some(1.0001),
                ..Default::default()
            })
            .unwrap();
        let sequence = [1.30, 1.20, 1.10, 1.05, 1.0005];
        let mut last = None;
        for (i, v) in sequence.iter().enumerate() {
            let event = FiveMinCloseEvent::new(
                "NSE:AXISBANK".to_string(),
                bar_with_width(i as i64 * 300, *v),
            );
            last = monitor.on_close_event(&event);
        }
        let alert = last.expect("expected a THRESHOLD alert on the last event");
        assert_eq!(alert.kind, AlertKind::Threshold);

        let repeat_event =
            FiveMinCloseEvent::new("NSE:AXISBANK".to_string(), bar_with_width(5 * 300, 1.0005));
        assert!(monitor.on_close_event(&repeat_event).is_none());
    }

    #[test]
    fn s5_pattern_alert_without_threshold() {
        let monitor = setup(0.5);
        let sequence = [2.0, 1.6, 1.2, 0.9, 0.7];
        let mut last = None;
        for (i, v) in sequence.iter().enumerate() {
            let event = FiveMinCloseEvent::new(
                "NSE:AXISBANK".to_string(),
                bar_with_width(i as i64 * 300, *v),
            );
            last = monitor.on_close_event(&event);
        }
        let alert = last.expect("expected a PATTERN alert");
        assert_eq!(alert.kind, AlertKind::Pattern);
        assert_eq!(alert.pattern_length, 5);
    }

    #[test]
    fn missing_profile_produces_no_alert() {
        let monitor = BbwMonitor::new();
        let sequence = [2.0, 1.6, 1.2, 0.9, 0.7];
        for (i, v) in sequence.iter().enumerate() {
            let event = FiveMinCloseEvent::new(
                "NSE:UNKNOWN".to_string(),
                bar_with_width(i as i64 * 300, *v),
            );
            assert!(monitor.on_close_event(&event).is_none());
        }
    }

    #[test]
    fn undefined_or_non_positive_bbw_is_ignored() {
        let monitor = setup(1.0);
        let mut bar = bar_with_width(0, 1.0);
        bar.bb_width_norm = None;
        let event = FiveMinCloseEvent::new("NSE:AXISBANK".to_string(), bar);
        assert!(monitor.on_close_event(&event).is_none());
    }

    #[test]
    fn alert_history_filters_by_kind_and_respects_limit() {
        let monitor = setup(0.5);
        let sequence = [2.0, 1.6, 1.2, 0.9, 0.7];
        for (i, v) in sequence.iter().enumerate() {
            let event = FiveMinCloseEvent::new(
                "NSE:AXISBANK".to_string(),
                bar_with_width(i as i64 * 300, *v),
            );
            monitor.on_close_event(&event);
        }
        let pattern_only = monitor.alert_history(None, Some(AlertKind::Pattern), Some(10));
        assert_eq!(pattern_only.len(), 1);
        let threshold_only = monitor.alert_history(None, Some(AlertKind::Threshold), Some(10));
        assert!(threshold_only.is_empty());
    }

    #[test]
    fn clear_alert_history_empties_it() {
        let monitor = setup(0.5);
        for i in 0..5 {
            monitor.on_close_event(&FiveMinCloseEvent::new(
                "NSE:AXISBANK".to_string(),
                bar_with_width(i * 300, 2.0 - i as f64 * 0.3),
            ));
        }
        monitor.clear_alert_history();
        assert!(monitor.alert_history(None, None, None).is_empty());
    }

    #[test]
    fn determinism_same_history_same_config_same_result() {
        let monitor_a = setup(1.0);
        let monitor_b = setup(1.0);
        let sequence = [1.30, 1.20, 1.10, 1.05, 1.0005];
        let mut result_a = None;
        let mut result_b = None;
        for (i, v) in sequence.iter().enumerate() {
            let event = FiveMinCloseEvent::new(
                "NSE:AXISBANK".to_string(),
                bar_with_width(i as i64 * 300, *v),
            );
            result_a = monitor_a.on_close_event(&event).map(|a| a.kind);
            result_b = monitor_b.on_close_event(&event).map(|a| a.kind);
        }
        assert_eq!(result_a, result_b);
    }

    #[test]
    fn configure_rejects_invalid_update_and_keeps_previous() {
        let monitor = BbwMonitor::new();
        let before = monitor.config();
        let err = monitor.configure(MonitorConfigUpdate {
            squeeze_ratio: Some(5.0),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(monitor.config(), before);
    }
}
