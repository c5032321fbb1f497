use crate::interval::Interval;
use serde::{Deserialize, Serialize};

/// An immutable OHLCV observation at a single `(instrument, interval, timestamp)`.
///
/// `timestamp` is the **start** of the interval, a UTC unix timestamp in
/// seconds. Indicator fields are populated exactly once, at ingestion (C4)
/// for `1m` bars or aggregation (C5) for `5m` bars, and never mutated
/// thereafter; `None` is the "undefined" sentinel for warm-up periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub instrument_key: String,
    pub interval: Interval,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub open_interest: i64,
    pub incomplete_period: bool,

    pub sma9: Option<f64>,
    pub ema5: Option<f64>,
    pub ema9: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub rsi14: Option<f64>,
    pub atr14: Option<f64>,
    pub vwap: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_width_abs: Option<f64>,
    pub bb_width_norm: Option<f64>,
    pub bb_width_pct: Option<f64>,
}

impl Bar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument_key: String,
        interval: Interval,
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
        open_interest: i64,
    ) -> Self {
        Self {
            instrument_key,
            interval,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            open_interest,
            incomplete_period: false,
            sma9: None,
            ema5: None,
            ema9: None,
            ema20: None,
            ema50: None,
            rsi14: None,
            atr14: None,
            vwap: None,
            bb_upper: None,
            bb_middle: None,
            bb_lower: None,
            bb_width_abs: None,
            bb_width_norm: None,
            bb_width_pct: None,
        }
    }

    pub fn with_incomplete_period(mut self, incomplete: bool) -> Self {
        self.incomplete_period = incomplete;
        self
    }

    /// `low <= min(open, close) <= max(open, close) <= high`, per spec §8's
    /// universal invariant.
    pub fn is_valid(&self) -> bool {
        self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
            && self.low <= self.high
            && self.volume >= 0
    }

    /// Count of populated indicator fields, used by the store to decide
    /// whether an incoming upsert would be `DUPLICATE_INCOMPLETE`.
    pub fn populated_indicator_count(&self) -> usize {
        [
            self.sma9.is_some(),
            self.ema5.is_some(),
            self.ema9.is_some(),
            self.ema20.is_some(),
            self.ema50.is_some(),
            self.rsi14.is_some(),
            self.atr14.is_some(),
            self.vwap.is_some(),
            self.bb_upper.is_some(),
            self.bb_middle.is_some(),
            self.bb_lower.is_some(),
            self.bb_width_abs.is_some(),
            self.bb_width_norm.is_some(),
            self.bb_width_pct.is_some(),
        ]
        .into_iter()
        .filter(|p| *p)
        .count()
    }
}
