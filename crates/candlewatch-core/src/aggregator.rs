use std::collections::BTreeMap;
use std::sync::Arc;

use candlewatch_data::{Bar, BarStore, Interval};
use tracing::instrument;

use crate::engine::IndicatorEngine;
use crate::error::AggregatorError;
use crate::events::FiveMinCloseEvent;

/// Minimum number of five-minute bars the aggregated series must have so
/// indicators are defined at the window's close (spec §4.5).
pub const MIN_CONTEXT_5M: usize = 30;

const FIVE_MIN_SECS: i64 = 300;
const EXPECTED_ONE_MIN_BARS_PER_BUCKET: usize = 5;

/// The five-minute aggregator (C5). Stateless between invocations: every
/// call re-reads one-minute bars from the store, folds them into
/// five-minute buckets, and re-runs the indicator engine (C3) on the
/// aggregated series. Never copies one-minute indicator values — the fold
/// step below only reads OHLCV fields, so there is no code path that could.
pub struct FiveMinuteAggregator<S: BarStore> {
    store: Arc<S>,
    engine: IndicatorEngine,
}

impl<S: BarStore> FiveMinuteAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            engine: IndicatorEngine::new(),
        }
    }

    /// Runs one five-minute cycle for `instrument_key`, for the
    /// just-completed window `[start, end)`. Returns the close event for
    /// that window, or `None` if the read-back window did not contain
    /// enough data to complete even one bucket.
    #[instrument(skip(self), fields(instrument = %instrument_key, start, end))]
    pub fn run_cycle(
        &self,
        instrument_key: &str,
        start: i64,
        end: i64,
    ) -> Result<Option<FiveMinCloseEvent>, AggregatorError> {
        let window_secs = (MIN_CONTEXT_5M as i64) * FIVE_MIN_SECS;
        let read_start = start - window_secs;

        let one_min_bars = self
            .store
            .get_range(instrument_key, Interval::M1, read_start, end)?;
        if one_min_bars.is_empty() {
            return Ok(None);
        }

        let aggregated = fold_into_five_minute_bars(instrument_key, &one_min_bars);
        if aggregated.is_empty() {
            return Ok(None);
        }

        let enriched = self.engine.enrich_best_effort(&aggregated);
        let last = enriched.last().cloned();

        Ok(last.map(|bar| FiveMinCloseEvent::new(instrument_key.to_string(), bar)))
    }
}

/// Folds one-minute bars into five-minute buckets keyed by
/// `floor(timestamp/5m)*5m`. Buckets with fewer than the expected five
/// one-minute bars are flagged `incomplete_period` but still emitted.
fn fold_into_five_minute_bars(instrument_key: &str, one_min_bars: &[Bar]) -> Vec<Bar> {
    let mut buckets: BTreeMap<i64, Vec<&Bar>> = BTreeMap::new();
    for bar in one_min_bars {
        let bucket_start = Interval::M5.bar_start(bar.timestamp);
        buckets.entry(bucket_start).or_default().push(bar);
    }

    buckets
        .into_iter()
        .map(|(bucket_start, mut members)| {
            members.sort_by_key(|b| b.timestamp);
            let open = members.first().unwrap().open;
            let close = members.last().unwrap().close;
            let high = members.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let low = members.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let volume: i64 = members.iter().map(|b| b.volume).sum();
            let open_interest = members.last().unwrap().open_interest;
            let incomplete = members.len() < EXPECTED_ONE_MIN_BARS_PER_BUCKET;

            Bar::new(
                instrument_key.to_string(),
                Interval::M5,
                bucket_start,
                open,
                high,
                low,
                close,
                volume,
                open_interest,
            )
            .with_incomplete_period(incomplete)
        })
        .collect()
}
