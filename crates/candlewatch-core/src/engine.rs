use candlewatch_data::Bar;
use tracing::instrument;

use crate::error::EngineError;
use crate::kernel;

/// Longest lookback required across the whole indicator set: 20 for BB,
/// 14+1 for RSI/ATR, 50 for EMA50, 9 for EMA9 (spec §4.3).
pub const MIN_CONTEXT: usize = 150;

const RSI_PERIOD: usize = 14;
const ATR_PERIOD: usize = 14;
const BB_PERIOD: usize = 20;
const BB_MULTIPLIER: f64 = 2.0;

fn longest_required_lookback() -> usize {
    [20usize, ATR_PERIOD + 1, RSI_PERIOD + 1, 50, 9]
        .into_iter()
        .max()
        .unwrap()
}

/// The indicator engine (C3). Drives the kernel (C2) on the price/volume
/// vectors of a chronological bar sequence and annotates a freshly cloned
/// copy positionally — the engine never mutates its input.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndicatorEngine;

impl IndicatorEngine {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, bars), fields(len = bars.len()))]
    pub fn enrich(&self, bars: &[Bar]) -> Result<Vec<Bar>, EngineError> {
        let required = longest_required_lookback();
        if bars.len() < required {
            return Err(EngineError::InsufficientContext {
                required,
                actual: bars.len(),
            });
        }

        Ok(self.enrich_best_effort(bars))
    }

    /// Enriches without the `INSUFFICIENT_CONTEXT` guard. Used by the
    /// coordinator (C4) when the context genuinely is shorter than
    /// `MIN_CONTEXT` for a brand-new instrument (spec §4.4): warm-up
    /// sentinels appear in the first bars and propagate without error.
    pub fn enrich_best_effort(&self, bars: &[Bar]) -> Vec<Bar> {
        if bars.is_empty() {
            return Vec::new();
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

        let sma9 = kernel::sma(&closes, 9);
        let ema5 = kernel::ema(&closes, 5);
        let ema9 = kernel::ema(&closes, 9);
        let ema20 = kernel::ema(&closes, 20);
        let ema50 = kernel::ema(&closes, 50);
        let rsi14 = kernel::rsi(&closes, RSI_PERIOD);
        let atr14 = kernel::atr(&highs, &lows, &closes, ATR_PERIOD);
        // Typical price (high+low+close)/3, matching the teacher's
        // indicators/volume/vwap.rs rather than feeding VWAP the close
        // alone.
        let typical: Vec<f64> = (0..bars.len())
            .map(|i| (highs[i] + lows[i] + closes[i]) / 3.0)
            .collect();
        let vwap = kernel::vwap(&typical, &volumes);
        let (bb_upper, bb_middle, bb_lower) =
            kernel::bollinger_bands(&closes, BB_PERIOD, BB_MULTIPLIER);
        let width = kernel::bb_width(&bb_upper, &bb_middle, &bb_lower);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let mut enriched = bar.clone();
                enriched.sma9 = sma9[i];
                enriched.ema5 = ema5[i];
                enriched.ema9 = ema9[i];
                enriched.ema20 = ema20[i];
                enriched.ema50 = ema50[i];
                enriched.rsi14 = rsi14[i];
                enriched.atr14 = atr14[i];
                enriched.vwap = vwap[i];
                enriched.bb_upper = bb_upper[i];
                enriched.bb_middle = bb_middle[i];
                enriched.bb_lower = bb_lower[i];
                enriched.bb_width_abs = width.abs[i];
                enriched.bb_width_norm = width.norm[i];
                enriched.bb_width_pct = width.pct[i];
                enriched
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlewatch_data::Interval;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.1;
                Bar::new(
                    "NSE:SBIN".to_string(),
                    Interval::M1,
                    i as i64 * 60,
                    close - 0.05,
                    close + 0.1,
                    close - 0.1,
                    close,
                    1000,
                    0,
                )
            })
            .collect()
    }

    #[test]
    fn rejects_short_context() {
        let engine = IndicatorEngine::new();
        let err = engine.enrich(&bars(10)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientContext { .. }));
    }

    #[test]
    fn enriches_full_context_without_error() {
        let engine = IndicatorEngine::new();
        let input = bars(200);
        let enriched = engine.enrich(&input).unwrap();
        assert_eq!(enriched.len(), 200);
        assert!(enriched[0].bb_middle.is_none());
        assert!(enriched[199].bb_middle.is_some());
        assert!(enriched[199].ema50.is_some());
    }

    #[test]
    fn never_mutates_input() {
        let engine = IndicatorEngine::new();
        let input = bars(200);
        let before = input.clone();
        let _ = engine.enrich(&input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn best_effort_propagates_warm_up_sentinels_for_short_series() {
        let engine = IndicatorEngine::new();
        let enriched = engine.enrich_best_effort(&bars(10));
        assert_eq!(enriched.len(), 10);
        assert!(enriched.iter().all(|b| b.bb_middle.is_none()));
        assert!(enriched.iter().all(|b| b.ema50.is_none()));
    }
}
