use super::sma::sma;

/// Exponential moving average over `prices`, period `period`.
///
/// Index `period-1` is seeded with the SMA of the first `period` prices;
/// subsequent indices apply `EMA[i] = prices[i]*alpha + EMA[i-1]*(1-alpha)`
/// with `alpha = 2 / (period + 1)`. If `period > len(prices)`, an
/// "effective period" equal to the input length is used for initialization
/// only (spec §4.2) so EMA still produces a final defined value for short
/// series.
pub fn ema(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if prices.is_empty() || period == 0 {
        return Vec::new();
    }

    let effective_period = period.min(prices.len());
    let alpha = 2.0 / (period as f64 + 1.0);
    let seed_index = effective_period - 1;

    let seed = sma(prices, effective_period)[seed_index];
    let mut out = vec![None; prices.len()];
    out[seed_index] = seed;

    let mut prev = seed;
    for i in (seed_index + 1)..prices.len() {
        prev = prev.map(|p| prices[i] * alpha + p * (1.0 - alpha));
        out[i] = prev;
    }

    out
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Never panics for arbitrary finite input and period, including
        /// periods far longer than the series (spec §8 universal invariant).
        #[test]
        fn never_panics_and_preserves_length(
            prices in prop::collection::vec(-10_000.0f64..10_000.0, 0..60),
            period in 0usize..100,
        ) {
            let out = ema(&prices, period);
            if prices.is_empty() || period == 0 {
                prop_assert!(out.is_empty());
            } else {
                prop_assert_eq!(out.len(), prices.len());
            }
        }

        /// A constant series converges to that constant, for any period.
        #[test]
        fn converges_to_constant(
            value in -10_000.0f64..10_000.0,
            len in 5usize..100,
            period in 1usize..20,
        ) {
            let prices = vec![value; len];
            let out = ema(&prices, period);
            if let Some(last) = out.last().copied().flatten() {
                prop_assert!((last - value).abs() < 1e-6);
            }
        }
    }
}
