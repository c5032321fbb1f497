/// Relative Strength Index over `prices`, period `period`, using Wilder
/// smoothing.
///
/// Indices `0..=period` are `None`. The initial average gain/loss (seeded
/// at index `period`) are simple means over the first `period` price
/// differences; subsequent indices apply
/// `avg = (1/period)*current + (1 - 1/period)*prev`. Output is clamped to
/// `[0, 100]`; an average loss of zero yields `100`.
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if prices.is_empty() || period == 0 || period > prices.len() {
        return if prices.is_empty() || period == 0 {
            Vec::new()
        } else {
            vec![None; prices.len()]
        };
    }

    let mut out = vec![None; prices.len()];
    let diffs: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    if diffs.len() < period {
        return out;
    }

    let mut avg_gain = diffs[..period]
        .iter()
        .map(|d| d.max(0.0))
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = diffs[..period]
        .iter()
        .map(|d| (-d).max(0.0))
        .sum::<f64>()
        / period as f64;

    out[period] = Some(rsi_from_avgs(avg_gain, avg_loss));

    for i in (period + 1)..prices.len() {
        let diff = diffs[i - 1];
        let gain = diff.max(0.0);
        let loss = (-diff).max(0.0);
        avg_gain = gain / period as f64 + avg_gain * (1.0 - 1.0 / period as f64);
        avg_loss = loss / period as f64 + avg_loss * (1.0 - 1.0 / period as f64);
        out[i] = Some(rsi_from_avgs(avg_gain, avg_loss));
    }

    out
}

fn rsi_from_avgs(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// RSI is bounded to [0, 100] for any finite price series (spec §8
        /// universal invariant), never panics, and never produces NaN.
        #[test]
        fn stays_in_bounds_for_arbitrary_series(
            prices in prop::collection::vec(-10_000.0f64..10_000.0, 0..60),
            period in 1usize..20,
        ) {
            let out = rsi(&prices, period);
            for v in out.into_iter().flatten() {
                prop_assert!(!v.is_nan());
                prop_assert!((0.0..=100.0).contains(&v));
            }
        }
    }
}
