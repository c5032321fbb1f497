/// Simple moving average over `prices`, period `period`.
///
/// Returns a sequence of length `len(prices)`. Indices `0..period-2` are
/// `None`; index `i >= period-1` is the arithmetic mean of
/// `prices[i-period+1..=i]`. Empty input or `period == 0` yields an empty
/// sequence; `period > len(prices)` yields an all-`None` sequence of the
/// input's length.
pub fn sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if prices.is_empty() || period == 0 {
        return Vec::new();
    }
    if period > prices.len() {
        return vec![None; prices.len()];
    }

    let mut out = vec![None; prices.len()];
    let mut window_sum: f64 = prices[..period].iter().sum();
    out[period - 1] = Some(window_sum / period as f64);

    for i in period..prices.len() {
        window_sum += prices[i] - prices[i - period];
        out[i] = Some(window_sum / period as f64);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty() {
        assert!(sma(&[], 3).is_empty());
    }

    #[test]
    fn warms_up_then_tracks_mean() {
        let prices = [100.0, 102.0, 103.0, 104.0];
        let out = sma(&prices, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - 101.666_666_666_666_66).abs() < 1e-9);
        assert!((out[3].unwrap() - 103.0).abs() < 1e-9);
    }

    #[test]
    fn period_longer_than_input_is_all_undefined() {
        let out = sma(&[1.0, 2.0], 5);
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn idempotent_under_repeated_application() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let once = sma(&prices, 3);
        let twice = sma(&prices, 3);
        assert_eq!(once, twice);
    }
}
