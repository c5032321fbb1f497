/// Average True Range over `high`/`low`/`close`, period `period`, using
/// Wilder smoothing.
///
/// Requires equal-length inputs; mismatched lengths yield an empty
/// sequence. True Range at index `i >= 1` is
/// `max(high[i]-low[i], |high[i]-close[i-1]|, |low[i]-close[i-1]|)`.
/// Index `period` is the simple mean of the first `period` true ranges;
/// subsequent indices use the same Wilder recurrence as `rsi`. Indices
/// `0..period-1` are `None`.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    if high.len() != low.len() || high.len() != close.len() {
        return Vec::new();
    }
    if high.is_empty() || period == 0 {
        return Vec::new();
    }

    let n = high.len();
    let mut out = vec![None; n];
    if period >= n {
        return out;
    }

    let mut true_ranges = vec![0.0; n];
    for i in 1..n {
        let tr1 = high[i] - low[i];
        let tr2 = (high[i] - close[i - 1]).abs();
        let tr3 = (low[i] - close[i - 1]).abs();
        true_ranges[i] = tr1.max(tr2).max(tr3);
    }

    let mut avg_tr = true_ranges[1..=period].iter().sum::<f64>() / period as f64;
    out[period] = Some(avg_tr);

    for i in (period + 1)..n {
        avg_tr = true_ranges[i] / period as f64 + avg_tr * (1.0 - 1.0 / period as f64);
        out[i] = Some(avg_tr);
    }

    out
}
