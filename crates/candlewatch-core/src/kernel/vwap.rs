/// Volume-weighted average price, cumulative from the start of `prices`.
///
/// `VWAP[i] = sum(prices[k]*volumes[k], k=0..=i) / sum(volumes[k], k=0..=i)`.
/// If the cumulative volume at `i` is zero, `VWAP[i] = prices[i]`. Requires
/// equal-length inputs.
pub fn vwap(prices: &[f64], volumes: &[f64]) -> Vec<Option<f64>> {
    if prices.len() != volumes.len() || prices.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(prices.len());
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;

    for i in 0..prices.len() {
        cum_pv += prices[i] * volumes[i];
        cum_vol += volumes[i];
        if cum_vol == 0.0 {
            out.push(Some(prices[i]));
        } else {
            out.push(Some(cum_pv / cum_vol));
        }
    }

    out
}
